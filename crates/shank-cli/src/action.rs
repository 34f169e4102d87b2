//! Actions bound to synthesized commands.

use std::io::{Read, Write};

use clap::ArgMatches;
use shank_config::{ConfigError, ConfigStore, ConnectionConfig, ConnectionSettings};
use shank_protocol::RequestKind;
use tracing::debug;

use crate::errors::AppError;
use crate::output::RecordSink;
use crate::session::Session;
use crate::synthesizer::CommandDescriptor;
use crate::transport::ConnectionProvider;

const ACTION_TARGET: &str = "shank::session";

/// Action run when a synthesized command is invoked.
pub(crate) type CommandAction =
    fn(&CommandDescriptor, &ArgMatches, &mut ActionContext<'_>) -> Result<(), AppError>;

/// Everything an action needs beyond its parsed flags.
pub(crate) struct ActionContext<'a> {
    pub(crate) store: &'a ConfigStore,
    pub(crate) flags: &'a ConnectionSettings,
    pub(crate) provider: &'a dyn ConnectionProvider,
    pub(crate) input: &'a mut dyn Read,
    pub(crate) output: &'a mut dyn Write,
}

impl ActionContext<'_> {
    /// Layers the stored settings and the invocation's flags over the
    /// defaults.
    pub(crate) fn resolve_config(&self) -> Result<ConnectionConfig, ConfigError> {
        let stored = self.store.load()?;
        Ok(ConnectionConfig::resolve(stored.as_ref(), self.flags))
    }
}

/// Runs one command for request kind `K`.
///
/// Resolves the connection settings, connects, builds the request from the
/// parsed flags and drives the exchange to completion.
pub(crate) fn invoke<K: RequestKind>(
    descriptor: &CommandDescriptor,
    matches: &ArgMatches,
    context: &mut ActionContext<'_>,
) -> Result<(), AppError> {
    let config = context.resolve_config()?;
    debug!(
        target: ACTION_TARGET,
        command = %descriptor.name,
        kind = descriptor.kind_name,
        server = %config,
        "resolved connection"
    );
    let mut connection = context
        .provider
        .provide(&config)
        .map_err(AppError::Connect)?;
    let request: K = descriptor
        .populate(matches)
        .map_err(|source| AppError::Populate {
            command: descriptor.name.clone(),
            source,
        })?;
    debug!(
        target: ACTION_TARGET,
        command = %descriptor.name,
        arguments = ?descriptor.arguments_for(&request),
        "built request"
    );
    let mut session = Session::new(connection.as_mut(), RecordSink::new(&mut *context.output));
    session.execute(descriptor.pattern, &request, &mut *context.input)?;
    Ok(())
}
