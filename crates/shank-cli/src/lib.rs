//! Command-line client for warden container servers.
//!
//! The runtime synthesizes one subcommand per warden request kind, resolves
//! connection settings from the config store and flags, and drives the
//! selected exchange to completion over a Unix or TCP socket. The interface
//! is designed to be exercised both from the binary entrypoint and from tests
//! where the config store, the connection provider and the IO streams are
//! substituted.

use std::ffi::OsString;
use std::io::{Read, Write};
use std::process::ExitCode;

use clap::FromArgMatches;
use shank_config::{ConfigError, ConfigStore, ConnectionConfig, ConnectionSettings};
use tracing::{info, warn};

mod action;
mod cli;
mod config;
mod errors;
mod output;
mod registry;
mod schema;
mod session;
mod synthesizer;
mod telemetry;
mod transport;
mod usage;

use action::ActionContext;
use cli::{GlobalArgs, build_command};
use config::{StoreLocator, SystemStoreLocator};
use errors::AppError;
use registry::{CommandRegistry, TARGET_COMMAND};
use transport::{ConnectionProvider, SocketProvider};

const CLI_TARGET: &str = "shank::cli";

/// Bundles the IO streams provided to the CLI runtime.
pub(crate) struct IoStreams<'a, R: Read, W: Write, E: Write> {
    pub(crate) stdin: &'a mut R,
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
}

impl<'a, R: Read, W: Write, E: Write> IoStreams<'a, R, W, E> {
    pub(crate) const fn new(stdin: &'a mut R, stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self {
            stdin,
            stdout,
            stderr,
        }
    }
}

struct CliRunner<'a, R: Read, W: Write, E: Write, L: StoreLocator, P: ConnectionProvider> {
    io: IoStreams<'a, R, W, E>,
    locator: &'a L,
    provider: &'a P,
}

impl<'a, R, W, E, L, P> CliRunner<'a, R, W, E, L, P>
where
    R: Read,
    W: Write,
    E: Write,
    L: StoreLocator,
    P: ConnectionProvider,
{
    const fn new(io: IoStreams<'a, R, W, E>, locator: &'a L, provider: &'a P) -> Self {
        Self {
            io,
            locator,
            provider,
        }
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        match self.execute(args) {
            Ok(()) => ExitCode::SUCCESS,
            Err(AppError::CliUsage(error)) => self.report_usage(&error),
            Err(error) => {
                let _ = writeln!(self.io.stderr, "{error}");
                ExitCode::FAILURE
            }
        }
    }

    fn execute<I>(&mut self, args: I) -> Result<(), AppError>
    where
        I: IntoIterator<Item = OsString>,
    {
        let registry = CommandRegistry::build()?;
        let matches = build_command(&registry)
            .try_get_matches_from(args)
            .map_err(AppError::CliUsage)?;
        let globals = GlobalArgs::from_arg_matches(&matches).map_err(AppError::CliUsage)?;
        telemetry::initialise(&globals.log_filter, globals.log_format)?;

        let store = self.locator.locate()?;
        let flags = globals.connection_settings();
        let Some((name, command_matches)) = matches.subcommand() else {
            return Err(AppError::UnknownCommand(String::new()));
        };
        if name == TARGET_COMMAND {
            return save_target(&store, &flags).map_err(AppError::from);
        }

        let descriptor = registry
            .get(name)
            .ok_or_else(|| AppError::UnknownCommand(name.to_owned()))?;
        let mut context = ActionContext {
            store: &store,
            flags: &flags,
            provider: self.provider,
            input: &mut *self.io.stdin,
            output: &mut *self.io.stdout,
        };
        descriptor.invoke(command_matches, &mut context)
    }

    /// Writes help and version output to stdout and usage errors to stderr,
    /// exiting with clap's status.
    fn report_usage(&mut self, error: &clap::Error) -> ExitCode {
        let rendered = error.render();
        let written = if error.use_stderr() {
            write!(self.io.stderr, "{rendered}")
        } else {
            write!(self.io.stdout, "{rendered}")
        };
        if written.is_err() {
            return ExitCode::FAILURE;
        }
        u8::try_from(error.exit_code()).map_or(ExitCode::FAILURE, ExitCode::from)
    }
}

/// Saves the resolved settings. A corrupt store contributes nothing and is
/// overwritten.
fn save_target(store: &ConfigStore, flags: &ConnectionSettings) -> Result<(), ConfigError> {
    let stored = match store.load() {
        Ok(stored) => stored,
        Err(ConfigError::Parse { path, source }) => {
            warn!(
                target: CLI_TARGET,
                store = %path,
                error = %source,
                "replacing corrupt config store"
            );
            None
        }
        Err(error) => return Err(error),
    };
    let config = ConnectionConfig::resolve(stored.as_ref(), flags);
    store.save(&config.to_settings())?;
    info!(target: CLI_TARGET, store = %store.path(), server = %config, "saved target");
    Ok(())
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, R, W, E>(args: I, stdin: &mut R, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: Read,
    W: Write,
    E: Write,
{
    let io = IoStreams::new(stdin, stdout, stderr);
    run_with(args, io, &SystemStoreLocator, &SocketProvider)
}

/// Runs the CLI with a substituted config store locator and connection
/// provider.
pub(crate) fn run_with<I, R, W, E, L, P>(
    args: I,
    io: IoStreams<'_, R, W, E>,
    locator: &L,
    provider: &P,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: Read,
    W: Write,
    E: Write,
    L: StoreLocator,
    P: ConnectionProvider,
{
    CliRunner::new(io, locator, provider).run(args)
}

#[cfg(test)]
mod tests;
