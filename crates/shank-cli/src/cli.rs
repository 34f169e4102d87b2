//! Root command definition for the `shank` client.
//!
//! The global flags are declared with clap's derive API; the warden
//! subcommands are attached at runtime from the command registry.

use clap::{Args, Command};
use shank_config::{
    ConnectionSettings, DEFAULT_ADDR, DEFAULT_LOG_FILTER, DEFAULT_NETWORK, LogFormat,
    NetworkFamily, default_log_format,
};

use crate::registry::{CommandRegistry, TARGET_COMMAND};

/// Flags accepted before the subcommand.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub(crate) struct GlobalArgs {
    /// Server network type (unix, tcp).
    #[arg(long, value_name = "NETWORK", help = network_help())]
    pub(crate) network: Option<NetworkFamily>,
    /// Server network address.
    #[arg(long, value_name = "ADDR", help = addr_help())]
    pub(crate) addr: Option<String>,
    /// Diagnostic log filter, for example `shank=debug`.
    #[arg(long, value_name = "FILTER", default_value = DEFAULT_LOG_FILTER)]
    pub(crate) log_filter: String,
    /// Diagnostic log format (compact, json).
    #[arg(long, value_name = "FORMAT", default_value_t = default_log_format())]
    pub(crate) log_format: LogFormat,
}

fn network_help() -> String {
    format!("Server network type (unix, tcp) [default: {DEFAULT_NETWORK}]")
}

fn addr_help() -> String {
    format!("Server network address [default: {DEFAULT_ADDR}]")
}

impl GlobalArgs {
    /// The flag layer of the connection settings.
    pub(crate) fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            network: self.network,
            addr: self.addr.clone(),
        }
    }
}

/// Builds the root command with the global flags, `target`, and every
/// registered warden command.
pub(crate) fn build_command(registry: &CommandRegistry) -> Command {
    let root = Command::new("shank")
        .about("Warden server CLI")
        .version(env!("CARGO_PKG_VERSION"))
        .disable_help_subcommand(true)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new(TARGET_COMMAND)
                .about("Save --network and --addr to the config store."),
        );
    registry
        .iter()
        .fold(GlobalArgs::augment_args(root), |command, descriptor| {
            command.subcommand(descriptor.command())
        })
}
