//! Error types for the CLI runtime.

use shank_config::ConfigError;
use thiserror::Error;

use crate::session::ExchangeError;
use crate::synthesizer::{PopulateError, SynthesisError};
use crate::telemetry::TelemetryError;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to build commands: {0}")]
    Synthesis(#[from] SynthesisError),
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("failed to initialise logging: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("invalid flags for `{command}`: {source}")]
    Populate {
        command: String,
        #[source]
        source: PopulateError,
    },
    #[error("failed to connect to warden: {0}")]
    Connect(#[source] TransportError),
    #[error("request-response failed: {0}")]
    Exchange(#[from] ExchangeError),
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
}
