use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// Network family used to reach the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum NetworkFamily {
    /// Unix domain stream socket; the address is a filesystem path.
    Unix,
    /// TCP stream socket; the address is `host:port`.
    Tcp,
}

/// Errors encountered while parsing a [`NetworkFamily`] from text.
pub type NetworkFamilyParseError = strum::ParseError;

/// A dialable server endpoint derived from a network family and address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Unix domain socket endpoint.
    Unix {
        /// Socket path.
        path: Utf8PathBuf,
    },
    /// TCP socket endpoint.
    Tcp {
        /// Host name or IP address.
        host: String,
        /// TCP port.
        port: u16,
    },
}

impl Endpoint {
    /// Builds a Unix domain socket endpoint.
    #[must_use]
    pub fn unix(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Unix { path: path.into() }
    }

    /// Builds a TCP socket endpoint.
    #[must_use]
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Interprets `addr` according to `network`.
    pub fn parse(network: NetworkFamily, addr: &str) -> Result<Self, EndpointError> {
        let trimmed = addr.trim();
        if trimmed.is_empty() {
            return Err(EndpointError::EmptyAddress { network });
        }
        match network {
            NetworkFamily::Unix => Ok(Self::unix(trimmed)),
            NetworkFamily::Tcp => {
                let (raw_host, raw_port) = trimmed
                    .rsplit_once(':')
                    .ok_or_else(|| EndpointError::MissingPort(trimmed.to_owned()))?;
                let host = raw_host.trim_start_matches('[').trim_end_matches(']');
                if host.is_empty() {
                    return Err(EndpointError::MissingHost(trimmed.to_owned()));
                }
                let port = raw_port
                    .parse::<u16>()
                    .map_err(|_| EndpointError::InvalidPort(trimmed.to_owned()))?;
                Ok(Self::tcp(host, port))
            }
        }
    }

    /// Returns the Unix socket path when the endpoint uses the Unix transport.
    #[must_use]
    pub fn unix_path(&self) -> Option<&Utf8Path> {
        match self {
            Self::Unix { path } => Some(path.as_ref()),
            Self::Tcp { .. } => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix { path } => write!(formatter, "unix://{path}"),
            Self::Tcp { host, port } => write!(formatter, "tcp://{host}:{port}"),
        }
    }
}

/// Errors encountered while interpreting a server address.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// The address was blank.
    #[error("no {network} address was given")]
    EmptyAddress {
        /// Network family the address was meant for.
        network: NetworkFamily,
    },
    /// TCP address lacked the `:port` part.
    #[error("missing TCP port in '{0}'")]
    MissingPort(String),
    /// TCP address lacked a host.
    #[error("missing TCP host in '{0}'")]
    MissingHost(String),
    /// TCP port was not a number between 0 and 65535.
    #[error("invalid TCP port in '{0}'")]
    InvalidPort(String),
}
