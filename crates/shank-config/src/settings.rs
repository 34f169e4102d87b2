use std::fmt;

use serde::{Deserialize, Serialize};

use crate::defaults::{DEFAULT_ADDR, DEFAULT_NETWORK};
use crate::network::{Endpoint, EndpointError, NetworkFamily};

/// One layer of connection settings; unset fields defer to lower layers.
///
/// This is also the record persisted by the config store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConnectionSettings {
    /// Network family, when this layer sets one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkFamily>,
    /// Server address, when this layer sets one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addr: Option<String>,
}

impl ConnectionSettings {
    /// Builds a fully populated layer.
    #[must_use]
    pub fn new(network: NetworkFamily, addr: impl Into<String>) -> Self {
        Self {
            network: Some(network),
            addr: Some(addr.into()),
        }
    }
}

/// Resolved network family and address for one command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    network: NetworkFamily,
    addr: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            network: DEFAULT_NETWORK,
            addr: DEFAULT_ADDR.to_owned(),
        }
    }
}

impl ConnectionConfig {
    /// Merges compiled-in defaults, the stored layer and the flag layer, in
    /// increasing precedence.
    #[must_use]
    pub fn resolve(stored: Option<&ConnectionSettings>, flags: &ConnectionSettings) -> Self {
        stored
            .into_iter()
            .chain(std::iter::once(flags))
            .fold(Self::default(), Self::overlay)
    }

    fn overlay(self, layer: &ConnectionSettings) -> Self {
        Self {
            network: layer.network.unwrap_or(self.network),
            addr: layer.addr.clone().unwrap_or(self.addr),
        }
    }

    /// Network family to dial.
    #[must_use]
    pub const fn network(&self) -> NetworkFamily {
        self.network
    }

    /// Server address to dial.
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Interprets the address for the configured network family.
    pub fn endpoint(&self) -> Result<Endpoint, EndpointError> {
        Endpoint::parse(self.network, &self.addr)
    }

    /// Returns the configuration as a fully populated settings layer.
    #[must_use]
    pub fn to_settings(&self) -> ConnectionSettings {
        ConnectionSettings::new(self.network, self.addr.clone())
    }
}

impl fmt::Display for ConnectionConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}://{}", self.network, self.addr)
    }
}
