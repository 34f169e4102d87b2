//! Connection configuration for the `shank` client.
//!
//! The crate owns the compiled-in defaults, the network families the client
//! can dial, the layering of connection settings (defaults, the persisted
//! config store, then explicit flags) and the config store itself. Callers
//! resolve one [`ConfigStore`] at startup and pass it down explicitly.

mod defaults;
mod logging;
mod network;
mod settings;
mod store;

pub use defaults::{
    CONFIG_FILE_NAME, CONFIG_PATH_ENV, DEFAULT_ADDR, DEFAULT_LOG_FILTER, DEFAULT_NETWORK,
    default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use network::{Endpoint, EndpointError, NetworkFamily, NetworkFamilyParseError};
pub use settings::{ConnectionConfig, ConnectionSettings};
pub use store::{ConfigError, ConfigStore};
