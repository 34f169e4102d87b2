//! Config store discovery for the CLI runtime.

use shank_config::{ConfigError, ConfigStore};

/// Finds the config store used for one invocation.
pub(crate) trait StoreLocator {
    fn locate(&self) -> Result<ConfigStore, ConfigError>;
}

/// Uses `SHANK_CONFIG_PATH` or the home directory.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct SystemStoreLocator;

impl StoreLocator for SystemStoreLocator {
    fn locate(&self) -> Result<ConfigStore, ConfigError> {
        ConfigStore::locate()
    }
}
