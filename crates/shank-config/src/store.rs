use std::env;
use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use crate::defaults::{CONFIG_FILE_NAME, CONFIG_PATH_ENV};
use crate::settings::ConnectionSettings;

/// Persistent record of the connection settings saved by `shank target`.
///
/// The store is a small JSON document: `{"network": "unix", "addr": "..."}`.
/// A missing file is an empty store; unreadable or corrupt content is an
/// error rather than a silent fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    path: Utf8PathBuf,
}

impl ConfigStore {
    /// Uses the store at `path`.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Finds the store location.
    ///
    /// `SHANK_CONFIG_PATH` wins when set and non-empty; otherwise the store
    /// lives at `$HOME/.shankrc`.
    pub fn locate() -> Result<Self, ConfigError> {
        if let Some(explicit) = env::var_os(CONFIG_PATH_ENV).filter(|value| !value.is_empty()) {
            let path = Utf8PathBuf::from_path_buf(explicit.into()).map_err(|path| {
                ConfigError::NonUtf8Path {
                    path: path.display().to_string(),
                }
            })?;
            return Ok(Self::new(path));
        }
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
        let path = Utf8PathBuf::from_path_buf(home.join(CONFIG_FILE_NAME)).map_err(|path| {
            ConfigError::NonUtf8Path {
                path: path.display().to_string(),
            }
        })?;
        Ok(Self::new(path))
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Reads the stored settings; `None` when nothing has been saved yet.
    pub fn load(&self) -> Result<Option<ConnectionSettings>, ConfigError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if contents.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: self.path.clone(),
                source,
            })
    }

    /// Replaces the stored settings with `settings`.
    pub fn save(&self, settings: &ConnectionSettings) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let mut document = serde_json::to_string_pretty(settings).map_err(ConfigError::Serialise)?;
        document.push('\n');
        fs::write(&self.path, document).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// Errors raised while locating, reading or writing the config store.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No home directory could be determined for the default location.
    #[error("cannot locate the config store: no home directory; set {CONFIG_PATH_ENV}")]
    NoHomeDirectory,
    /// The store path was not valid UTF-8.
    #[error("config store path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the offending path.
        path: String,
    },
    /// The store existed but could not be read.
    #[error("failed to read config store {path}: {source}")]
    Read {
        /// Store location.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The store content was not a valid settings document.
    #[error("config store {path} is corrupt: {source}")]
    Parse {
        /// Store location.
        path: Utf8PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// The directory holding the store could not be created.
    #[error("failed to create config directory {path}: {source}")]
    CreateDirectory {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The store could not be written.
    #[error("failed to write config store {path}: {source}")]
    Write {
        /// Store location.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The settings could not be encoded.
    #[error("failed to encode connection settings: {0}")]
    Serialise(#[source] serde_json::Error),
}
