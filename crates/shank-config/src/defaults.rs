use crate::logging::LogFormat;
use crate::network::NetworkFamily;

/// Network family dialled when neither the config store nor flags name one.
pub const DEFAULT_NETWORK: NetworkFamily = NetworkFamily::Unix;

/// Server address used when neither the config store nor flags name one.
pub const DEFAULT_ADDR: &str = "/tmp/warden.sock";

/// File name of the config store inside the home directory.
pub const CONFIG_FILE_NAME: &str = ".shankrc";

/// Environment variable overriding the config store location.
pub const CONFIG_PATH_ENV: &str = "SHANK_CONFIG_PATH";

/// Default log filter expression; diagnostics stay quiet unless asked for.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Default logging format for the binary.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
