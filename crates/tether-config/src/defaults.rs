use crate::logging::{LogFormat, LogLevel};

/// Launch argument prefix carrying the control endpoint port.
pub const PORT_ARGUMENT: &str = "--e2e-test-port=";

/// Interface the control endpoint binds to unless configured otherwise.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Prefix of the environment variables consulted by [`crate::Config::load_layered`].
pub const ENV_PREFIX: &str = "TETHER_";

/// Default log filter expression used by the binaries.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binaries.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Default verbosity for protocol traffic.
#[must_use]
pub fn default_log_level() -> LogLevel {
    LogLevel::Info
}
