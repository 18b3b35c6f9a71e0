//! Shared configuration for the tether control endpoint.
//!
//! Configuration is layered by `ortho_config`, lowest precedence first:
//! built-in defaults, an optional configuration file, `TETHER_*`
//! environment variables, and command-line flags such as
//! `--e2e-test-port <port>` or `--log-level debug`. Binaries that own their
//! command line load through [`Config::load_layered`].
//!
//! Host applications embedding the endpoint usually do not; their launch
//! arguments belong to them. For those, [`port_from_args`] scans the raw
//! arguments for `--e2e-test-port=<port>` and ignores everything else.

mod defaults;
mod logging;
mod port;

use std::ffi::{OsStr, OsString};
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_HOST, DEFAULT_LOG_FILTER, ENV_PREFIX, PORT_ARGUMENT, default_log_filter,
    default_log_format, default_log_level,
};
pub use logging::{LogFormat, LogFormatParseError, LogLevel, LogLevelParseError};
pub use port::port_from_args;

/// Resolved configuration for a control endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, OrthoConfig)]
#[serde(default)]
#[ortho_config(prefix = "TETHER")]
pub struct Config {
    /// Interface the listener binds to.
    pub host: String,
    /// Port of the control endpoint. `Some(0)` selects an ephemeral port;
    /// `None` defers to the host's launch arguments.
    pub e2e_test_port: Option<u16>,
    /// Verbosity used for received commands and sent responses.
    pub log_level: LogLevel,
    /// `tracing` filter expression applied by the telemetry subscriber.
    pub log_filter: String,
    /// Output format for the telemetry subscriber.
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            e2e_test_port: None,
            log_level: default_log_level(),
            log_filter: default_log_filter().to_owned(),
            log_format: default_log_format(),
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A layer held a value that could not be parsed or merged.
    #[error("failed to load configuration: {source}")]
    Load {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
}

impl From<Arc<OrthoError>> for ConfigError {
    fn from(source: Arc<OrthoError>) -> Self {
        Self::Load { source }
    }
}

impl Config {
    /// Loads configuration from defaults, files, the environment and `args`.
    ///
    /// `args` is a full command line, program name first. Unknown flags are
    /// rejected, so pass only arguments meant for the endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] when a layer fails to parse or a flag is
    /// not recognised.
    pub fn load_layered<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args).map_err(ConfigError::from)
    }

    /// Returns a copy with the port set.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.e2e_test_port = Some(port);
        self
    }

    /// Returns a copy with the protocol log verbosity set.
    #[must_use]
    pub fn with_log_level(mut self, log_level: LogLevel) -> Self {
        self.log_level = log_level;
        self
    }

    /// Resolves the port the endpoint should listen on.
    ///
    /// A configured port wins, including `0`. Otherwise the host's launch
    /// arguments are scanned. `None` means the endpoint stays disabled.
    #[must_use]
    pub fn resolve_port<I, S>(&self, args: I) -> Option<u16>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.e2e_test_port.or_else(|| port_from_args(args))
    }

    /// Configured port, if any.
    #[must_use]
    pub const fn port(&self) -> Option<u16> {
        self.e2e_test_port
    }

    /// Interface the listener binds to.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Verbosity used for protocol traffic.
    #[must_use]
    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    /// Filter expression for the telemetry subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Output format for the telemetry subscriber.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
