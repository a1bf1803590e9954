//! Layered configuration for the portmux request router.
//!
//! Values resolve from built-in defaults, then a configuration file, then
//! `PORTMUX_*` environment variables, then command-line flags, with later
//! layers winning.

mod defaults;
mod logging;
mod socket;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_KEEP_ON_DISCONNECT, DEFAULT_LOG_FILTER, DEFAULT_LOGIN_WAIT_MS,
    DEFAULT_MAX_FRAME_BYTES, DEFAULT_TCP_PORT, default_log_filter, default_log_filter_string,
    default_log_format, default_socket_endpoint,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Resolved settings for the router daemon.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "PORTMUX")]
pub struct Config {
    /// Endpoint client channels connect to.
    #[serde(default = "default_socket_endpoint")]
    #[ortho_config(default = default_socket_endpoint())]
    pub daemon_socket: SocketEndpoint,
    /// `tracing` filter directive, e.g. `info` or `portmuxd::router=debug`.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Log line encoding.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Keep a channel registered after its connection ends.
    #[serde(default)]
    #[ortho_config(default = DEFAULT_KEEP_ON_DISCONNECT)]
    pub keep_on_disconnect: bool,
    /// Longest wait, in milliseconds, before `query-logged-in` answers while a
    /// start is pending. Zero answers from the current state.
    #[serde(default = "default_login_wait_ms")]
    #[ortho_config(default = DEFAULT_LOGIN_WAIT_MS)]
    pub login_wait_ms: u64,
    /// Largest accepted inbound frame in bytes, newline included.
    #[serde(default = "default_max_frame_bytes")]
    #[ortho_config(default = DEFAULT_MAX_FRAME_BYTES)]
    pub max_frame_bytes: usize,
}

const fn default_login_wait_ms() -> u64 {
    DEFAULT_LOGIN_WAIT_MS
}

const fn default_max_frame_bytes() -> usize {
    DEFAULT_MAX_FRAME_BYTES
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon_socket: default_socket_endpoint(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            keep_on_disconnect: DEFAULT_KEEP_ON_DISCONNECT,
            login_wait_ms: DEFAULT_LOGIN_WAIT_MS,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl Config {
    /// Endpoint the router listens on.
    #[must_use]
    pub fn daemon_socket(&self) -> &SocketEndpoint {
        &self.daemon_socket
    }

    /// Tracing filter directive.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log line encoding.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Whether disconnected channels leave the registry.
    #[must_use]
    pub const fn release_on_disconnect(&self) -> bool {
        !self.keep_on_disconnect
    }

    /// Bound on the `query-logged-in` wait.
    #[must_use]
    pub const fn login_wait(&self) -> Duration {
        Duration::from_millis(self.login_wait_ms)
    }

    /// Largest accepted inbound frame.
    #[must_use]
    pub const fn max_frame_bytes(&self) -> usize {
        self.max_frame_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.log_filter(), "info");
        assert_eq!(config.log_format(), LogFormat::Json);
        assert!(config.release_on_disconnect());
        assert_eq!(config.login_wait(), Duration::from_secs(30));
        assert_eq!(config.max_frame_bytes(), 1_048_576);
        assert_eq!(config.daemon_socket(), &default_socket_endpoint());
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let config: Config = serde_json::from_str(r#"{"login_wait_ms": 0}"#).expect("decode");
        assert_eq!(config.login_wait(), Duration::ZERO);
        assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
        assert!(config.release_on_disconnect());
    }
}
