//! Built-in values used when no layer supplies a setting.

#[cfg(unix)]
use std::env;

#[cfg(unix)]
use camino::Utf8PathBuf;
#[cfg(unix)]
use dirs::runtime_dir;
#[cfg(unix)]
use libc::geteuid;

use crate::logging::LogFormat;
use crate::socket::SocketEndpoint;

/// TCP port used on platforms without Unix domain sockets.
pub const DEFAULT_TCP_PORT: u16 = 9780;

/// Log filter applied when none is configured.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Upper bound on how long `query-logged-in` waits for a pending start.
pub const DEFAULT_LOGIN_WAIT_MS: u64 = 30_000;

/// Largest inbound frame accepted on a channel.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Whether disconnected channels stay in the registry.
pub const DEFAULT_KEEP_ON_DISCONNECT: bool = false;

/// Default log filter expression.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default log filter as an owned value for serde.
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default log encoding.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Computes the endpoint the router listens on when none is configured.
///
/// Prefers `$XDG_RUNTIME_DIR/portmux/portmuxd.sock`. Without a runtime
/// directory the socket lives under the temporary directory, namespaced by
/// effective user id.
#[must_use]
pub fn default_socket_endpoint() -> SocketEndpoint {
    default_socket_endpoint_inner()
}

#[cfg(unix)]
fn default_socket_endpoint_inner() -> SocketEndpoint {
    let (mut base, per_user) = match runtime_base_directory() {
        Some(dir) => (dir, false),
        None => (fallback_base_directory(), true),
    };

    base.push("portmux");
    if per_user {
        base.push(user_namespace());
    }
    SocketEndpoint::unix(base.join("portmuxd.sock"))
}

#[cfg(unix)]
fn runtime_base_directory() -> Option<Utf8PathBuf> {
    runtime_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
}

#[cfg(unix)]
fn fallback_base_directory() -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(env::temp_dir()).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

#[cfg(unix)]
fn user_namespace() -> String {
    // SAFETY: `geteuid` has no preconditions and cannot fail.
    let uid = unsafe { geteuid() };
    format!("uid-{uid}")
}

#[cfg(not(unix))]
fn default_socket_endpoint_inner() -> SocketEndpoint {
    SocketEndpoint::tcp("127.0.0.1", DEFAULT_TCP_PORT)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn default_socket_is_named_for_the_router() {
        let endpoint = default_socket_endpoint();
        let path = endpoint.unix_path().expect("unix endpoint");
        assert_eq!(path.file_name(), Some("portmuxd.sock"));
        assert!(path.components().any(|part| part.as_str() == "portmux"));
    }
}
