//! Error types for the socket transport.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Errors raised while reading or writing channel frames.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A frame could not be encoded.
    #[error("failed to encode frame: {source}")]
    Encode {
        /// Underlying serialiser error.
        #[from]
        source: serde_json::Error,
    },
    /// Writing to the peer failed.
    #[error("failed to write frame: {source}")]
    Write {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Reading from the peer failed.
    #[error("failed to read frame: {source}")]
    Read {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// An inbound frame exceeded the configured limit.
    #[error("frame exceeds the {limit} byte limit")]
    FrameTooLarge {
        /// Configured limit in bytes.
        limit: usize,
    },
}

/// Errors surfaced while binding or running the socket listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The TCP host did not resolve.
    #[error("failed to resolve TCP address {host}:{port}: {source}")]
    Resolve {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
        /// Underlying resolver error.
        #[source]
        source: io::Error,
    },
    /// The TCP host resolved to nothing.
    #[error("no TCP addresses resolved for {host}:{port}")]
    ResolveEmpty {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
    },
    /// Binding the TCP socket failed.
    #[error("failed to bind TCP listener at {addr}: {source}")]
    BindTcp {
        /// Resolved address.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Switching the listener to non-blocking mode failed.
    #[error("failed to enable non-blocking listener: {source}")]
    NonBlocking {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Unix sockets were requested on a platform without them.
    #[cfg(not(unix))]
    #[error("unix sockets are unsupported for endpoint {endpoint}")]
    UnsupportedUnix {
        /// Configured endpoint.
        endpoint: String,
    },
    /// Binding the Unix socket failed.
    #[cfg(unix)]
    #[error("failed to bind unix listener at {path}: {source}")]
    BindUnix {
        /// Socket path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Another process answers on the socket.
    #[cfg(unix)]
    #[error("existing unix socket {path} is already in use")]
    UnixInUse {
        /// Socket path.
        path: String,
    },
    /// The path exists but is not a socket.
    #[cfg(unix)]
    #[error("unix socket path {path} is not a socket")]
    UnixNotSocket {
        /// Offending path.
        path: String,
    },
    /// Inspecting the existing path failed.
    #[cfg(unix)]
    #[error("failed to read metadata for unix socket {path}: {source}")]
    UnixMetadata {
        /// Socket path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Probing the existing socket failed unexpectedly.
    #[cfg(unix)]
    #[error("failed to connect to existing unix socket {path}: {source}")]
    UnixConnect {
        /// Socket path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Removing a stale socket file failed.
    #[cfg(unix)]
    #[error("failed to remove stale unix socket {path}: {source}")]
    UnixCleanup {
        /// Socket path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The accept thread panicked.
    #[error("listener thread panicked")]
    ThreadPanic,
}
