//! Error surface for launching and supervising the router process.

use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::transport::ListenerError;

use super::shutdown::ShutdownError;

/// Errors surfaced while running the router process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrapping the router failed.
    #[error("router bootstrap failed: {source}")]
    Bootstrap {
        /// Underlying bootstrap error.
        #[from]
        source: BootstrapError,
    },
    /// Binding or running the socket listener failed.
    #[error("router socket listener failed: {source}")]
    Listener {
        /// Underlying listener error.
        #[from]
        source: ListenerError,
    },
    /// Waiting for shutdown failed.
    #[error("failed to await shutdown signal: {source}")]
    Shutdown {
        /// Underlying shutdown error.
        #[from]
        source: ShutdownError,
    },
}
