//! Termination signals and the bounded drain that follows them.

use std::io;
use std::time::Duration;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::admission::AdmissionHandler;
use crate::router::Router;

use super::PROCESS_TARGET;

const TERMINATION_SIGNALS: [i32; 4] = [SIGTERM, SIGINT, SIGQUIT, SIGHUP];

/// Source of the shutdown request.
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until shutdown should proceed.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError`] when the wait cannot be set up.
    fn wait(&self) -> Result<(), ShutdownError>;
}

/// Errors reported by shutdown listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Waits for the first of SIGTERM, SIGINT, SIGQUIT or SIGHUP.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemShutdownSignal;

impl SystemShutdownSignal {
    /// Builds a listener for the termination signals.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let mut signals =
            Signals::new(TERMINATION_SIGNALS).map_err(|source| ShutdownError::Install { source })?;
        let received = signals.forever().next();
        info!(target: PROCESS_TARGET, signal = ?received, "shutdown signal received");
        Ok(())
    }
}

/// Closes every open connection, then the internal channel.
///
/// Connection threads get at most `budget` to finish; stragglers are logged
/// and left behind.
pub(crate) fn drain(router: &Router, connections: &AdmissionHandler, budget: Duration) {
    info!(
        target: PROCESS_TARGET,
        connections = connections.open_connections(),
        channels = router.channel_count(),
        budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
        "draining router"
    );
    let stragglers = connections.close_all(budget);
    if stragglers > 0 {
        warn!(
            target: PROCESS_TARGET,
            stragglers,
            "connections still open after the shutdown budget"
        );
    }

    let slot = router.backend_slot();
    if slot.is_available() {
        slot.when_available(|channel| channel.close());
    } else {
        debug!(target: PROCESS_TARGET, "no internal channel to close");
    }
}
