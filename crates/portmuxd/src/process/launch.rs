//! Wires the router, listener and shutdown signal together.

use std::sync::Arc;

use tracing::info;

use crate::admission::AdmissionHandler;
use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::engine::BackendEngine;
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::placeholder_engine::PlaceholderEngine;
use crate::transport::{ConnectionHandler, SocketListener};

use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal, drain};
use super::{PROCESS_TARGET, SHUTDOWN_TIMEOUT};

/// Collaborators needed to run the router.
pub(crate) struct LaunchPlan<L, S> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) engine: Arc<dyn BackendEngine>,
    pub(crate) shutdown: S,
}

/// Runs the router in the foreground with the production collaborators.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap, listening or the shutdown wait
/// fails. Open connections get a bounded grace period to close once the
/// signal arrives.
pub fn run_daemon() -> Result<(), LaunchError> {
    run_daemon_with(LaunchPlan {
        loader: SystemConfigLoader,
        reporter: Arc::new(StructuredHealthReporter::new()),
        engine: Arc::new(PlaceholderEngine::new()),
        shutdown: SystemShutdownSignal::new(),
    })
}

/// Runs the router with injected collaborators.
pub(crate) fn run_daemon_with<L, S>(plan: LaunchPlan<L, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
{
    let LaunchPlan {
        loader,
        reporter,
        engine,
        shutdown,
    } = plan;

    info!(target: PROCESS_TARGET, "starting router");
    let daemon = bootstrap_with(&loader, reporter, engine)?;
    let config = daemon.config();
    let listener = SocketListener::bind(config.daemon_socket())?;
    let handler = Arc::new(AdmissionHandler::new(
        Arc::clone(daemon.router()),
        config.max_frame_bytes(),
    ));
    let listener_handle = listener.start(Arc::clone(&handler) as Arc<dyn ConnectionHandler>)?;
    info!(
        target: PROCESS_TARGET,
        socket = %config.daemon_socket(),
        "router ready"
    );

    let waited = shutdown.wait();
    listener_handle.shutdown();
    listener_handle.join()?;
    drain(daemon.router(), &handler, SHUTDOWN_TIMEOUT);
    waited?;
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}
