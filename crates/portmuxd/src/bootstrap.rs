//! Router bootstrap orchestration.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use portmux_config::{Config, SocketPreparationError};

use crate::engine::BackendEngine;
use crate::health::HealthReporter;
use crate::router::{Router, RouterSettings};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Source of the router configuration.
pub trait ConfigLoader: Send + Sync {
    /// Loads the configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader's error when no valid configuration can be built.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that reads defaults, files, environment and command line.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader returning a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The socket directory could not be prepared.
    #[error("failed to prepare router socket: {source}")]
    Socket {
        /// Filesystem error reported while preparing the socket directory.
        #[source]
        source: SocketPreparationError,
    },
}

/// Result of a successful bootstrap.
pub struct Daemon {
    config: Config,
    router: Arc<Router>,
    telemetry: TelemetryHandle,
}

impl Daemon {
    /// Resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Shared routing context.
    #[must_use]
    pub const fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Telemetry handle, mainly useful for tests.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }
}

/// Bootstraps the router using the supplied collaborators.
///
/// Loads configuration, installs telemetry, prepares the socket directory,
/// then builds the [`Router`] and connects it to `engine`. The engine's
/// internal channel may arrive later; requests that need it are queued.
///
/// # Errors
///
/// Returns [`BootstrapError`] for the first step that fails. Each failure is
/// also passed to `reporter`.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    engine: Arc<dyn BackendEngine>,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            return Err(fail(
                reporter.as_ref(),
                BootstrapError::Configuration { source },
            ));
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            return Err(fail(reporter.as_ref(), BootstrapError::Telemetry { source }));
        }
    };

    if let Err(source) = config.daemon_socket().prepare_filesystem() {
        return Err(fail(reporter.as_ref(), BootstrapError::Socket { source }));
    }

    let router = Arc::new(Router::new(
        engine,
        Arc::clone(&reporter),
        RouterSettings::from_config(&config),
    ));
    router.connect_backend();
    reporter.bootstrap_succeeded(&config);

    Ok(Daemon {
        config,
        router,
        telemetry,
    })
}

fn fail(reporter: &dyn HealthReporter, error: BootstrapError) -> BootstrapError {
    reporter.bootstrap_failed(&error);
    error
}
