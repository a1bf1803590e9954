//! Structured health reporting for router lifecycle events.

use std::sync::Arc;

use portmux_config::Config;
use portmux_protocol::ChannelId;

use crate::bootstrap::BootstrapError;
use crate::engine::EngineError;
use crate::router::RoutingError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer of router lifecycle events.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once a channel has received its handshake.
    fn channel_admitted(&self, channel: ChannelId);

    /// Invoked when a channel leaves the registry.
    fn channel_released(&self, channel: ChannelId);

    /// Invoked before the engine is asked to start.
    fn backend_starting(&self);

    /// Invoked when the first start outcome is a success.
    fn backend_ready(&self);

    /// Invoked when the first start outcome is a failure.
    fn backend_start_failed(&self);

    /// Invoked when the engine refuses a start request outright.
    fn backend_failed(&self, error: &EngineError);

    /// Invoked when a frame cannot be delivered.
    fn routing_failed(&self, error: &RoutingError);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn channel_admitted(&self, channel: ChannelId) {
        (**self).channel_admitted(channel);
    }

    fn channel_released(&self, channel: ChannelId) {
        (**self).channel_released(channel);
    }

    fn backend_starting(&self) {
        (**self).backend_starting();
    }

    fn backend_ready(&self) {
        (**self).backend_ready();
    }

    fn backend_start_failed(&self) {
        (**self).backend_start_failed();
    }

    fn backend_failed(&self, error: &EngineError) {
        (**self).backend_failed(error);
    }

    fn routing_failed(&self, error: &RoutingError) {
        (**self).routing_failed(error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting router bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            socket = %config.daemon_socket(),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            release_on_disconnect = config.release_on_disconnect(),
            login_wait_ms = config.login_wait_ms,
            "router bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "router bootstrap failed"
        );
    }

    fn channel_admitted(&self, channel: ChannelId) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "channel_admitted",
            %channel,
            "channel admitted"
        );
    }

    fn channel_released(&self, channel: ChannelId) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "channel_released",
            %channel,
            "channel released"
        );
    }

    fn backend_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "backend_starting",
            "starting backend engine"
        );
    }

    fn backend_ready(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "backend_ready",
            "backend engine started"
        );
    }

    fn backend_start_failed(&self) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "backend_start_failed",
            "backend engine reported that start failed"
        );
    }

    fn backend_failed(&self, error: &EngineError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "backend_failed",
            error = %error,
            "backend engine refused to start"
        );
    }

    fn routing_failed(&self, error: &RoutingError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "routing_failed",
            error = %error,
            "frame could not be routed"
        );
    }
}
