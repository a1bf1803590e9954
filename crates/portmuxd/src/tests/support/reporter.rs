//! Test double for [`HealthReporter`] that records events for assertions.

use std::sync::Mutex;

use portmux_config::Config;
use portmux_protocol::ChannelId;

use crate::bootstrap::BootstrapError;
use crate::engine::EngineError;
use crate::health::HealthReporter;
use crate::router::RoutingError;

/// Lifecycle events observed during a scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    ChannelAdmitted(ChannelId),
    ChannelReleased(ChannelId),
    BackendStarting,
    BackendReady,
    BackendStartFailed,
    BackendFailed(String),
    RoutingFailed(String),
}

/// Records health events.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn channel_admitted(&self, channel: ChannelId) {
        self.record(HealthEvent::ChannelAdmitted(channel));
    }

    fn channel_released(&self, channel: ChannelId) {
        self.record(HealthEvent::ChannelReleased(channel));
    }

    fn backend_starting(&self) {
        self.record(HealthEvent::BackendStarting);
    }

    fn backend_ready(&self) {
        self.record(HealthEvent::BackendReady);
    }

    fn backend_start_failed(&self) {
        self.record(HealthEvent::BackendStartFailed);
    }

    fn backend_failed(&self, error: &EngineError) {
        self.record(HealthEvent::BackendFailed(error.to_string()));
    }

    fn routing_failed(&self, error: &RoutingError) {
        self.record(HealthEvent::RoutingFailed(error.to_string()));
    }
}
