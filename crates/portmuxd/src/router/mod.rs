//! Shared routing state: admitted channels, backend readiness and the
//! internal channel slot.
//!
//! A [`Router`] is built once per daemon and shared as `Arc<Router>` between
//! the admission handler and the dispatcher. All outbound traffic leaves
//! through [`Router::post_to`].

mod backend_slot;
mod errors;
mod readiness;
mod registry;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, warn};

use portmux_config::Config;
use portmux_protocol::{BackendReply, ChannelId, CorrelationId, OutboundFrame, WorkerNotice};

use crate::engine::BackendEngine;
use crate::health::HealthReporter;
use crate::transport::Transport;

pub use self::backend_slot::BackendSlot;
pub use self::errors::RoutingError;
pub use self::readiness::{Readiness, ReadinessGate};
use self::registry::Registry;

pub(crate) const ROUTER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::router");

/// Routing behaviour taken from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterSettings {
    /// Remove channels from the registry when their connection ends.
    pub release_on_disconnect: bool,
    /// Longest `query-logged-in` wait for a pending start.
    pub login_wait: Duration,
}

impl RouterSettings {
    /// Extracts the routing settings from the daemon configuration.
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            release_on_disconnect: config.release_on_disconnect(),
            login_wait: config.login_wait(),
        }
    }
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Routing context shared by every channel.
pub struct Router {
    registry: Registry,
    gate: Arc<ReadinessGate>,
    started: AtomicBool,
    slot: Arc<BackendSlot>,
    engine: Arc<dyn BackendEngine>,
    reporter: Arc<dyn HealthReporter>,
    settings: RouterSettings,
}

impl Router {
    /// Builds a router with no channels and a pending backend.
    #[must_use]
    pub fn new(
        engine: Arc<dyn BackendEngine>,
        reporter: Arc<dyn HealthReporter>,
        settings: RouterSettings,
    ) -> Self {
        Self {
            registry: Registry::new(),
            gate: Arc::new(ReadinessGate::new()),
            started: AtomicBool::new(false),
            slot: Arc::new(BackendSlot::new()),
            engine,
            reporter,
            settings,
        }
    }

    /// Asks the engine to deliver its internal channel into this router's
    /// slot.
    pub fn connect_backend(&self) {
        self.engine.connect(Arc::clone(&self.slot));
    }

    /// Registers a new channel and sends it its handshake id.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError`] when identifiers are exhausted or the handshake
    /// cannot be written. In the latter case the channel is released again.
    pub fn admit(&self, transport: Arc<dyn Transport>) -> Result<ChannelId, RoutingError> {
        let channel = self.registry.admit(transport)?;
        let handshake = match CorrelationId::handshake(channel) {
            Ok(handshake) => handshake,
            Err(source) => {
                self.registry.release(channel);
                return Err(source.into());
            }
        };
        if let Err(error) = self.post_to(channel, WorkerNotice::ChannelId {
            channel_id: handshake,
        }) {
            self.registry.release(channel);
            self.reporter.routing_failed(&error);
            return Err(error);
        }
        self.reporter.channel_admitted(channel);
        Ok(channel)
    }

    /// Removes a channel from the registry. Its identifier is not reused.
    pub fn release(&self, channel: ChannelId) -> bool {
        let released = self.registry.release(channel);
        if released {
            self.reporter.channel_released(channel);
        }
        released
    }

    /// Handles the end of a channel's connection.
    ///
    /// The channel is released only when configured to do so; otherwise it
    /// stays registered and later posts to it fail at the transport.
    pub fn disconnected(&self, channel: ChannelId) {
        if self.settings.release_on_disconnect {
            self.release(channel);
        } else {
            debug!(
                target: ROUTER_TARGET,
                %channel,
                "channel disconnected; keeping registration"
            );
        }
    }

    /// Posts a frame to a channel.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::UnknownChannel`] for unregistered channels and
    /// [`RoutingError::Transport`] when the write fails.
    pub fn post_to(
        &self,
        channel: ChannelId,
        frame: impl Into<OutboundFrame>,
    ) -> Result<(), RoutingError> {
        let transport = self.registry.lookup(channel)?;
        transport
            .post(&frame.into())
            .map_err(|source| RoutingError::Transport { channel, source })
    }

    /// Posts a frame, logging and reporting any failure.
    pub fn deliver(&self, channel: ChannelId, frame: impl Into<OutboundFrame>) {
        if let Err(error) = self.post_to(channel, frame) {
            warn!(
                target: ROUTER_TARGET,
                %channel,
                error = %error,
                "frame delivery failed"
            );
            self.reporter.routing_failed(&error);
        }
    }

    /// Sends a backend reply to the channel encoded in its correlation id.
    pub fn route_reply(&self, reply: BackendReply) {
        let channel = reply.correlation_id.channel();
        debug!(
            target: ROUTER_TARGET,
            correlation_id = %reply.correlation_id,
            %channel,
            "routing backend reply"
        );
        self.deliver(channel, reply);
    }

    /// Records the outcome of a backend start.
    ///
    /// The first outcome settles the readiness gate and is reported; any
    /// success latches the started flag for good.
    pub fn record_start_outcome(&self, started: bool) {
        if started {
            self.started.store(true, Ordering::SeqCst);
            if self.gate.signal_success() {
                self.reporter.backend_ready();
            }
        } else if self.gate.signal_failure() {
            self.reporter.backend_start_failed();
        } else {
            debug!(target: ROUTER_TARGET, "late start failure ignored");
        }
    }

    /// Whether a backend start has ever succeeded.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Gate tracking the first backend start outcome.
    #[must_use]
    pub const fn readiness(&self) -> &Arc<ReadinessGate> {
        &self.gate
    }

    /// Slot the internal channel is delivered through.
    #[must_use]
    pub const fn backend_slot(&self) -> &Arc<BackendSlot> {
        &self.slot
    }

    /// Engine answering control operations.
    #[must_use]
    pub const fn engine(&self) -> &Arc<dyn BackendEngine> {
        &self.engine
    }

    /// Lifecycle event sink.
    #[must_use]
    pub const fn reporter(&self) -> &Arc<dyn HealthReporter> {
        &self.reporter
    }

    /// Routing settings.
    #[must_use]
    pub const fn settings(&self) -> RouterSettings {
        self.settings
    }

    /// Number of registered channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.registry.len()
    }
}
