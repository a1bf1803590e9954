//! Multiplexing request router daemon.
//!
//! Many client connections share a single backend engine. Each connection is
//! admitted as a channel and told its handshake id; backend-bound requests are
//! forwarded over one internal channel and their replies are routed back by
//! decoding the channel from the correlation id. Control requests such as
//! starting the engine or asking whether it is up are answered by the router
//! itself.
//!
//! The crate is organised around an explicit [`Router`] context shared by the
//! admission handler and the [`Dispatcher`]. Bootstrap loads configuration,
//! installs structured telemetry and connects the router to a
//! [`BackendEngine`]; [`run_daemon`] then serves the configured socket until a
//! termination signal arrives.

mod admission;
mod bootstrap;
mod dispatch;
mod engine;
mod health;
mod placeholder_engine;
mod process;
mod router;
mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use dispatch::{DispatchError, Dispatcher};
pub use engine::{
    BackendEngine, Completion, EngineError, ForwardedRequest, InternalChannel, ReplyPath,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use placeholder_engine::PlaceholderEngine;
pub use process::{LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon};
pub use router::{BackendSlot, Readiness, ReadinessGate, Router, RouterSettings, RoutingError};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::{ListenerError, Transport, TransportError};

#[cfg(test)]
mod tests;
