//! Test harness utilities shared by the behavioural suites.

mod config_loader;
mod engine;
mod reporter;
mod world;

pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use engine::{MockEngine, ScriptedEngine};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use world::{RouterWorld, router_world};
