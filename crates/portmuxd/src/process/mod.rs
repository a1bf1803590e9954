//! Process lifecycle: bootstrap, serve, and shut down on a signal.

mod errors;
mod launch;
mod shutdown;

use std::time::Duration;

pub use self::errors::LaunchError;
pub use self::launch::run_daemon;
pub use self::shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

#[cfg(test)]
pub(crate) use self::launch::{LaunchPlan, run_daemon_with};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
pub(crate) const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);
