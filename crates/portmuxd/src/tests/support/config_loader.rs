//! Configuration loaders for success and failure scenarios.

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use portmux_config::{Config, SocketEndpoint};

use crate::bootstrap::ConfigLoader;

/// Loader placing the socket under a private temporary directory.
pub struct TestConfigLoader {
    socket_dir: TempDir,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            socket_dir: TempDir::new().expect("temporary socket directory"),
        }
    }

    /// Socket path handed to the router; its parent does not exist yet.
    #[must_use]
    pub fn socket_path(&self) -> PathBuf {
        self.socket_dir.path().join("run").join("portmuxd.sock")
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let path = self.socket_path();
        Ok(Config {
            daemon_socket: SocketEndpoint::unix(path.to_str().expect("utf8 socket path")),
            ..Config::default()
        })
    }
}

/// Loader that fails by passing an unusable socket on the command line.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter([
            OsString::from("portmuxd"),
            OsString::from("--daemon-socket"),
            OsString::from("invalid://socket"),
        ])
    }
}
