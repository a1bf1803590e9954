//! Router world shared by the routing and control scenarios.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use portmux_protocol::{CONTROL_TAG, ChannelId};

use crate::dispatch::{DispatchError, Dispatcher};
use crate::engine::BackendEngine;
use crate::health::HealthReporter;
use crate::router::{Router, RouterSettings};
use crate::transport::test_utils::{RecordingTransport, wait_until};

use super::{RecordingHealthReporter, ScriptedEngine};

const DEFAULT_LOGIN_WAIT: Duration = Duration::from_millis(100);

struct Client {
    channel: ChannelId,
    transport: Arc<RecordingTransport>,
}

/// A router with named, recorded clients.
pub struct RouterWorld {
    pub engine: Arc<ScriptedEngine>,
    pub reporter: Arc<RecordingHealthReporter>,
    settings: RouterSettings,
    router: Option<Arc<Router>>,
    clients: HashMap<String, Client>,
}

/// Fixture body for the router scenarios.
pub fn router_world() -> RefCell<RouterWorld> {
    RefCell::new(RouterWorld::new())
}

impl RouterWorld {
    fn new() -> Self {
        Self {
            engine: Arc::new(ScriptedEngine::default()),
            reporter: Arc::new(RecordingHealthReporter::default()),
            settings: RouterSettings {
                login_wait: DEFAULT_LOGIN_WAIT,
                ..RouterSettings::default()
            },
            router: None,
            clients: HashMap::new(),
        }
    }

    /// Changes the login wait used when the router is built.
    pub fn set_login_wait(&mut self, wait: Duration) -> Result<(), String> {
        if self.router.is_some() {
            return Err("router already built".to_owned());
        }
        self.settings.login_wait = wait;
        Ok(())
    }

    /// Builds the router on first use and connects the engine.
    pub fn router(&mut self) -> Arc<Router> {
        if let Some(router) = &self.router {
            return Arc::clone(router);
        }
        let engine: Arc<dyn BackendEngine> = Arc::clone(&self.engine) as _;
        let reporter: Arc<dyn HealthReporter> = Arc::clone(&self.reporter) as _;
        let router = Arc::new(Router::new(engine, reporter, self.settings));
        router.connect_backend();
        self.router = Some(Arc::clone(&router));
        router
    }

    /// Admits a client under `name`.
    pub fn connect(&mut self, name: &str) -> Result<ChannelId, String> {
        let transport = Arc::new(RecordingTransport::default());
        let channel = self
            .router()
            .admit(Arc::clone(&transport) as _)
            .map_err(|error| error.to_string())?;
        self.clients
            .insert(name.to_owned(), Client { channel, transport });
        Ok(channel)
    }

    /// Releases the named client as though its connection ended.
    pub fn disconnect(&mut self, name: &str) -> Result<(), String> {
        let channel = self.client(name)?.channel;
        self.router().disconnected(channel);
        Ok(())
    }

    pub fn channel(&self, name: &str) -> Result<ChannelId, String> {
        Ok(self.client(name)?.channel)
    }

    /// Dispatches `frame` as though `name` had written it.
    pub fn send(&mut self, name: &str, frame: &Value) -> Result<(), String> {
        let channel = self.client(name)?.channel;
        let line = serde_json::to_vec(frame).map_err(|error| error.to_string())?;
        Dispatcher::new(self.router())
            .dispatch_line(channel, &line)
            .map_err(|error: DispatchError| error.to_string())
    }

    /// Every frame posted to `name`, handshake included.
    pub fn frames(&self, name: &str) -> Result<Vec<Value>, String> {
        Ok(self.client(name)?.transport.values())
    }

    /// Frames posted to `name` after its handshake.
    pub fn replies(&self, name: &str) -> Result<Vec<Value>, String> {
        Ok(self.frames(name)?.into_iter().skip(1).collect())
    }

    /// Waits for a control response to `op` and returns the latest one.
    pub fn await_response(&self, name: &str, op: &str) -> Result<Value, String> {
        let transport = Arc::clone(&self.client(name)?.transport);
        let latest = || {
            transport
                .values()
                .into_iter()
                .rev()
                .find(|frame| frame.get(CONTROL_TAG).and_then(Value::as_str) == Some(op))
        };
        if wait_until(|| latest().is_some()) {
            latest().ok_or_else(|| format!("{name} lost its {op} response"))
        } else {
            Err(format!("{name} never received a {op} response"))
        }
    }

    /// Makes posts to `name` fail from now on.
    pub fn break_transport(&self, name: &str) -> Result<(), String> {
        self.client(name)?.transport.fail_posts();
        Ok(())
    }

    fn client(&self, name: &str) -> Result<&Client, String> {
        self.clients
            .get(name)
            .ok_or_else(|| format!("unknown client {name}"))
    }
}
