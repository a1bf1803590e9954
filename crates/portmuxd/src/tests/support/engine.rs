//! Backend engine doubles.
//!
//! [`MockEngine`] is a mockall double for expectation-style tests.
//! [`ScriptedEngine`] holds completions and the internal channel back so a
//! scenario decides when the backend answers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mockall::mock;
use serde_json::{Map, Value};

use portmux_protocol::{
    AccountArgs, AccountCreation, CreateAccountArgs, RecompileArgs, RecreateArgs,
    ResetAccountArgs, StartArgs,
};

use crate::engine::{BackendEngine, Completion, EngineError, ForwardedRequest, InternalChannel};
use crate::router::BackendSlot;

mock! {
    pub Engine {}
    impl BackendEngine for Engine {
        fn connect(&self, slot: Arc<BackendSlot>);
        fn start(&self, args: StartArgs, done: Completion<bool>) -> Result<(), EngineError>;
        fn create_account(&self, args: CreateAccountArgs, done: Completion<AccountCreation>);
        fn remove_account(&self, args: AccountArgs, done: Completion<bool>);
        fn reset_account(&self, args: ResetAccountArgs, done: Completion<bool>);
        fn recompile_models(&self, args: RecompileArgs, done: Completion<bool>);
        fn recreate_instances(&self, args: RecreateArgs, done: Completion<bool>);
    }
}

/// Internal channel that records requests and replies only when told to.
#[derive(Debug, Default)]
pub struct ManualChannel {
    requests: Mutex<Vec<ForwardedRequest>>,
    closes: AtomicUsize,
    unsubscribed: Mutex<Vec<Value>>,
}

impl ManualChannel {
    /// Raw correlation ids forwarded so far, in arrival order.
    pub fn forwarded_ids(&self) -> Vec<u64> {
        self.requests
            .lock()
            .expect("requests lock")
            .iter()
            .map(|request| request.correlation_id.get())
            .collect()
    }

    /// Answers the forwarded request carrying `correlation_id`.
    pub fn reply(&self, correlation_id: u64, body: Map<String, Value>) -> Result<(), String> {
        let request = self
            .requests
            .lock()
            .expect("requests lock")
            .iter()
            .find(|request| request.correlation_id.get() == correlation_id)
            .cloned()
            .ok_or_else(|| format!("no forwarded request with id {correlation_id}"))?;
        request.respond(body);
        Ok(())
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn unsubscribed(&self) -> Vec<Value> {
        self.unsubscribed.lock().expect("unsubscribed lock").clone()
    }
}

impl InternalChannel for ManualChannel {
    fn send(&self, request: ForwardedRequest) {
        self.requests.lock().expect("requests lock").push(request);
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn unsubscribe(&self, request: Value) {
        self.unsubscribed
            .lock()
            .expect("unsubscribed lock")
            .push(request);
    }
}

/// Engine whose outcomes are released by the test.
pub struct ScriptedEngine {
    channel: Arc<ManualChannel>,
    slot: Mutex<Option<Arc<BackendSlot>>>,
    provide_on_connect: AtomicBool,
    pending_starts: Mutex<VecDeque<Completion<bool>>>,
    start_refusal: Mutex<Option<EngineError>>,
    start_calls: AtomicUsize,
    creation: Mutex<AccountCreation>,
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self {
            channel: Arc::new(ManualChannel::default()),
            slot: Mutex::new(None),
            provide_on_connect: AtomicBool::new(true),
            pending_starts: Mutex::new(VecDeque::new()),
            start_refusal: Mutex::new(None),
            start_calls: AtomicUsize::new(0),
            creation: Mutex::new(AccountCreation::created()),
        }
    }
}

impl ScriptedEngine {
    /// Keeps the internal channel back until [`Self::make_available`].
    pub fn defer_channel(&self) {
        self.provide_on_connect.store(false, Ordering::SeqCst);
    }

    /// Delivers the internal channel into the connected slot.
    pub fn make_available(&self) -> Result<(), String> {
        let slot = self
            .slot
            .lock()
            .expect("slot lock")
            .clone()
            .ok_or_else(|| "engine was never connected".to_owned())?;
        let channel: Arc<dyn InternalChannel> = Arc::clone(&self.channel) as _;
        slot.provide(channel);
        Ok(())
    }

    /// Makes every later start fail synchronously with `error`.
    pub fn refuse_starts(&self, error: EngineError) {
        *self.start_refusal.lock().expect("refusal lock") = Some(error);
    }

    /// Settles the oldest outstanding start.
    pub fn complete_start(&self, started: bool) -> Result<(), String> {
        let done = self
            .pending_starts
            .lock()
            .expect("pending starts lock")
            .pop_front()
            .ok_or_else(|| "no start is outstanding".to_owned())?;
        done(started);
        Ok(())
    }

    /// Outcome reported by later account creations.
    pub fn create_accounts_with(&self, outcome: AccountCreation) {
        *self.creation.lock().expect("creation lock") = outcome;
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn channel(&self) -> &Arc<ManualChannel> {
        &self.channel
    }
}

impl BackendEngine for ScriptedEngine {
    fn connect(&self, slot: Arc<BackendSlot>) {
        *self.slot.lock().expect("slot lock") = Some(Arc::clone(&slot));
        if self.provide_on_connect.load(Ordering::SeqCst) {
            let channel: Arc<dyn InternalChannel> = Arc::clone(&self.channel) as _;
            slot.provide(channel);
        }
    }

    fn start(&self, _args: StartArgs, done: Completion<bool>) -> Result<(), EngineError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.start_refusal.lock().expect("refusal lock").clone() {
            return Err(error);
        }
        self.pending_starts
            .lock()
            .expect("pending starts lock")
            .push_back(done);
        Ok(())
    }

    fn create_account(&self, _args: CreateAccountArgs, done: Completion<AccountCreation>) {
        let outcome = self.creation.lock().expect("creation lock").clone();
        done(outcome);
    }

    fn remove_account(&self, _args: AccountArgs, done: Completion<bool>) {
        done(true);
    }

    fn reset_account(&self, _args: ResetAccountArgs, done: Completion<bool>) {
        done(true);
    }

    fn recompile_models(&self, _args: RecompileArgs, done: Completion<bool>) {
        done(true);
    }

    fn recreate_instances(&self, _args: RecreateArgs, done: Completion<bool>) {
        done(true);
    }
}
