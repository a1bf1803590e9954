//! Engine used when no real backend is linked into the binary.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use portmux_protocol::{
    AccountArgs, AccountCreation, CreateAccountArgs, RecompileArgs, RecreateArgs,
    ResetAccountArgs, StartArgs,
};

use crate::engine::{BackendEngine, Completion, EngineError, ForwardedRequest, InternalChannel};
use crate::router::BackendSlot;

const ENGINE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::engine");
const NOT_ATTACHED: &str = "no backend engine is attached";

/// Engine that starts successfully and declines everything else.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderEngine;

impl PlaceholderEngine {
    /// Builds the placeholder.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl BackendEngine for PlaceholderEngine {
    fn connect(&self, slot: Arc<BackendSlot>) {
        slot.provide(Arc::new(PlaceholderChannel));
    }

    fn start(&self, args: StartArgs, done: Completion<bool>) -> Result<(), EngineError> {
        debug!(
            target: ENGINE_TARGET,
            username = %args.username,
            "placeholder engine start"
        );
        done(true);
        Ok(())
    }

    fn create_account(&self, args: CreateAccountArgs, done: Completion<AccountCreation>) {
        warn!(
            target: ENGINE_TARGET,
            username = %args.username,
            "create-account declined"
        );
        done(AccountCreation::refused(NOT_ATTACHED));
    }

    fn remove_account(&self, _args: AccountArgs, done: Completion<bool>) {
        done(false);
    }

    fn reset_account(&self, _args: ResetAccountArgs, done: Completion<bool>) {
        done(false);
    }

    fn recompile_models(&self, _args: RecompileArgs, done: Completion<bool>) {
        done(false);
    }

    fn recreate_instances(&self, _args: RecreateArgs, done: Completion<bool>) {
        done(false);
    }
}

/// Internal channel answering every request with an error body.
#[derive(Debug, Clone, Copy)]
struct PlaceholderChannel;

impl InternalChannel for PlaceholderChannel {
    fn send(&self, request: ForwardedRequest) {
        let mut body = Map::new();
        body.insert("error".to_owned(), Value::from(NOT_ATTACHED));
        request.respond(body);
    }

    fn close(&self) {
        debug!(target: ENGINE_TARGET, "placeholder channel closed");
    }

    fn unsubscribe(&self, _request: Value) {}
}
