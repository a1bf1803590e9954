//! Collaborators standing behind the router: the backend engine and its
//! internal channel.
//!
//! The engine exposes named operations that report their outcome through a
//! single completion callback. Backend-bound traffic does not go through the
//! engine operations at all; it is sent on the internal channel, which becomes
//! available some time after the engine is connected.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use portmux_protocol::{
    AccountArgs, AccountCreation, BackendReply, CorrelationId, CreateAccountArgs, RecompileArgs,
    RecreateArgs, ResetAccountArgs, StartArgs,
};

use crate::router::BackendSlot;

/// Callback invoked exactly once with an operation's outcome.
pub type Completion<T> = Box<dyn FnOnce(T) + Send + 'static>;

/// Synchronous failures raised by the backend engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The engine refused to accept the call.
    #[error("backend engine rejected the request: {message}")]
    Rejected {
        /// Engine-supplied explanation.
        message: String,
    },
    /// The engine is not reachable.
    #[error("backend engine is unavailable: {reason}")]
    Unavailable {
        /// Why the engine cannot be reached.
        reason: String,
    },
}

impl EngineError {
    /// Builds a rejection with the given message.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

/// Named operations offered by the backend engine.
///
/// Every operation invokes its completion exactly once. Only [`start`] may
/// also fail before accepting the call.
///
/// [`start`]: BackendEngine::start
pub trait BackendEngine: Send + Sync {
    /// Hands the engine the slot its internal channel is delivered through.
    ///
    /// The engine may fill the slot immediately or from another thread later.
    fn connect(&self, slot: Arc<BackendSlot>);

    /// Starts the engine for an account; completes with `true` on success.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the engine refuses the call outright. The
    /// completion is dropped without being invoked in that case.
    fn start(&self, args: StartArgs, done: Completion<bool>) -> Result<(), EngineError>;

    /// Creates an account.
    fn create_account(&self, args: CreateAccountArgs, done: Completion<AccountCreation>);

    /// Removes an account.
    fn remove_account(&self, args: AccountArgs, done: Completion<bool>);

    /// Resets an account.
    fn reset_account(&self, args: ResetAccountArgs, done: Completion<bool>);

    /// Recompiles locally stored models.
    fn recompile_models(&self, args: RecompileArgs, done: Completion<bool>);

    /// Recreates instances.
    fn recreate_instances(&self, args: RecreateArgs, done: Completion<bool>);
}

/// Conduit carrying backend-bound requests to the engine.
pub trait InternalChannel: Send + Sync {
    /// Forwards a request. Its reply arrives later through the request's
    /// [`ReplyPath`].
    fn send(&self, request: ForwardedRequest);

    /// Closes the channel.
    fn close(&self);

    /// Ends the update stream opened by `request`.
    fn unsubscribe(&self, request: Value);
}

/// Route back to the channel that issued a request.
///
/// Cloning shares the underlying route.
#[derive(Clone)]
pub struct ReplyPath(Arc<dyn Fn(BackendReply) + Send + Sync>);

impl ReplyPath {
    /// Wraps a delivery function.
    pub fn new(deliver: impl Fn(BackendReply) + Send + Sync + 'static) -> Self {
        Self(Arc::new(deliver))
    }

    /// Delivers a reply.
    pub fn deliver(&self, reply: BackendReply) {
        (self.0)(reply);
    }
}

impl fmt::Debug for ReplyPath {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("ReplyPath")
    }
}

/// A backend-bound request with its reply path substituted by the router.
#[derive(Debug, Clone)]
pub struct ForwardedRequest {
    /// Id the reply must carry.
    pub correlation_id: CorrelationId,
    /// Opaque payload.
    pub body: Map<String, Value>,
    /// Where the reply goes.
    pub reply: ReplyPath,
}

impl ForwardedRequest {
    /// Sends `body` back as the reply to this request.
    pub fn respond(&self, body: Map<String, Value>) {
        self.reply.deliver(BackendReply {
            correlation_id: self.correlation_id,
            body,
        });
    }
}
