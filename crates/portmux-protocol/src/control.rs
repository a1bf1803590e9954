//! Control requests answered by the router itself.
//!
//! Control operations form a closed set. Each request names its operation in
//! the `controlOp` field; the response echoes that name and carries the
//! outcome fields for the operation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::frames::CHANNEL_FIELD;
use crate::ids::CorrelationId;

/// Arguments for starting the backend engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StartArgs {
    /// Account the engine runs for.
    pub username: String,
    /// Opaque store credentials passed through to the engine.
    pub credentials: Value,
    /// Opaque runtime options.
    pub options: Value,
}

/// Arguments for creating an account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateAccountArgs {
    /// Account to create.
    pub username: String,
    /// Opaque store credentials.
    pub credentials: Value,
    /// Opaque runtime options for the new account.
    pub runtime_options: Value,
    /// Optional identity document to seed the account with.
    pub identity_document: Option<Value>,
}

/// Arguments naming an account and its credentials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountArgs {
    /// Account to operate on.
    pub username: String,
    /// Opaque store credentials.
    pub credentials: Value,
}

/// Arguments for resetting an account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResetAccountArgs {
    /// Account to reset.
    pub username: String,
    /// Opaque store credentials.
    pub credentials: Value,
    /// Opaque reset options.
    pub options: Value,
}

/// Arguments for recompiling locally stored models.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecompileArgs {
    /// Opaque store credentials.
    pub credentials: Value,
}

/// Arguments for recreating instances.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecreateArgs {
    /// Opaque store credentials.
    pub credentials: Value,
    /// Opaque options.
    pub options: Value,
}

/// Outcome reported by the engine after creating an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCreation {
    /// Whether the account now exists.
    pub success: bool,
    /// Explanation supplied by the engine when creation failed.
    pub reason: Option<String>,
}

impl AccountCreation {
    /// Successful creation.
    #[must_use]
    pub const fn created() -> Self {
        Self {
            success: true,
            reason: None,
        }
    }

    /// Failed creation with a reason.
    #[must_use]
    pub fn refused(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: Some(reason.into()),
        }
    }
}

/// Operations the router handles without forwarding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "controlOp", rename_all = "kebab-case")]
pub enum ControlOp {
    /// Has a backend start ever succeeded. Answered immediately.
    QueryStarted,
    /// Is the backend up and its start settled successfully.
    QueryLoggedIn,
    /// Start the backend engine.
    StartBackend(StartArgs),
    /// Create an account.
    CreateAccount(CreateAccountArgs),
    /// Remove an account.
    RemoveAccount(AccountArgs),
    /// Reset an account.
    ResetAccount(ResetAccountArgs),
    /// Recompile locally stored models.
    RecompileModels(RecompileArgs),
    /// Recreate instances.
    RecreateInstances(RecreateArgs),
    /// Close the internal channel. No response.
    Close,
    /// Drop interest in a stream of backend updates. No response.
    Unsubscribe {
        /// Opaque request whose subscription ends.
        #[serde(default)]
        request: Value,
    },
}

impl ControlOp {
    /// Returns the wire name of the operation.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::QueryStarted => "query-started",
            Self::QueryLoggedIn => "query-logged-in",
            Self::StartBackend(_) => "start-backend",
            Self::CreateAccount(_) => "create-account",
            Self::RemoveAccount(_) => "remove-account",
            Self::ResetAccount(_) => "reset-account",
            Self::RecompileModels(_) => "recompile-models",
            Self::RecreateInstances(_) => "recreate-instances",
            Self::Close => "close",
            Self::Unsubscribe { .. } => "unsubscribe",
        }
    }
}

/// A control operation together with its reply address.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlRequest {
    /// Handshake id of the requesting channel, when the client supplied one.
    pub reply_to: Option<CorrelationId>,
    /// Requested operation.
    pub op: ControlOp,
}

impl ControlRequest {
    /// Builds a request without a reply address.
    #[must_use]
    pub const fn new(op: ControlOp) -> Self {
        Self { reply_to: None, op }
    }

    /// Sets the reply address.
    #[must_use]
    pub const fn with_reply_to(mut self, reply_to: CorrelationId) -> Self {
        self.reply_to = Some(reply_to);
        self
    }

    /// Renders the request as a wire object.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation cannot be serialised.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        let Value::Object(mut object) = serde_json::to_value(&self.op)? else {
            return Err(serde::ser::Error::custom(
                "control operation did not serialise to an object",
            ));
        };
        if let Some(reply_to) = self.reply_to {
            object.insert(CHANNEL_FIELD.to_owned(), Value::from(reply_to.get()));
        }
        Ok(Value::Object(object))
    }
}

/// Responses posted back for control operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "controlOp", rename_all = "kebab-case")]
pub enum ControlResponse {
    /// Answer to [`ControlOp::QueryStarted`].
    QueryStarted {
        /// Latched start flag.
        started: bool,
    },
    /// Answer to [`ControlOp::QueryLoggedIn`].
    QueryLoggedIn {
        /// `true` only after a successful start.
        #[serde(rename = "loggedIn")]
        logged_in: bool,
    },
    /// Answer to [`ControlOp::StartBackend`].
    StartBackend {
        /// Outcome delivered by the engine.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        started: Option<bool>,
        /// Error raised while invoking the engine.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Answer to [`ControlOp::CreateAccount`].
    CreateAccount {
        /// Whether the account was created.
        success: bool,
        /// Engine explanation when it was not.
        #[serde(default)]
        reason: Option<String>,
    },
    /// Answer to [`ControlOp::RemoveAccount`].
    RemoveAccount {
        /// Engine outcome.
        success: bool,
    },
    /// Answer to [`ControlOp::ResetAccount`].
    ResetAccount {
        /// Engine outcome.
        success: bool,
    },
    /// Answer to [`ControlOp::RecompileModels`].
    RecompileModels {
        /// Engine outcome.
        success: bool,
    },
    /// Answer to [`ControlOp::RecreateInstances`].
    RecreateInstances {
        /// Engine outcome.
        success: bool,
    },
}

impl ControlResponse {
    /// Start outcome delivered through the engine callback.
    #[must_use]
    pub const fn start_settled(started: bool) -> Self {
        Self::StartBackend {
            started: Some(started),
            error: None,
        }
    }

    /// Start attempt that failed before the engine accepted it.
    #[must_use]
    pub fn start_rejected(error: impl Into<String>) -> Self {
        Self::StartBackend {
            started: None,
            error: Some(error.into()),
        }
    }

    /// Returns the wire name of the answered operation.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::QueryStarted { .. } => "query-started",
            Self::QueryLoggedIn { .. } => "query-logged-in",
            Self::StartBackend { .. } => "start-backend",
            Self::CreateAccount { .. } => "create-account",
            Self::RemoveAccount { .. } => "remove-account",
            Self::ResetAccount { .. } => "reset-account",
            Self::RecompileModels { .. } => "recompile-models",
            Self::RecreateInstances { .. } => "recreate-instances",
        }
    }
}
