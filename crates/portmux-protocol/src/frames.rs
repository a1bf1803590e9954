//! Frame classification and envelopes.
//!
//! Inbound frames are JSON objects. A `controlOp` key selects the control path;
//! every other frame is a backend-bound request and must carry a
//! `correlationId`. Outbound frames are one of the worker notices, a control
//! response, or a backend reply.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::control::{ControlOp, ControlRequest, ControlResponse};
use crate::ids::CorrelationId;

/// Key whose presence marks a control request.
pub const CONTROL_TAG: &str = "controlOp";
/// Key carrying the reply address of a control request.
pub const CHANNEL_FIELD: &str = "channelId";
/// Key carrying the correlation id of backend traffic.
pub const CORRELATION_FIELD: &str = "correlationId";

/// Errors raised while classifying an inbound frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The frame contained no data.
    #[error("empty frame")]
    Empty,
    /// The frame was valid JSON but not an object.
    #[error("frame must be a JSON object")]
    NotAnObject,
    /// A backend-bound frame lacked a correlation id.
    #[error("frame has neither `controlOp` nor `correlationId`")]
    MissingCorrelationId,
    /// The frame could not be decoded.
    #[error("malformed frame: {source}")]
    Malformed {
        /// Underlying decoder error.
        #[from]
        source: serde_json::Error,
    },
}

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientFrame {
    /// Answered by the router.
    Control(ControlRequest),
    /// Forwarded to the backend engine.
    Backend(BackendRequest),
}

impl ClientFrame {
    /// Parses and classifies one frame line.
    ///
    /// Trailing whitespace, including the newline delimiter, is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] when the line is empty, is not a JSON object, or
    /// does not match either frame shape.
    pub fn parse(line: &[u8]) -> Result<Self, FrameError> {
        let trimmed = trim_trailing_whitespace(line);
        if trimmed.is_empty() {
            return Err(FrameError::Empty);
        }
        let value: Value = serde_json::from_slice(trimmed)?;
        Self::from_value(value)
    }

    /// Classifies an already decoded frame.
    ///
    /// # Errors
    ///
    /// See [`ClientFrame::parse`].
    pub fn from_value(value: Value) -> Result<Self, FrameError> {
        let Value::Object(object) = value else {
            return Err(FrameError::NotAnObject);
        };

        if object.contains_key(CONTROL_TAG) {
            let reply_to = object
                .get(CHANNEL_FIELD)
                .filter(|value| !value.is_null())
                .map(|value| CorrelationId::deserialize(value))
                .transpose()?;
            let op = ControlOp::deserialize(Value::Object(object))?;
            return Ok(Self::Control(ControlRequest { reply_to, op }));
        }

        if !object.contains_key(CORRELATION_FIELD) {
            return Err(FrameError::MissingCorrelationId);
        }
        let request = BackendRequest::deserialize(Value::Object(object))?;
        Ok(Self::Backend(request))
    }
}

/// A request forwarded opaquely to the backend engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendRequest {
    /// Client-minted id whose high digits name the issuing channel.
    #[serde(rename = "correlationId")]
    pub correlation_id: CorrelationId,
    /// Remaining payload, untouched by the router.
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

/// A reply produced by the backend engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendReply {
    /// Id of the request being answered.
    #[serde(rename = "correlationId")]
    pub correlation_id: CorrelationId,
    /// Result payload, untouched by the router.
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl BackendReply {
    /// Builds a reply with an empty body.
    #[must_use]
    pub fn new(correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            body: Map::new(),
        }
    }

    /// Adds a body field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.body.insert(key.into(), value.into());
        self
    }
}

/// Notices the worker sends on its own initiative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum WorkerNotice {
    /// Sent once on admission; tells the client its handshake id.
    #[serde(rename = "channelId")]
    ChannelId {
        /// The channel's handshake correlation id.
        #[serde(rename = "channelId")]
        channel_id: CorrelationId,
    },
    /// Channel-level error for a frame the router could not handle.
    #[serde(rename = "error")]
    Error {
        /// Human-readable description.
        message: String,
    },
}

impl WorkerNotice {
    /// Builds an error notice.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Everything the router posts to a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutboundFrame {
    /// Handshake or error notice.
    Notice(WorkerNotice),
    /// Answer to a control request.
    Control(ControlResponse),
    /// Routed backend reply.
    Backend(BackendReply),
}

impl From<WorkerNotice> for OutboundFrame {
    fn from(notice: WorkerNotice) -> Self {
        Self::Notice(notice)
    }
}

impl From<ControlResponse> for OutboundFrame {
    fn from(response: ControlResponse) -> Self {
        Self::Control(response)
    }
}

impl From<BackendReply> for OutboundFrame {
    fn from(reply: BackendReply) -> Self {
        Self::Backend(reply)
    }
}

fn trim_trailing_whitespace(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|byte| !byte.is_ascii_whitespace())
        .map_or(0, |pos| pos + 1);
    bytes.get(..end).unwrap_or_default()
}
