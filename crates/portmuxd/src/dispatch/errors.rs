//! Errors raised while turning inbound bytes into dispatched frames.

use thiserror::Error;

use portmux_protocol::{FrameError, WorkerNotice};

use crate::transport::TransportError;

/// A frame that could not be read or classified.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The connection failed or sent an oversize frame.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The frame was read but is not a valid request.
    #[error("rejected frame: {0}")]
    Frame(#[from] FrameError),
}

impl DispatchError {
    /// Whether the connection must be dropped after this error.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Error notice to send to the channel, if the peer should be told.
    ///
    /// Read failures get no notice since the peer is gone.
    #[must_use]
    pub fn notice(&self) -> Option<WorkerNotice> {
        match self {
            Self::Transport(TransportError::Read { .. }) => None,
            Self::Transport(_) | Self::Frame(_) => Some(WorkerNotice::error(self.to_string())),
        }
    }
}
