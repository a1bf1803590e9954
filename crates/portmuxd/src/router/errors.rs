//! Errors raised while delivering frames to channels.

use thiserror::Error;

use portmux_protocol::{ChannelId, CorrelationError};

use crate::transport::TransportError;

/// Failures that affect a single delivery, never the router as a whole.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// The destination was never admitted or has been released.
    #[error("no channel registered under id {channel}")]
    UnknownChannel {
        /// Destination decoded from the frame.
        channel: ChannelId,
    },
    /// Every encodable channel identifier has been handed out.
    #[error("channel identifiers exhausted")]
    Exhausted,
    /// The handshake id could not be composed.
    #[error("cannot compose handshake id: {source}")]
    Handshake {
        /// Underlying codec error.
        #[from]
        source: CorrelationError,
    },
    /// The channel's transport refused the frame.
    #[error("failed to post to channel {channel}: {source}")]
    Transport {
        /// Destination channel.
        channel: ChannelId,
        /// Underlying transport error.
        #[source]
        source: TransportError,
    },
}
