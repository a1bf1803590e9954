//! Socket transport for client channels.
//!
//! The listener binds the configured endpoint and hands every accepted
//! connection to a [`ConnectionHandler`] on its own thread. Frames travel as
//! JSON lines in both directions.

mod errors;
mod frames;
mod handler;
mod listener;
mod socket_transport;
#[cfg(test)]
pub(crate) mod test_utils;

use portmux_protocol::OutboundFrame;

pub use self::errors::{ListenerError, TransportError};
pub(crate) use self::frames::FrameReader;
pub(crate) use self::handler::{ConnectionHandler, ConnectionStream};
pub(crate) use self::listener::SocketListener;
pub(crate) use self::socket_transport::SocketTransport;

pub(crate) const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// Outbound half of a channel.
pub trait Transport: Send + Sync {
    /// Writes one frame to the peer.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the frame cannot be encoded or written.
    fn post(&self, frame: &OutboundFrame) -> Result<(), TransportError>;
}
