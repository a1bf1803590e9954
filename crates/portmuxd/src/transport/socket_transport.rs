//! Writes outbound frames to a socket as JSON lines.

use std::io::Write;
use std::sync::{Mutex, PoisonError};

use portmux_protocol::OutboundFrame;

use super::{Transport, TransportError};

/// Transport over the write half of an accepted connection.
///
/// Posts from different threads are serialised so frames never interleave.
pub(crate) struct SocketTransport<W> {
    writer: Mutex<W>,
}

impl<W> SocketTransport<W> {
    pub(crate) const fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl<W> Transport for SocketTransport<W>
where
    W: Write + Send,
{
    fn post(&self, frame: &OutboundFrame) -> Result<(), TransportError> {
        let mut line = serde_json::to_vec(frame)?;
        line.push(b'\n');
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer
            .write_all(&line)
            .and_then(|()| writer.flush())
            .map_err(|source| TransportError::Write { source })
    }
}
