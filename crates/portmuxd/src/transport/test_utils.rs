//! Test doubles for the transport layer.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use portmux_protocol::OutboundFrame;
use serde_json::Value;

use super::{ConnectionHandler, ConnectionStream, Transport, TransportError};

/// Counts accepted connections and drops them.
pub(crate) struct CountingHandler {
    count: Arc<AtomicUsize>,
}

impl CountingHandler {
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<Self>) {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            count: Arc::clone(&count),
        });
        (count, handler)
    }
}

impl ConnectionHandler for CountingHandler {
    fn handle(&self, _stream: ConnectionStream) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Transport that keeps every posted frame, or fails on demand.
#[derive(Debug, Default)]
pub(crate) struct RecordingTransport {
    frames: Mutex<Vec<OutboundFrame>>,
    failing: AtomicBool,
}

impl RecordingTransport {
    /// Frames posted so far, as JSON values.
    pub(crate) fn values(&self) -> Vec<Value> {
        self.frames
            .lock()
            .expect("recorded frames lock")
            .iter()
            .map(|frame| serde_json::to_value(frame).expect("frame serialises"))
            .collect()
    }

    /// Makes later posts fail with a broken pipe.
    pub(crate) fn fail_posts(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

impl Transport for RecordingTransport {
    fn post(&self, frame: &OutboundFrame) -> Result<(), TransportError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Write {
                source: std::io::Error::from(std::io::ErrorKind::BrokenPipe),
            });
        }
        self.frames
            .lock()
            .expect("recorded frames lock")
            .push(frame.clone());
        Ok(())
    }
}

/// Polls `condition` for up to two seconds.
pub(crate) fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}
