//! Holder for the internal channel, which becomes available after startup.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::engine::InternalChannel;

use super::ROUTER_TARGET;

type Continuation = Box<dyn FnOnce(Arc<dyn InternalChannel>) + Send + 'static>;

enum SlotState {
    Pending(VecDeque<Continuation>),
    Draining {
        channel: Arc<dyn InternalChannel>,
        queued: VecDeque<Continuation>,
    },
    Ready(Arc<dyn InternalChannel>),
}

/// One-shot, lazily filled slot for the internal channel.
///
/// Work that needs the channel before it exists is queued and runs in arrival
/// order on the thread that fills the slot.
pub struct BackendSlot {
    state: Mutex<SlotState>,
}

impl Default for BackendSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BackendSlot {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("BackendSlot")
            .field("available", &self.is_available())
            .finish()
    }
}

impl BackendSlot {
    /// Builds an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Pending(VecDeque::new())),
        }
    }

    /// Fills the slot and runs queued work. Returns `false`, leaving the
    /// existing channel in place, if the slot was already filled.
    ///
    /// Work arriving while the queue drains is appended behind it, so every
    /// continuation runs in arrival order.
    pub fn provide(&self, channel: Arc<dyn InternalChannel>) -> bool {
        {
            let mut state = self.lock();
            let SlotState::Pending(queued) = &mut *state else {
                warn!(
                    target: ROUTER_TARGET,
                    "internal channel provided twice; keeping the first"
                );
                return false;
            };
            let queued = std::mem::take(queued);
            debug!(
                target: ROUTER_TARGET,
                queued = queued.len(),
                "internal channel available"
            );
            *state = SlotState::Draining { channel, queued };
        }
        self.drain();
        true
    }

    fn drain(&self) {
        loop {
            let mut state = self.lock();
            let SlotState::Draining { channel, queued } = &mut *state else {
                return;
            };
            let next = queued.pop_front();
            let channel = Arc::clone(channel);
            match next {
                Some(work) => {
                    drop(state);
                    work(channel);
                }
                None => {
                    *state = SlotState::Ready(channel);
                    return;
                }
            }
        }
    }

    /// Runs `work` now if the channel is available and nothing is queued,
    /// otherwise once everything queued before it has run.
    pub fn when_available(&self, work: impl FnOnce(Arc<dyn InternalChannel>) + Send + 'static) {
        let mut state = self.lock();
        match &mut *state {
            SlotState::Ready(channel) => {
                let channel = Arc::clone(channel);
                drop(state);
                work(channel);
            }
            SlotState::Pending(queued) | SlotState::Draining { queued, .. } => {
                queued.push_back(Box::new(work));
            }
        }
    }

    /// Whether the channel has been provided.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(*self.lock(), SlotState::Pending(_))
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
