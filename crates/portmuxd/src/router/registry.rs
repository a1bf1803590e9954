//! Table of admitted channels.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use portmux_protocol::ChannelId;

use crate::transport::Transport;

use super::RoutingError;

/// Maps channel identifiers to their transports.
///
/// Identifiers come from a monotonic counter starting at 1 and are never
/// handed out twice, even after a channel is released.
pub(crate) struct Registry {
    state: Mutex<RegistryState>,
}

struct RegistryState {
    next: Option<ChannelId>,
    channels: HashMap<ChannelId, Arc<dyn Transport>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                next: Some(ChannelId::FIRST),
                channels: HashMap::new(),
            }),
        }
    }

    /// Stores `transport` under the next unused identifier.
    pub(crate) fn admit(&self, transport: Arc<dyn Transport>) -> Result<ChannelId, RoutingError> {
        let mut state = self.lock();
        let channel = state.next.ok_or(RoutingError::Exhausted)?;
        state.next = channel.next();
        state.channels.insert(channel, transport);
        Ok(channel)
    }

    pub(crate) fn lookup(&self, channel: ChannelId) -> Result<Arc<dyn Transport>, RoutingError> {
        self.lock()
            .channels
            .get(&channel)
            .map(Arc::clone)
            .ok_or(RoutingError::UnknownChannel { channel })
    }

    /// Drops a channel. Returns `false` when it was not registered.
    pub(crate) fn release(&self, channel: ChannelId) -> bool {
        self.lock().channels.remove(&channel).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().channels.len()
    }

    // Every mutation leaves the table consistent, so a poisoned lock is safe
    // to keep using.
    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
