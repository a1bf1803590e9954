//! Request dispatcher.
//!
//! Every inbound frame is either a control request, answered by the router
//! with help from the backend engine, or a backend-bound request, forwarded to
//! the internal channel with its reply path pointing back at the router.
//! Replies to backend-bound requests are routed by correlation id alone, so
//! they may arrive in any order across channels.

mod control;
mod errors;
mod forward;

use std::sync::Arc;

use portmux_protocol::{ChannelId, ClientFrame, FrameError};

use crate::router::Router;

pub use self::errors::DispatchError;

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Dispatches frames arriving on admitted channels.
#[derive(Clone)]
pub struct Dispatcher {
    router: Arc<Router>,
}

impl Dispatcher {
    /// Builds a dispatcher over a shared router.
    #[must_use]
    pub const fn new(router: Arc<Router>) -> Self {
        Self { router }
    }

    /// Routing context in use.
    #[must_use]
    pub const fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Handles one classified frame from `origin`.
    pub fn dispatch(&self, origin: ChannelId, frame: ClientFrame) {
        match frame {
            ClientFrame::Control(request) => control::handle(&self.router, origin, request),
            ClientFrame::Backend(request) => forward::forward(&self.router, origin, request),
        }
    }

    /// Parses and dispatches one raw frame line. Blank lines are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Frame`] when the line is not a valid request.
    pub fn dispatch_line(&self, origin: ChannelId, line: &[u8]) -> Result<(), DispatchError> {
        match ClientFrame::parse(line) {
            Ok(frame) => {
                self.dispatch(origin, frame);
                Ok(())
            }
            Err(FrameError::Empty) => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}
