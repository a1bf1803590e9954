//! Wire vocabulary shared by the portmux router and its clients.
//!
//! Every client page talks to the router over its own channel. Frames are
//! single JSON objects; the presence of a `controlOp` key marks a request the
//! router answers itself, anything else must carry a `correlationId` and is
//! forwarded to the backend engine. Replies find their way home by decoding
//! the channel from the high-order digits of that correlation id, see
//! [`CorrelationId::channel`].

mod control;
mod frames;
mod ids;

pub use control::{
    AccountArgs, AccountCreation, ControlOp, ControlRequest, ControlResponse, CreateAccountArgs,
    RecompileArgs, RecreateArgs, ResetAccountArgs, StartArgs,
};
pub use frames::{
    BackendReply, BackendRequest, CHANNEL_FIELD, CONTROL_TAG, CORRELATION_FIELD, ClientFrame,
    FrameError, OutboundFrame, WorkerNotice,
};
pub use ids::{ChannelId, CorrelationError, CorrelationId, SEQUENCE_SPAN};
