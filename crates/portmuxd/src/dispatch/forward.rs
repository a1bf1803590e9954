//! Forwarding of backend-bound requests.

use std::sync::Arc;

use tracing::debug;

use portmux_protocol::{BackendRequest, ChannelId};

use crate::engine::{ForwardedRequest, ReplyPath};
use crate::router::Router;

use super::DISPATCH_TARGET;

/// Substitutes the reply path and hands the request to the internal channel
/// once it is available. Nothing is posted back until the engine replies.
pub(super) fn forward(router: &Arc<Router>, origin: ChannelId, request: BackendRequest) {
    let BackendRequest {
        correlation_id,
        body,
    } = request;
    debug!(
        target: DISPATCH_TARGET,
        %origin,
        %correlation_id,
        "forwarding backend request"
    );

    let weak = Arc::downgrade(router);
    let reply = ReplyPath::new(move |reply| {
        if let Some(router) = weak.upgrade() {
            router.route_reply(reply);
        }
    });
    let forwarded = ForwardedRequest {
        correlation_id,
        body,
        reply,
    };
    router
        .backend_slot()
        .when_available(move |channel| channel.send(forwarded));
}
