//! Control operations answered by the router.

use std::sync::Arc;

use tracing::{debug, warn};

use portmux_protocol::{
    AccountCreation, ChannelId, ControlOp, ControlRequest, ControlResponse, CorrelationId,
    StartArgs,
};

use crate::engine::Completion;
use crate::router::Router;

use super::DISPATCH_TARGET;

/// Runs one control operation. The answer goes to the channel named by the
/// request's `channelId`, or to `origin` when the request names none.
pub(super) fn handle(router: &Arc<Router>, origin: ChannelId, request: ControlRequest) {
    let reply_to = request.reply_to.map_or(origin, CorrelationId::channel);
    debug!(
        target: DISPATCH_TARGET,
        %origin,
        %reply_to,
        op = request.op.name(),
        "control request"
    );

    let engine = Arc::clone(router.engine());
    match request.op {
        ControlOp::QueryStarted => router.deliver(
            reply_to,
            ControlResponse::QueryStarted {
                started: router.is_started(),
            },
        ),
        ControlOp::QueryLoggedIn => query_logged_in(router, reply_to),
        ControlOp::StartBackend(args) => start_backend(router, reply_to, args),
        ControlOp::CreateAccount(args) => {
            engine.create_account(
                args,
                respond(router, reply_to, |outcome: AccountCreation| {
                    ControlResponse::CreateAccount {
                        success: outcome.success,
                        reason: outcome.reason,
                    }
                }),
            );
        }
        ControlOp::RemoveAccount(args) => engine.remove_account(
            args,
            respond(router, reply_to, |success| ControlResponse::RemoveAccount {
                success,
            }),
        ),
        ControlOp::ResetAccount(args) => engine.reset_account(
            args,
            respond(router, reply_to, |success| ControlResponse::ResetAccount {
                success,
            }),
        ),
        ControlOp::RecompileModels(args) => engine.recompile_models(
            args,
            respond(router, reply_to, |success| {
                ControlResponse::RecompileModels { success }
            }),
        ),
        ControlOp::RecreateInstances(args) => engine.recreate_instances(
            args,
            respond(router, reply_to, |success| {
                ControlResponse::RecreateInstances { success }
            }),
        ),
        ControlOp::Close => router
            .backend_slot()
            .when_available(|channel| channel.close()),
        ControlOp::Unsubscribe { request } => router
            .backend_slot()
            .when_available(move |channel| channel.unsubscribe(request)),
    }
}

/// Builds a completion that posts the mapped outcome to `reply_to`.
fn respond<T>(
    router: &Arc<Router>,
    reply_to: ChannelId,
    into_response: impl FnOnce(T) -> ControlResponse + Send + 'static,
) -> Completion<T> {
    let router = Arc::clone(router);
    Box::new(move |outcome| router.deliver(reply_to, into_response(outcome)))
}

fn start_backend(router: &Arc<Router>, reply_to: ChannelId, args: StartArgs) {
    router.reporter().backend_starting();
    let settle = Arc::clone(router);
    let done: Completion<bool> = Box::new(move |started| {
        settle.record_start_outcome(started);
        settle.deliver(reply_to, ControlResponse::start_settled(started));
    });
    // A synchronous refusal is answered but leaves the readiness gate alone.
    if let Err(error) = router.engine().start(args, done) {
        warn!(
            target: DISPATCH_TARGET,
            channel = %reply_to,
            error = %error,
            "backend start refused"
        );
        router.reporter().backend_failed(&error);
        router.deliver(reply_to, ControlResponse::start_rejected(error.to_string()));
    }
}

/// Answers once the internal channel exists and the first start has settled,
/// waiting at most the configured login wait. Pending, failed and timed-out
/// starts all answer `false`.
fn query_logged_in(router: &Arc<Router>, reply_to: ChannelId) {
    let waiting = Arc::clone(router);
    router.backend_slot().when_available(move |_| {
        let wait = waiting.settings().login_wait;
        if wait.is_zero() {
            let logged_in = waiting.readiness().is_succeeded();
            waiting.deliver(reply_to, ControlResponse::QueryLoggedIn { logged_in });
            return;
        }
        let answer = Arc::clone(&waiting);
        waiting.readiness().when_settled(
            wait,
            Box::new(move |logged_in| {
                answer.deliver(reply_to, ControlResponse::QueryLoggedIn { logged_in });
            }),
        );
    });
}
