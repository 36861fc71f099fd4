use std::sync::Arc;

use tracing::info;

use crate::{BootContext, BootError, Fail, TaskGraph};

/// Start every task of `graph` concurrently and wait until all of them are ready.
///
/// A task that returns `Ok` has its readiness signal closed; one that returns an error (or
/// reports one through its [`Fail`] handle) cancels the whole boot and its signal stays open,
/// so dependents observe cancellation rather than readiness. Returns [`BootError::Cancelled`]
/// if cancellation wins; the cause, if it was a failure, is in [`BootContext::take_failure`].
pub async fn schedule(ctx: Arc<BootContext>, graph: &TaskGraph) -> Result<(), BootError> {
    for task in graph.tasks() {
        let name = task.name();
        let fail = {
            let ctx = ctx.clone();
            let name = name.clone();
            Fail::new(move |err| ctx.fail_task(&name, err))
        };
        let task = task.clone();
        let ctx = ctx.clone();
        let tracker = ctx.tracker().clone();
        tracker.spawn(async move {
            info!(target: "boot.core.sched", task = %name, "starting");
            let cancel = ctx.cancel_token().clone();
            match task.run(cancel, fail.clone(), ctx.clone()).await {
                Ok(()) => {
                    if let Err(e) = ctx.ready().close(&name) {
                        fail.report(e);
                    }
                }
                Err(e) => fail.report(e),
            }
        });
    }

    ctx.wait(ctx.cancel_token(), &graph.names()).await
}
