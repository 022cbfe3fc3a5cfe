//! # Loop-only variant.

use super::context::ExampleContext;
use super::controller::Body;
use super::strategy::ShutdownStrategy;

/// Runs the body directly inside the loop; `done` stops the loop on the next iteration.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoopOnly;

impl ShutdownStrategy for LoopOnly {
    fn name(&self) -> &'static str {
        "loop-only"
    }

    fn launch(&self, ctx: &ExampleContext, body: Body) {
        if !ctx.is_pending() {
            tracing::debug!(example = ctx.name(), "done before launch; body skipped");
            return;
        }
        ctx.invoke_guarded(body);
    }

    fn on_done(&self, ctx: &ExampleContext, _forced: bool) {
        let ctx2 = ctx.clone();
        ctx.reactor().defer(move || ctx2.finish_loop());
    }
}
