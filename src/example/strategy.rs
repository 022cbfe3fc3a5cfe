//! # Shutdown strategy: the variant-specific half of the controller.
//!
//! The controller owns the generic lifecycle (hooks, timeout, captured
//! failure, loop stop); a [`ShutdownStrategy`] decides how the body is
//! launched and what `done` must tear down before the loop may stop.
//!
//! ## Contract
//! ```text
//! launch(ctx, body)        inside the first loop iteration, after before-loop hooks
//! on_done(ctx, forced)     once per accepted done (plus the timer's forced completion);
//!                          must eventually lead to ctx.finish_loop()
//! on_finish_example(ctx)   after the loop stopped, before the verdict
//! ```

use super::context::ExampleContext;
use super::controller::Body;

/// Variant behaviour plugged into an [`EventedExample`](crate::EventedExample).
pub trait ShutdownStrategy: Send + Sync + 'static {
    /// Human-readable name (for logs).
    fn name(&self) -> &'static str;

    /// Starts the body. Failures must be funnelled through
    /// [`ExampleContext::invoke_guarded`] or [`ExampleContext::record_failure`].
    fn launch(&self, ctx: &ExampleContext, body: Body);

    /// Performs the variant's part of `done`.
    ///
    /// `forced` is true when the example timer completes the example; the
    /// strategy must then finish without waiting on external handshakes.
    fn on_done(&self, ctx: &ExampleContext, forced: bool);

    /// Variant teardown after the loop stopped.
    fn on_finish_example(&self, _ctx: &ExampleContext) {}
}
