//! # Broker-session variant.
//!
//! Opens a broker session before the body runs and closes it before the loop
//! may stop. The broker's client state is reset after every run.
//!
//! ## Shutdown after `done`
//! ```text
//! on_done ─► next iteration:
//!              broker-after hooks (once)
//!              ├─ not forced, connected, not closing ─► close() ─► on_closed ─► next iteration: finish_loop
//!              └─ otherwise                          ─► cleanup()  ─────────► next iteration: finish_loop
//!
//! on_finish_example ─► cleanup()   (idempotent: resets broker state at most once)
//! ```
//!
//! A forced completion always takes the second branch, whether the session is
//! open or a close is still pending: no handshake is awaited after a timeout.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::broker::Broker;
use crate::error::ExampleError;
use crate::events::{Event, EventKind};
use crate::hooks::HookPhase;

use super::context::ExampleContext;
use super::controller::Body;
use super::session::SessionState;
use super::strategy::ShutdownStrategy;

struct Progress {
    state: SessionState,
    broker_after_ran: bool,
    cleaned: bool,
}

struct SessionInner {
    broker: Arc<dyn Broker>,
    progress: Mutex<Progress>,
}

/// [`ShutdownStrategy`] running the body inside a broker session.
///
/// One instance serves exactly one example run.
#[derive(Clone)]
pub struct BrokerSession {
    inner: Arc<SessionInner>,
}

impl BrokerSession {
    /// Creates a strategy using `broker`.
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                broker,
                progress: Mutex::new(Progress {
                    state: SessionState::Unopened,
                    broker_after_ran: false,
                    cleaned: false,
                }),
            }),
        }
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.inner.progress.lock().state
    }

    fn transition(&self, ctx: &ExampleContext, next: SessionState) -> bool {
        let mut p = self.inner.progress.lock();
        if !p.state.can_transition_to(next) {
            tracing::warn!(
                example = ctx.name(),
                from = %p.state,
                to = %next,
                "illegal session transition ignored"
            );
            return false;
        }
        p.state = next;
        true
    }

    fn on_open(&self, ctx: &ExampleContext, body: Body) {
        if self.transition(ctx, SessionState::Open) {
            ctx.publish(Event::new(EventKind::SessionOpened));
        }
        if !ctx.is_pending() {
            tracing::debug!(example = ctx.name(), "session opened after done; body skipped");
            return;
        }
        ctx.invoke_guarded(move |ctx| {
            ctx.run_em_hooks(HookPhase::BrokerBefore)?;
            body(ctx)
        });
    }

    fn shut_down(&self, ctx: &ExampleContext, forced: bool) {
        let run_hooks = {
            let mut p = self.inner.progress.lock();
            !std::mem::replace(&mut p.broker_after_ran, true)
        };
        if run_hooks {
            if let Err(err) = ctx.guarded(|ctx| ctx.run_em_hooks(HookPhase::BrokerAfter)) {
                ctx.record_failure(err);
            }
        }

        let broker = &self.inner.broker;
        if !forced && broker.is_connected() && !broker.is_closing() {
            if self.transition(ctx, SessionState::Closing) {
                ctx.publish(Event::new(EventKind::SessionCloseRequested));
            }
            let reactor = ctx.reactor().clone();
            let (session, ctx) = (self.clone(), ctx.clone());
            broker.close(
                &reactor,
                Box::new(move || {
                    if session.transition(&ctx, SessionState::Closed) {
                        ctx.publish(Event::new(EventKind::SessionClosed));
                    }
                    session.defer_finish(&ctx);
                }),
            );
        } else {
            tracing::debug!(example = ctx.name(), forced, "skipping close handshake; cleaning up");
            self.cleanup(ctx);
            self.defer_finish(ctx);
        }
    }

    /// Resets broker state at most once per run.
    fn cleanup(&self, ctx: &ExampleContext) {
        {
            let mut p = self.inner.progress.lock();
            if std::mem::replace(&mut p.cleaned, true) {
                return;
            }
            p.state = SessionState::Closed;
        }

        let broker = &self.inner.broker;
        match catch_unwind(AssertUnwindSafe(|| broker.reset_state())) {
            Ok(Ok(())) => ctx.publish(Event::new(EventKind::BrokerStateReset)),
            Ok(Err(err)) => ctx.record_failure(ExampleError::Broker(err)),
            Err(payload) => ctx.record_failure(ExampleError::from_panic(payload)),
        }
    }

    fn defer_finish(&self, ctx: &ExampleContext) {
        let state = self.state();
        if !state.may_stop_loop() {
            tracing::warn!(example = ctx.name(), state = %state, "stopping loop with live session");
        }
        let ctx2 = ctx.clone();
        ctx.reactor().defer(move || ctx2.finish_loop());
    }
}

impl ShutdownStrategy for BrokerSession {
    fn name(&self) -> &'static str {
        "broker-session"
    }

    fn launch(&self, ctx: &ExampleContext, body: Body) {
        if self.transition(ctx, SessionState::Opening) {
            ctx.publish(
                Event::new(EventKind::SessionOpening).with_reason(ctx.config().broker.endpoint()),
            );
        }

        let (session, ctx2) = (self.clone(), ctx.clone());
        let on_open = Box::new(move || session.on_open(&ctx2, body));
        if let Err(err) = self.inner.broker.connect(ctx.reactor(), &ctx.config().broker, on_open) {
            tracing::debug!(
                example = ctx.name(),
                broker = self.inner.broker.name(),
                error = %err,
                "connect failed"
            );
            ctx.record_failure(ExampleError::Broker(err));
            ctx.done();
        }
    }

    fn on_done(&self, ctx: &ExampleContext, forced: bool) {
        let (session, ctx2) = (self.clone(), ctx.clone());
        ctx.reactor().defer(move || session.shut_down(&ctx2, forced));
    }

    fn on_finish_example(&self, ctx: &ExampleContext) {
        self.cleanup(ctx);
    }
}

impl std::fmt::Debug for BrokerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerSession")
            .field("broker", &self.inner.broker.name())
            .field("state", &self.state())
            .finish()
    }
}
