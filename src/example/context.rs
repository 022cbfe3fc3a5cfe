//! # ExampleContext: the handle bodies and hooks talk to.
//!
//! One context exists per example run. It owns the run state (captured
//! failure, armed timer, completion progress) and exposes the completion
//! signal (`done`), the example timer (`timeout`) and the loop handle.
//!
//! ## Completion
//! ```text
//!            done / done_after / done_then / done_with
//!                              │ (after delay, if any)
//!                              ▼
//!   Running ──claim──► Finishing ──finish_loop──► Stopped
//!      │                   │  ▲
//!      │                   │  └── forced completion from the example timer
//!      │                   │      (re-enters on_done while Finishing)
//!      └── later done ─────┴──► no-op
//! ```
//!
//! ## Rules
//! - The completion claim is taken when the finish work **executes**, so a
//!   delayed `done` that loses the race to the timer is a no-op
//! - The example timer stays armed until `finish_loop`: it also watches the
//!   variant's shutdown (e.g. a broker close that is never acknowledged)
//! - Failures recorded after the first one never replace it

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::ExampleConfig;
use crate::error::ExampleError;
use crate::events::{Bus, Event, EventKind};
use crate::hooks::{HookPhase, HookRegistry};
use crate::reactor::{LoopHandle, TimerId};

use super::controller::Body;
use super::strategy::ShutdownStrategy;

/// Optional block run by `done` before the variant tears the example down.
pub type FinishFn = Box<dyn FnOnce(&ExampleContext) + Send + 'static>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Completion {
    /// No `done` accepted yet.
    Running,
    /// `done` accepted; the variant is shutting down.
    Finishing,
    /// `finish_loop` ran.
    Stopped,
}

struct RunState {
    captured: Option<ExampleError>,
    timer: Option<TimerId>,
    completion: Completion,
}

struct Inner {
    name: Arc<str>,
    config: ExampleConfig,
    hooks: Arc<HookRegistry>,
    reactor: LoopHandle,
    bus: Bus,
    strategy: Arc<dyn ShutdownStrategy>,
    run: Mutex<RunState>,
}

/// Handle to a running evented example.
///
/// Cheap to clone; every clone refers to the same run.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use evented_spec::{EventedExample, ExampleConfig, HookRegistry};
///
/// EventedExample::loop_only(ExampleConfig::default(), HookRegistry::new(), |ctx| {
///     ctx.timeout(Duration::from_secs(1));
///     ctx.done_after(Duration::from_millis(10));
///     Ok(())
/// })
/// .run()
/// .unwrap();
/// ```
#[derive(Clone)]
pub struct ExampleContext {
    inner: Arc<Inner>,
}

impl ExampleContext {
    pub(crate) fn new(
        name: Arc<str>,
        config: ExampleConfig,
        hooks: Arc<HookRegistry>,
        reactor: LoopHandle,
        bus: Bus,
        strategy: Arc<dyn ShutdownStrategy>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                config,
                hooks,
                reactor,
                bus,
                strategy,
                run: Mutex::new(RunState {
                    captured: None,
                    timer: None,
                    completion: Completion::Running,
                }),
            }),
        }
    }

    /// Example name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Per-run options.
    pub fn config(&self) -> &ExampleConfig {
        &self.inner.config
    }

    /// Handle of the loop driving this example.
    pub fn reactor(&self) -> &LoopHandle {
        &self.inner.reactor
    }

    /// True until `done` has been accepted.
    pub fn is_pending(&self) -> bool {
        self.inner.run.lock().completion == Completion::Running
    }

    /// Signals completion now.
    pub fn done(&self) {
        self.request_done(None, None, false);
    }

    /// Signals completion after `delay`.
    pub fn done_after(&self, delay: Duration) {
        self.request_done(Some(delay), None, false);
    }

    /// Signals completion now, running `finish` first.
    pub fn done_then<F>(&self, finish: F)
    where
        F: FnOnce(&ExampleContext) + Send + 'static,
    {
        self.request_done(None, Some(Box::new(finish)), false);
    }

    /// Signals completion after an optional `delay`, running `finish` first.
    pub fn done_with<F>(&self, delay: Option<Duration>, finish: F)
    where
        F: FnOnce(&ExampleContext) + Send + 'static,
    {
        self.request_done(delay, Some(Box::new(finish)), false);
    }

    /// Arms the example timer, cancelling any timer armed before.
    ///
    /// When it fires before `done`, the example fails with
    /// [`ExampleError::Timeout`] and is force-completed.
    pub fn timeout(&self, timeout: Duration) {
        let prior = {
            let mut run = self.inner.run.lock();
            if run.completion == Completion::Stopped {
                tracing::debug!(example = %self.inner.name, "loop finished; timeout not armed");
                return;
            }
            run.timer.take()
        };
        if let Some(prior) = prior {
            self.cancel_timer(prior);
        }

        let ctx = self.clone();
        let id = self
            .inner
            .reactor
            .schedule_once(timeout, move || ctx.on_timeout(timeout));
        self.inner.run.lock().timer = Some(id);
        self.publish(Event::new(EventKind::TimeoutArmed).with_timeout(timeout));
    }

    /// Runs every hook of `phase` in registration order.
    ///
    /// The first failing hook stops the phase; its error is returned unchanged.
    pub fn run_em_hooks(&self, phase: HookPhase) -> anyhow::Result<()> {
        for hook in self.inner.hooks.hooks(phase) {
            if let Err(err) = hook.call(self) {
                self.publish(
                    Event::new(EventKind::HookFailed)
                        .with_phase(phase)
                        .with_reason(format!("{}: {err:#}", hook.name())),
                );
                return Err(err);
            }
        }
        self.publish(Event::new(EventKind::HooksRan).with_phase(phase));
        Ok(())
    }

    /// Runs `after-loop` hooks and stops the loop.
    ///
    /// Runs at most once per example; later calls return immediately.
    pub fn finish_loop(&self) {
        let timer = {
            let mut run = self.inner.run.lock();
            if run.completion == Completion::Stopped {
                return;
            }
            run.completion = Completion::Stopped;
            run.timer.take()
        };
        if let Some(timer) = timer {
            self.cancel_timer(timer);
        }

        if let Err(err) = self.guarded(|ctx| ctx.run_em_hooks(HookPhase::AfterLoop)) {
            self.record_failure(err);
        }
        if self.inner.reactor.is_running() {
            self.inner.reactor.stop();
        }
        self.publish(Event::new(EventKind::LoopStopped));
    }

    /// Stores `err` as the example's failure unless one is already captured.
    ///
    /// A secondary failure is logged and published as `FailureSuppressed`.
    pub fn record_failure(&self, err: ExampleError) {
        {
            let mut run = self.inner.run.lock();
            if run.captured.is_none() {
                run.captured = Some(err);
                return;
            }
        }
        tracing::warn!(
            example = %self.inner.name,
            label = err.as_label(),
            error = %err.as_message(),
            "secondary failure suppressed; first failure kept"
        );
        self.publish(
            Event::new(EventKind::FailureSuppressed)
                .with_reason(err.as_message())
                .with_label(err.as_label()),
        );
    }

    /// Runs `f`; an error or panic is captured and triggers `done`.
    pub fn invoke_guarded<F>(&self, f: F)
    where
        F: FnOnce(&ExampleContext) -> anyhow::Result<()>,
    {
        if let Err(err) = self.guarded(f) {
            self.record_failure(err);
            self.done();
        }
    }

    /// First loop iteration: hooks, timer, then the variant launches the body.
    pub(crate) fn enter_loop(&self, body: Body) {
        if let Err(err) = self.guarded(|ctx| ctx.run_em_hooks(HookPhase::BeforeLoop)) {
            self.record_failure(err);
            self.finish_loop();
            return;
        }

        self.inner.run.lock().captured = None;
        if let Some(timeout) = self.inner.config.timeout() {
            self.timeout(timeout);
        }
        self.inner.strategy.launch(self, body);
    }

    /// Variant teardown, then hands back the captured failure.
    pub(crate) fn finish_example(&self) -> Result<(), ExampleError> {
        self.inner.strategy.on_finish_example(self);

        let captured = self.inner.run.lock().captured.take();
        match captured {
            None => {
                self.publish(Event::new(EventKind::ExamplePassed));
                Ok(())
            }
            Some(err) => {
                self.publish(
                    Event::new(EventKind::ExampleFailed)
                        .with_reason(err.as_message())
                        .with_label(err.as_label()),
                );
                Err(err)
            }
        }
    }

    pub(crate) fn publish(&self, ev: Event) {
        self.inner.bus.publish(ev.with_example(Arc::clone(&self.inner.name)));
    }

    /// Runs `f`, turning both an `Err` and a panic into an [`ExampleError`].
    pub(crate) fn guarded<F>(&self, f: F) -> Result<(), ExampleError>
    where
        F: FnOnce(&ExampleContext) -> anyhow::Result<()>,
    {
        match catch_unwind(AssertUnwindSafe(|| f(self))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(ExampleError::Body(err)),
            Err(payload) => Err(ExampleError::from_panic(payload)),
        }
    }

    fn request_done(&self, delay: Option<Duration>, finish: Option<FinishFn>, forced: bool) {
        let ctx = self.clone();
        match delay {
            Some(delay) => {
                self.inner
                    .reactor
                    .schedule_once(delay, move || ctx.complete(Some(delay), finish, forced));
            }
            None => ctx.complete(None, finish, forced),
        }
    }

    /// Finish work of `done`: claim completion, run the finish block, hand over to the variant.
    fn complete(&self, delay: Option<Duration>, finish: Option<FinishFn>, forced: bool) {
        {
            let mut run = self.inner.run.lock();
            match run.completion {
                Completion::Stopped => return,
                Completion::Finishing if !forced => {
                    tracing::debug!(example = %self.inner.name, "done already accepted; ignored");
                    return;
                }
                _ => run.completion = Completion::Finishing,
            }
        }

        let mut ev = Event::new(EventKind::DoneRequested);
        if let Some(delay) = delay {
            ev = ev.with_delay(delay);
        }
        if forced {
            ev = ev.with_reason("forced");
        }
        self.publish(ev);

        if let Some(finish) = finish {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| finish(self))) {
                self.record_failure(ExampleError::from_panic(payload));
            }
        }
        self.inner.strategy.on_done(self, forced);
    }

    fn on_timeout(&self, timeout: Duration) {
        {
            let mut run = self.inner.run.lock();
            run.timer = None;
            if run.completion == Completion::Stopped {
                return;
            }
        }
        self.record_failure(ExampleError::Timeout { timeout });
        self.publish(Event::new(EventKind::TimeoutHit).with_timeout(timeout));
        self.request_done(None, None, true);
    }

    fn cancel_timer(&self, id: TimerId) {
        if self.inner.reactor.cancel(id) {
            self.publish(Event::new(EventKind::TimeoutCancelled));
        }
    }
}

impl std::fmt::Debug for ExampleContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let run = self.inner.run.lock();
        f.debug_struct("ExampleContext")
            .field("name", &self.inner.name)
            .field("strategy", &self.inner.strategy.name())
            .field("completion", &run.completion)
            .field("timer", &run.timer)
            .field("captured", &run.captured.as_ref().map(ExampleError::as_label))
            .finish()
    }
}
