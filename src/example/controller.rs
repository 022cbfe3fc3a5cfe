//! # EventedExample: runner-facing entry point.
//!
//! Built fresh for every example, consumed by [`EventedExample::run`].

use std::sync::Arc;

use crate::broker::Broker;
use crate::config::ExampleConfig;
use crate::error::ExampleError;
use crate::events::{Bus, Event, EventKind};
use crate::hooks::HookRegistry;
use crate::reactor::Reactor;

use super::broker_session::BrokerSession;
use super::context::ExampleContext;
use super::loop_only::LoopOnly;
use super::strategy::ShutdownStrategy;

/// Test body: invoked at most once, inside the loop.
pub type Body = Box<dyn FnOnce(&ExampleContext) -> anyhow::Result<()> + Send + 'static>;

/// One evented example, ready to run.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use evented_spec::{EventedExample, ExampleConfig, HookRegistry, LoopbackBroker};
///
/// let broker = Arc::new(LoopbackBroker::new());
/// EventedExample::broker_session(ExampleConfig::default(), HookRegistry::new(), broker.clone(), |ctx| {
///     ctx.done();
///     Ok(())
/// })
/// .named("opens-and-closes")
/// .run()
/// .unwrap();
///
/// assert_eq!(broker.stats().resets, 1);
/// ```
pub struct EventedExample {
    name: Arc<str>,
    config: ExampleConfig,
    hooks: Arc<HookRegistry>,
    strategy: Arc<dyn ShutdownStrategy>,
    bus: Bus,
    body: Body,
}

impl EventedExample {
    /// Creates an example driven by a custom [`ShutdownStrategy`].
    pub fn new<F>(
        config: ExampleConfig,
        hooks: impl Into<Arc<HookRegistry>>,
        strategy: Arc<dyn ShutdownStrategy>,
        body: F,
    ) -> Self
    where
        F: FnOnce(&ExampleContext) -> anyhow::Result<()> + Send + 'static,
    {
        Self {
            name: Arc::from("example"),
            config,
            hooks: hooks.into(),
            strategy,
            bus: Bus::new(1),
            body: Box::new(body),
        }
    }

    /// Creates an example whose body runs directly inside the loop.
    pub fn loop_only<F>(config: ExampleConfig, hooks: impl Into<Arc<HookRegistry>>, body: F) -> Self
    where
        F: FnOnce(&ExampleContext) -> anyhow::Result<()> + Send + 'static,
    {
        Self::new(config, hooks, Arc::new(LoopOnly), body)
    }

    /// Creates an example whose body runs once a broker session is open.
    pub fn broker_session<F>(
        config: ExampleConfig,
        hooks: impl Into<Arc<HookRegistry>>,
        broker: Arc<dyn Broker>,
        body: F,
    ) -> Self
    where
        F: FnOnce(&ExampleContext) -> anyhow::Result<()> + Send + 'static,
    {
        Self::new(config, hooks, Arc::new(BrokerSession::new(broker)), body)
    }

    /// Sets the name used in events and logs.
    pub fn named(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Publishes lifecycle events to `bus` instead of discarding them.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = bus;
        self
    }

    /// Runs the example to completion on the calling thread.
    ///
    /// Returns after the loop stopped and the variant cleaned up; the error
    /// is the first failure captured during the run.
    ///
    /// Must not be called from inside an async runtime: the failure is then
    /// reported as [`ReactorError::NestedRuntime`](crate::ReactorError::NestedRuntime).
    pub fn run(self) -> Result<(), ExampleError> {
        let reactor = Reactor::new();
        let ctx = ExampleContext::new(
            self.name,
            self.config,
            self.hooks,
            reactor.handle(),
            self.bus,
            self.strategy,
        );
        tracing::debug!(example = ctx.name(), "example starting");
        ctx.publish(Event::new(EventKind::ExampleStarting));

        let entry = ctx.clone();
        let body = self.body;
        if let Err(err) = reactor.run(move || entry.enter_loop(body)) {
            tracing::debug!(example = ctx.name(), label = err.as_label(), "loop exited with error");
            ctx.record_failure(err.into());
        }
        ctx.finish_loop();
        ctx.finish_example()
    }
}

impl std::fmt::Debug for EventedExample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventedExample")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("strategy", &self.strategy.name())
            .finish()
    }
}
