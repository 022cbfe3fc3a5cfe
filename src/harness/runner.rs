//! # Harness: shared state and entry points for a suite of examples.
//!
//! ## Shutdown
//! ```text
//! shutdown()
//!   ├─ cancel listener ─► listener drains what is already on the bus ─► returns SubscriberSet
//!   ├─ SubscriberSet::shutdown(grace)
//!   │     ├─ all workers joined ─► Ok(())
//!   │     └─ grace exceeded     ─► Err(GraceExceeded { stuck })
//!   └─ background runtime dropped
//! ```
//!
//! ## Example
//! ```rust
//! use evented_spec::{HarnessBuilder, HarnessConfig};
//!
//! let harness = HarnessBuilder::new(HarnessConfig::default()).build().unwrap();
//! harness
//!     .run_loop("finishes-immediately", |ctx| {
//!         ctx.done();
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let tally = harness.tally();
//! harness.shutdown().unwrap();
//! assert_eq!(tally.passed(), vec!["finishes-immediately".to_string()]);
//! ```

use std::sync::Arc;

use tokio::runtime::Runtime;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::broadcast::Receiver;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::broker::Broker;
use crate::config::{ExampleConfig, HarnessConfig};
use crate::error::{ExampleError, HarnessError};
use crate::events::{Bus, Event};
use crate::example::{EventedExample, ExampleContext};
use crate::hooks::HookRegistry;
use crate::subscribers::{SubscriberSet, Tally};

/// Suite-level owner of hooks, broker, bus and subscribers.
pub struct Harness {
    cfg: HarnessConfig,
    hooks: Arc<HookRegistry>,
    broker: Arc<dyn Broker>,
    bus: Bus,
    tally: Arc<Tally>,
    stop: CancellationToken,
    listener: JoinHandle<SubscriberSet>,
    rt: Runtime,
}

impl Harness {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new_internal(
        cfg: HarnessConfig,
        hooks: Arc<HookRegistry>,
        broker: Arc<dyn Broker>,
        bus: Bus,
        subs: SubscriberSet,
        tally: Arc<Tally>,
        stop: CancellationToken,
        rt: Runtime,
    ) -> Self {
        let rx = bus.subscribe();
        let listener = rt.spawn(listen(rx, subs, Arc::clone(&tally), stop.clone()));
        Self {
            cfg,
            hooks,
            broker,
            bus,
            tally,
            stop,
            listener,
            rt,
        }
    }

    /// Runs a loop-only example with the suite's default config.
    pub fn run_loop<F>(&self, name: &str, body: F) -> Result<(), ExampleError>
    where
        F: FnOnce(&ExampleContext) -> anyhow::Result<()> + Send + 'static,
    {
        self.run_loop_with(self.cfg.example.clone(), name, body)
    }

    /// Runs a loop-only example with an explicit config.
    pub fn run_loop_with<F>(
        &self,
        config: ExampleConfig,
        name: &str,
        body: F,
    ) -> Result<(), ExampleError>
    where
        F: FnOnce(&ExampleContext) -> anyhow::Result<()> + Send + 'static,
    {
        EventedExample::loop_only(config, Arc::clone(&self.hooks), body)
            .named(name)
            .with_bus(self.bus.clone())
            .run()
    }

    /// Runs a broker-session example with the suite's default config.
    pub fn run_broker<F>(&self, name: &str, body: F) -> Result<(), ExampleError>
    where
        F: FnOnce(&ExampleContext) -> anyhow::Result<()> + Send + 'static,
    {
        self.run_broker_with(self.cfg.example.clone(), name, body)
    }

    /// Runs a broker-session example with an explicit config.
    pub fn run_broker_with<F>(
        &self,
        config: ExampleConfig,
        name: &str,
        body: F,
    ) -> Result<(), ExampleError>
    where
        F: FnOnce(&ExampleContext) -> anyhow::Result<()> + Send + 'static,
    {
        let hooks = Arc::clone(&self.hooks);
        EventedExample::broker_session(config, hooks, Arc::clone(&self.broker), body)
            .named(name)
            .with_bus(self.bus.clone())
            .run()
    }

    /// Suite configuration.
    pub fn config(&self) -> &HarnessConfig {
        &self.cfg
    }

    /// Shared hook registry.
    pub fn hooks(&self) -> &Arc<HookRegistry> {
        &self.hooks
    }

    /// Shared broker.
    pub fn broker(&self) -> &Arc<dyn Broker> {
        &self.broker
    }

    /// Event bus; subscribe here for ad-hoc observation.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Verdict ledger, updated by the listener.
    pub fn tally(&self) -> Arc<Tally> {
        Arc::clone(&self.tally)
    }

    /// Delivers every event published so far, then waits for subscribers to drain.
    ///
    /// Must be called outside of an async runtime.
    pub fn shutdown(self) -> Result<(), HarnessError> {
        let grace = self.cfg.grace;
        self.stop.cancel();

        let listener = self.listener;
        let stuck = self.rt.block_on(async move {
            match listener.await {
                Ok(subs) => subs.shutdown(grace).await,
                Err(err) => {
                    tracing::error!(error = %err, "event listener failed; subscribers not drained");
                    Vec::new()
                }
            }
        });
        self.rt.shutdown_background();

        if stuck.is_empty() {
            Ok(())
        } else {
            tracing::warn!(?grace, ?stuck, "subscribers did not drain in time");
            Err(HarnessError::GraceExceeded { grace, stuck })
        }
    }
}

impl std::fmt::Debug for Harness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harness")
            .field("cfg", &self.cfg)
            .field("broker", &self.broker.name())
            .finish()
    }
}

/// Forwards bus events to the tally and the subscribers until stopped.
///
/// On stop, events already buffered on the bus are still delivered.
async fn listen(
    mut rx: Receiver<Event>,
    subs: SubscriberSet,
    tally: Arc<Tally>,
    stop: CancellationToken,
) -> SubscriberSet {
    let deliver = |ev: &Event| {
        tally.update(ev);
        subs.emit(ev);
    };

    loop {
        tokio::select! {
            biased;
            res = rx.recv() => match res {
                Ok(ev) => deliver(&ev),
                Err(RecvError::Lagged(n)) => tracing::warn!(skipped = n, "event listener lagged"),
                Err(RecvError::Closed) => break,
            },
            _ = stop.cancelled() => break,
        }
    }

    loop {
        match rx.try_recv() {
            Ok(ev) => deliver(&ev),
            Err(TryRecvError::Lagged(n)) => tracing::warn!(skipped = n, "event listener lagged"),
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    subs
}
