use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::broker::{Broker, LoopbackBroker};
use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::events::Bus;
use crate::hooks::HookRegistry;
use crate::subscribers::{Subscribe, SubscriberSet, Tally};

use super::runner::Harness;

/// Builder for constructing a [`Harness`].
pub struct HarnessBuilder {
    cfg: HarnessConfig,
    hooks: HookRegistry,
    subscribers: Vec<Arc<dyn Subscribe>>,
    broker: Option<Arc<dyn Broker>>,
}

impl HarnessBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: HarnessConfig) -> Self {
        Self {
            cfg,
            hooks: HookRegistry::new(),
            subscribers: Vec::new(),
            broker: None,
        }
    }

    /// Sets the hooks shared by every example of the suite.
    pub fn with_hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive lifecycle events through dedicated workers with
    /// bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Sets the broker used by broker-session examples.
    ///
    /// Defaults to a [`LoopbackBroker`].
    pub fn with_broker(mut self, broker: Arc<dyn Broker>) -> Self {
        self.broker = Some(broker);
        self
    }

    /// Builds the harness and starts event delivery.
    pub fn build(self) -> Result<Harness, HarnessError> {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("evented-spec-events")
            .enable_time()
            .build()
            .map_err(|source| HarnessError::Runtime { source })?;

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone(), rt.handle());
        let tally = Arc::new(Tally::new());
        let stop = CancellationToken::new();
        let broker = self
            .broker
            .unwrap_or_else(|| Arc::new(LoopbackBroker::new()));

        Ok(Harness::new_internal(
            self.cfg,
            Arc::new(self.hooks),
            broker,
            bus,
            subs,
            tally,
            stop,
            rt,
        ))
    }
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self::new(HarnessConfig::default())
    }
}
