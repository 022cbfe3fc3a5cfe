//! # SubscriberSet: non-blocking fan-out over multiple subscribers
//!
//! [`SubscriberSet`] distributes each [`Event`] to multiple subscribers
//! **without awaiting** their processing.
//!
//! ## What it guarantees
//! - `emit(&Event)` returns immediately.
//! - Per-subscriber FIFO (queue order).
//! - Panics inside subscribers are caught and published as `SubscriberPanicked`.
//!
//! ## What it does **not** guarantee
//! - No global ordering across different subscribers.
//! - No retries on per-subscriber queue overflow (events are dropped for that
//!   subscriber and `SubscriberOverflow` is published).
//!
//! ## Diagram
//! ```text
//!    emit(&Event)
//!        │                        (Arc-clone per subscriber)
//!        ├────────────────► [queue S1] ─► worker S1 ─► on_event()
//!        ├────────────────► [queue S2] ─► worker S2 ─► on_event()
//!        └────────────────► [queue SN] ─► worker SN ─► on_event()
//!
//!    shutdown(grace) ─► close queues ─► join workers until grace ─► stuck names
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::error::PanicPayload;
use crate::events::{Bus, Event, EventKind};

use super::Subscribe;

/// Per-subscriber channel with metadata
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Composite fan-out with per-subscriber bounded queues and worker tasks.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<(&'static str, JoinHandle<()>)>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker per subscriber on `rt`.
    ///
    /// Each subscriber gets a bounded queue of size `max(queue_capacity, 1)`.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus, rt: &Handle) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);
            let bus_for_worker = bus.clone();

            let handle = rt.spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        let info = PanicPayload::new(panic_err).message();
                        tracing::error!(subscriber = sub.name(), %info, "subscriber panicked");
                        bus_for_worker.publish(Event::subscriber_panicked(sub.name(), info));
                    }
                }
            });

            channels.push(SubscriberChannel { name, sender: tx });
            workers.push((name, handle));
        }

        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Fan-out one event to all subscribers (non-blocking).
    ///
    /// If a subscriber's queue is **full** or **closed**, the event is dropped for it
    /// and a `SubscriberOverflow` event is published.
    pub fn emit(&self, event: &Event) {
        // no overflow-on-overflow
        let is_overflow_evt = matches!(event.kind, EventKind::SubscriberOverflow);

        let ev = Arc::new(event.clone());
        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&ev)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            tracing::warn!(subscriber = channel.name, reason, seq = event.seq, "event dropped");
            if !is_overflow_evt {
                self.bus.publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Closes all queues and waits for the workers to drain them.
    ///
    /// Returns the names of subscribers whose workers did not finish within `grace`;
    /// those workers are aborted.
    pub async fn shutdown(self, grace: Duration) -> Vec<String> {
        drop(self.channels);

        let deadline = tokio::time::Instant::now() + grace;
        let mut stuck = Vec::new();
        for (name, mut handle) in self.workers {
            if tokio::time::timeout_at(deadline, &mut handle).await.is_err() {
                handle.abort();
                stuck.push(name.to_string());
            }
        }
        stuck
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct Collect(Mutex<Vec<EventKind>>);

    #[async_trait]
    impl Subscribe for Collect {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().push(ev.kind);
        }
        fn name(&self) -> &'static str {
            "collect"
        }
    }

    struct Panicky;

    #[async_trait]
    impl Subscribe for Panicky {
        async fn on_event(&self, _ev: &Event) {
            panic!("subscriber blew up");
        }
        fn name(&self) -> &'static str {
            "panicky"
        }
    }

    struct Sleepy;

    #[async_trait]
    impl Subscribe for Sleepy {
        async fn on_event(&self, _ev: &Event) {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        fn name(&self) -> &'static str {
            "sleepy"
        }
    }

    #[tokio::test]
    async fn delivers_in_order_and_drains_on_shutdown() {
        let collect = Arc::new(Collect(Mutex::new(Vec::new())));
        let subs: Vec<Arc<dyn Subscribe>> = vec![collect.clone()];
        let set = SubscriberSet::new(subs, Bus::new(16), &Handle::current());

        set.emit(&Event::new(EventKind::ExampleStarting));
        set.emit(&Event::new(EventKind::LoopStopped));
        set.emit(&Event::new(EventKind::ExamplePassed));

        assert!(set.shutdown(Duration::from_secs(1)).await.is_empty());
        assert_eq!(
            *collect.0.lock(),
            vec![EventKind::ExampleStarting, EventKind::LoopStopped, EventKind::ExamplePassed]
        );
    }

    #[tokio::test]
    async fn panics_are_isolated_and_published() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Panicky)];
        let set = SubscriberSet::new(subs, bus, &Handle::current());

        set.emit(&Event::new(EventKind::ExampleStarting));
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.reason.as_deref(), Some("subscriber blew up"));
        assert!(set.shutdown(Duration::from_secs(1)).await.is_empty());
    }

    #[tokio::test]
    async fn slow_worker_is_reported_stuck() {
        let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Sleepy)];
        let set = SubscriberSet::new(subs, Bus::new(4), &Handle::current());
        set.emit(&Event::new(EventKind::ExampleStarting));
        tokio::task::yield_now().await;

        let stuck = set.shutdown(Duration::from_millis(20)).await;
        assert_eq!(stuck, vec!["sleepy".to_string()]);
    }
}
