//! # Event bus for broadcasting example lifecycle events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`]. Publishing is
//! synchronous and never blocks, so the controller can publish from inside
//! loop callbacks without awaiting anything.
//!
//! ## Architecture
//! ```text
//! Publishers (loop thread):            Listeners:
//!   ExampleContext ──┐
//!   LoopOnly       ──┼──► Bus ──┬──► Harness listener ──► SubscriberSet
//!   BrokerSession  ──┘          └──► ad-hoc receivers (tests, tools)
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` calls `broadcast::Sender::send` and returns.
//! - **Bounded capacity**: one ring buffer stores recent events for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no receivers at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for example events.
///
/// ### Properties
/// - **Non-blocking**: `publish()` returns immediately.
/// - **Fire-and-forget**: no delivery or durability guarantees.
/// - **Cloneable**: cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers, the event is dropped.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of live receivers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[test]
    fn receivers_only_see_later_events() {
        let bus = Bus::new(8);
        bus.publish(Event::new(EventKind::ExampleStarting));

        let mut rx = bus.subscribe();
        assert_eq!(bus.receiver_count(), 1);
        bus.publish(Event::new(EventKind::ExamplePassed));

        let ev = rx.try_recv().unwrap();
        assert_eq!(ev.kind, EventKind::ExamplePassed);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let bus = Bus::new(0);
        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::LoopStopped));
        assert_eq!(rx.try_recv().unwrap().kind, EventKind::LoopStopped);
    }
}
