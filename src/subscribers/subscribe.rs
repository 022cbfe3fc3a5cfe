//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for observing example lifecycle events.
//! Each subscriber is driven by a dedicated worker task fed by a bounded queue
//! owned by the [`SubscriberSet`](crate::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow (I/O, report files); they never block the
//!   example loop nor other subscribers.
//! - Each subscriber **declares** its queue capacity via
//!   [`Subscribe::queue_capacity`]. On overflow the event is **dropped** for
//!   that subscriber and `SubscriberOverflow` is published.
//!
//! ## Example
//! ```rust
//! use evented_spec::{Event, EventKind, Subscribe};
//!
//! struct FailurePrinter;
//!
//! #[async_trait::async_trait]
//! impl Subscribe for FailurePrinter {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::ExampleFailed {
//!             eprintln!("FAILED {:?}: {:?}", ev.example, ev.reason);
//!         }
//!     }
//!     fn name(&self) -> &'static str { "failure-printer" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
///
/// Called from a subscriber-dedicated worker task on the harness runtime.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles a single event.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs and delivery events).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
