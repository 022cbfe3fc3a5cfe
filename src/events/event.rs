//! # Runtime events emitted by evented examples.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Example events**: example start and terminal verdict (passed, failed)
//! - **Loop events**: hooks, timeout arming/firing, `done`, loop stop
//! - **Session events**: broker session handshake and state cleanup
//! - **Delivery events**: subscriber overflow and panics
//!
//! The [`Event`] struct carries additional metadata such as timestamps,
//! example name, hook phase, reasons, and durations.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use evented_spec::{Event, EventKind, HookPhase};
//!
//! let ev = Event::new(EventKind::HooksRan)
//!     .with_example("publishes-a-message")
//!     .with_phase(HookPhase::AfterLoop)
//!     .with_timeout(Duration::from_millis(500));
//!
//! assert_eq!(ev.kind, EventKind::HooksRan);
//! assert_eq!(ev.example.as_deref(), Some("publishes-a-message"));
//! assert_eq!(ev.phase, Some(HookPhase::AfterLoop));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::hooks::HookPhase;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Example events ===
    /// Example run is starting (loop about to start).
    ///
    /// Sets:
    /// - `example`: example name
    ExampleStarting,

    /// Example finished without a captured failure.
    ///
    /// Sets:
    /// - `example`: example name
    ExamplePassed,

    /// Example finished with a captured failure.
    ///
    /// Sets:
    /// - `example`: example name
    /// - `reason`: failure message
    /// - `label`: failure label (`ExampleError::as_label`)
    ExampleFailed,

    /// A secondary failure was dropped because an earlier one was already captured.
    ///
    /// Sets:
    /// - `example`: example name
    /// - `reason`: dropped failure message
    /// - `label`: dropped failure label
    FailureSuppressed,

    // === Loop events ===
    /// All hooks of a phase completed.
    ///
    /// Sets:
    /// - `example`: example name
    /// - `phase`: hook phase
    HooksRan,

    /// A hook failed.
    ///
    /// Sets:
    /// - `example`: example name
    /// - `phase`: hook phase
    /// - `reason`: failure message
    HookFailed,

    /// Spec timeout armed (possibly replacing a previous timer).
    ///
    /// Sets:
    /// - `example`: example name
    /// - `timeout_ms`: armed timeout (ms)
    TimeoutArmed,

    /// Armed example timeout cancelled (re-armed or loop finished first).
    ///
    /// Sets:
    /// - `example`: example name
    TimeoutCancelled,

    /// Spec timeout fired before `done`.
    ///
    /// Sets:
    /// - `example`: example name
    /// - `timeout_ms`: elapsed timeout (ms)
    TimeoutHit,

    /// `done` was accepted and the shutdown sequence started.
    ///
    /// Sets:
    /// - `example`: example name
    /// - `delay_ms`: requested delay (ms), if any
    /// - `reason`: `"forced"` when completed by the timeout watchdog
    DoneRequested,

    /// The loop was asked to stop after `after-loop` hooks ran.
    ///
    /// Sets:
    /// - `example`: example name
    LoopStopped,

    // === Session events ===
    /// Broker session connect attempt started.
    ///
    /// Sets:
    /// - `example`: example name
    /// - `reason`: broker endpoint
    SessionOpening,

    /// Broker session opened.
    ///
    /// Sets:
    /// - `example`: example name
    SessionOpened,

    /// Broker session close requested.
    ///
    /// Sets:
    /// - `example`: example name
    SessionCloseRequested,

    /// Broker acknowledged the close handshake.
    ///
    /// Sets:
    /// - `example`: example name
    SessionClosed,

    /// Broker client state was reset.
    ///
    /// Sets:
    /// - `example`: example name
    BrokerStateReset,

    // === Delivery events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `example`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `example`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the example (or subscriber for delivery events).
    pub example: Option<Arc<str>>,
    /// Hook phase, for hook events.
    pub phase: Option<HookPhase>,
    /// Timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Requested `done` delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, endpoints, overflow details).
    pub reason: Option<Arc<str>>,
    /// Stable failure label.
    pub label: Option<&'static str>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            example: None,
            phase: None,
            timeout_ms: None,
            delay_ms: None,
            reason: None,
            label: None,
        }
    }

    /// Attaches an example name.
    #[inline]
    pub fn with_example(mut self, example: impl Into<Arc<str>>) -> Self {
        self.example = Some(example.into());
        self
    }

    /// Attaches a hook phase.
    #[inline]
    pub fn with_phase(mut self, phase: HookPhase) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a stable failure label.
    #[inline]
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(compact_ms(d));
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_example(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_example(subscriber)
            .with_reason(info)
    }

    /// True for events describing a terminal verdict.
    #[inline]
    pub fn is_verdict(&self) -> bool {
        matches!(self.kind, EventKind::ExamplePassed | EventKind::ExampleFailed)
    }

    /// True for subscriber delivery events.
    #[inline]
    pub fn is_delivery(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

fn compact_ms(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}
