//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for demos or when debugging a hanging example.
//!
//! ## Example output
//! ```text
//! [starting] example="publishes"
//! [hooks-ran] example="publishes" phase=before-loop
//! [timeout-armed] example="publishes" timeout_ms=500
//! [session-opening] example="publishes" endpoint="127.0.0.1:5672/"
//! [done] example="publishes" delay_ms=None forced=false
//! [session-closed] example="publishes"
//! [loop-stopped] example="publishes"
//! [passed] example="publishes"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let ex = e.example.as_deref().unwrap_or("?");
        match e.kind {
            EventKind::ExampleStarting => println!("[starting] example={ex:?}"),
            EventKind::ExamplePassed => println!("[passed] example={ex:?}"),
            EventKind::ExampleFailed => println!(
                "[failed] example={ex:?} label={:?} err={:?}",
                e.label, e.reason
            ),
            EventKind::FailureSuppressed => println!(
                "[failure-suppressed] example={ex:?} label={:?} err={:?}",
                e.label, e.reason
            ),
            EventKind::HooksRan => {
                let phase = e.phase.map(|p| p.as_str()).unwrap_or("?");
                println!("[hooks-ran] example={ex:?} phase={phase}");
            }
            EventKind::HookFailed => {
                let phase = e.phase.map(|p| p.as_str()).unwrap_or("?");
                println!("[hook-failed] example={ex:?} phase={phase} err={:?}", e.reason);
            }
            EventKind::TimeoutArmed => {
                println!("[timeout-armed] example={ex:?} timeout_ms={:?}", e.timeout_ms)
            }
            EventKind::TimeoutCancelled => println!("[timeout-cancelled] example={ex:?}"),
            EventKind::TimeoutHit => {
                println!("[timeout] example={ex:?} timeout_ms={:?}", e.timeout_ms)
            }
            EventKind::DoneRequested => println!(
                "[done] example={ex:?} delay_ms={:?} forced={}",
                e.delay_ms,
                e.reason.is_some()
            ),
            EventKind::LoopStopped => println!("[loop-stopped] example={ex:?}"),
            EventKind::SessionOpening => {
                println!("[session-opening] example={ex:?} endpoint={:?}", e.reason)
            }
            EventKind::SessionOpened => println!("[session-opened] example={ex:?}"),
            EventKind::SessionCloseRequested => println!("[session-closing] example={ex:?}"),
            EventKind::SessionClosed => println!("[session-closed] example={ex:?}"),
            EventKind::BrokerStateReset => println!("[broker-reset] example={ex:?}"),
            EventKind::SubscriberOverflow => {
                println!("[subscriber-overflow] subscriber={ex} reason={:?}", e.reason)
            }
            EventKind::SubscriberPanicked => println!(
                "[subscriber-panicked] subscriber={ex} info={}",
                e.reason.as_deref().unwrap_or("unknown"),
            ),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
