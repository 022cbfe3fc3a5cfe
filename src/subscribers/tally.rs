//! # Tally: per-example verdict ledger.
//!
//! Maintains the verdict of every example seen on the bus, using event
//! sequence numbers to handle out-of-order delivery. The outer test runner
//! reads it after [`Harness::shutdown`](crate::Harness::shutdown) to report
//! totals. The harness feeds its own ledger directly; an extra `Tally` can
//! also be registered as a [`Subscribe`]r, e.g. to count a subset of runs.
//!
//! ## Architecture
//! ```text
//! EventedExample ──► Bus ──► harness listener ──► Tally::update()
//!                                                      │
//!                                                      ▼
//!                                     HashMap<String, Entry>
//!                                     (name → {seq, verdict})
//! ```
//!
//! ## Rules
//! - Only `ExampleStarting` / `ExamplePassed` / `ExampleFailed` change verdicts
//! - Other events of an example **update seq** only
//! - Events with `seq <= last_seq` are **rejected** (stale)

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Verdict of one example.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Started, no verdict yet.
    Running,
    /// Finished without failure.
    Passed,
    /// Finished with a failure.
    Failed {
        /// Stable failure label.
        label: &'static str,
        /// Failure message.
        message: String,
    },
}

/// Totals over every example seen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TallySummary {
    /// Examples that passed.
    pub passed: usize,
    /// Examples that failed.
    pub failed: usize,
    /// Examples without a verdict.
    pub running: usize,
}

#[derive(Debug)]
struct Entry {
    last_seq: Option<u64>,
    verdict: Verdict,
}

/// Thread-safe verdict ledger.
#[derive(Debug, Default)]
pub struct Tally {
    state: RwLock<HashMap<String, Entry>>,
}

impl Tally {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `ev` if it is newer than the last event seen for its example.
    ///
    /// Returns true when the verdict changed.
    ///
    /// ```text
    /// update(ExamplePassed,   seq=100) → Passed, last_seq=100
    /// update(ExampleStarting, seq=99)  → rejected (stale)
    /// ```
    pub fn update(&self, ev: &Event) -> bool {
        if ev.is_delivery() {
            return false;
        }
        let Some(name) = ev.example.as_deref() else {
            return false;
        };

        let mut state = self.state.write();
        let entry = state.entry(name.to_string()).or_insert(Entry {
            last_seq: None,
            verdict: Verdict::Running,
        });
        if entry.last_seq.is_some_and(|last| ev.seq <= last) {
            return false;
        }
        entry.last_seq = Some(ev.seq);

        let next = match ev.kind {
            EventKind::ExampleStarting => Verdict::Running,
            EventKind::ExamplePassed => Verdict::Passed,
            EventKind::ExampleFailed => Verdict::Failed {
                label: ev.label.unwrap_or("example_failed"),
                message: ev.reason.as_deref().unwrap_or_default().to_string(),
            },
            _ => return false,
        };
        entry.verdict = next;
        true
    }

    /// Verdict of `example`, if seen.
    pub fn verdict(&self, example: &str) -> Option<Verdict> {
        self.state.read().get(example).map(|e| e.verdict.clone())
    }

    /// Sorted names of passed examples.
    pub fn passed(&self) -> Vec<String> {
        self.names(|v| matches!(v, Verdict::Passed))
    }

    /// Sorted names of failed examples.
    pub fn failed(&self) -> Vec<String> {
        self.names(|v| matches!(v, Verdict::Failed { .. }))
    }

    /// Totals by verdict.
    pub fn summary(&self) -> TallySummary {
        let state = self.state.read();
        state
            .values()
            .fold(TallySummary::default(), |mut acc, e| {
                match e.verdict {
                    Verdict::Running => acc.running += 1,
                    Verdict::Passed => acc.passed += 1,
                    Verdict::Failed { .. } => acc.failed += 1,
                }
                acc
            })
    }

    fn names(&self, pred: impl Fn(&Verdict) -> bool) -> Vec<String> {
        let state = self.state.read();
        let mut out: Vec<String> = state
            .iter()
            .filter(|(_, e)| pred(&e.verdict))
            .map(|(name, _)| name.clone())
            .collect();
        out.sort_unstable();
        out
    }
}

#[async_trait]
impl Subscribe for Tally {
    async fn on_event(&self, ev: &Event) {
        self.update(ev);
    }

    fn name(&self) -> &'static str {
        "Tally"
    }

    fn queue_capacity(&self) -> usize {
        2048
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(kind: EventKind, example: &str) -> Event {
        Event::new(kind).with_example(example)
    }

    #[test]
    fn verdicts_follow_lifecycle() {
        let tally = Tally::new();
        assert!(tally.update(&ev(EventKind::ExampleStarting, "a")));
        assert!(tally.update(&ev(EventKind::ExampleStarting, "b")));
        assert!(!tally.update(&ev(EventKind::LoopStopped, "a")));
        assert!(tally.update(&ev(EventKind::ExamplePassed, "a")));
        assert!(tally.update(
            &ev(EventKind::ExampleFailed, "b")
                .with_label("example_timeout")
                .with_reason("timeout: 500ms")
        ));

        assert_eq!(tally.passed(), vec!["a".to_string()]);
        assert_eq!(tally.failed(), vec!["b".to_string()]);
        assert_eq!(
            tally.verdict("b"),
            Some(Verdict::Failed {
                label: "example_timeout",
                message: "timeout: 500ms".to_string()
            })
        );
        assert_eq!(
            tally.summary(),
            TallySummary {
                passed: 1,
                failed: 1,
                running: 0
            }
        );
    }

    #[test]
    fn stale_events_are_rejected() {
        let tally = Tally::new();
        let start = ev(EventKind::ExampleStarting, "a");
        let passed = ev(EventKind::ExamplePassed, "a");

        assert!(tally.update(&passed));
        assert!(!tally.update(&start));
        assert!(!tally.update(&passed));
        assert_eq!(tally.verdict("a"), Some(Verdict::Passed));
    }

    #[tokio::test]
    async fn works_as_a_regular_subscriber() {
        use std::sync::Arc;
        use std::time::Duration;

        use crate::events::Bus;
        use crate::subscribers::SubscriberSet;

        let tally = Arc::new(Tally::new());
        let subs: Vec<Arc<dyn Subscribe>> = vec![tally.clone()];
        let set = SubscriberSet::new(subs, Bus::new(8), &tokio::runtime::Handle::current());

        set.emit(&ev(EventKind::ExampleStarting, "a"));
        set.emit(&ev(EventKind::ExamplePassed, "a"));
        set.emit(&ev(EventKind::ExampleStarting, "b"));
        assert!(set.shutdown(Duration::from_secs(1)).await.is_empty());

        assert_eq!(tally.verdict("a"), Some(Verdict::Passed));
        assert_eq!(tally.verdict("b"), Some(Verdict::Running));
        assert_eq!(tally.summary().running, 1);
    }

    #[test]
    fn delivery_events_are_ignored() {
        let tally = Tally::new();
        assert!(!tally.update(&Event::subscriber_overflow("LogWriter", "full")));
        assert_eq!(tally.summary(), TallySummary::default());
    }
}
