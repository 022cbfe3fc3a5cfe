//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the built-in subscribers:
//!
//! - [`Tally`]: per-example verdict ledger for the outer test runner
//! - [`LogWriter`]: prints events in a human-readable form (feature `logging`)
//!
//! ## Architecture
//! ```text
//! ExampleContext ── publish(Event) ──► Bus ──► harness listener
//!                                                 │
//!                                                 ├──► Tally::update()  (always on)
//!                                                 └──► SubscriberSet::emit()
//!                                                          ├──► [queue] ─► LogWriter
//!                                                          └──► [queue] ─► custom ...
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;
mod tally;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
pub use tally::{Tally, TallySummary, Verdict};
