//! # Suite-level harness.
//!
//! A [`Harness`] is built once per test suite and holds everything examples
//! share: the hook registry, default [`ExampleConfig`](crate::ExampleConfig),
//! the broker collaborator, the event bus and the subscribers.
//!
//! ## Architecture
//! ```text
//! HarnessBuilder::build()
//!   ├─ Bus (broadcast)
//!   ├─ background runtime (1 worker thread)
//!   │     └─ listener: Bus ─► Tally::update + SubscriberSet::emit ─► workers
//!   └─ Harness
//!        ├─ run_loop(name, body)        ─► EventedExample::loop_only(..).run()
//!        ├─ run_broker(name, body)      ─► EventedExample::broker_session(..).run()
//!        └─ shutdown()                  ─► drain listener, drain subscribers within grace
//! ```
//!
//! Examples run on the caller's thread; only event delivery uses the
//! background runtime.

mod builder;
mod runner;

pub use builder::HarnessBuilder;
pub use runner::Harness;
