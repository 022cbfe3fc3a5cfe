//! # Single-threaded callback reactor (the timer service).
//!
//! The reactor is the event loop an evented example runs in. It drives one
//! callback at a time to completion on the calling thread, on top of a
//! current-thread tokio runtime.
//!
//! ## Contents
//! - [`Reactor`] owns the loop; [`Reactor::run`] blocks until the loop is stopped
//! - [`LoopHandle`] cloneable handle used by callbacks to schedule more work
//! - [`TimerId`] handle of a single-shot timer, used for cancellation
//!
//! ## Iteration model
//! ```text
//! Reactor::run(start)
//!   └─► ticks = [start]
//!
//! loop {
//!   ├─► stop requested?            ─► exit Ok
//!   ├─► batch = due timers (deadline order) ++ all queued ticks
//!   ├─► batch empty?               ─► wait: stop | new work | next deadline
//!   └─► run batch callbacks one by one
//!         ├─ callback panics       ─► exit Err(ReactorError::Panicked)
//!         └─ stop requested        ─► drop rest of batch, exit Ok
//! }
//! ```
//!
//! ## Rules
//! - `defer` during an iteration lands in the **next** iteration, never the current one
//! - Callbacks scheduled after the loop stopped are dropped, not run
//! - Pending timers and ticks are dropped when the loop exits
//! - `stop` only has an effect while the loop is running

mod core;
mod handle;

pub use core::Reactor;
pub use handle::{LoopHandle, TimerId};
