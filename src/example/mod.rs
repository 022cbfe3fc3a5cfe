//! # Evented example controller.
//!
//! Runs one test body inside a single-threaded [`Reactor`](crate::Reactor),
//! wrapped in lifecycle hooks, guarded by an optional example timeout, and torn
//! down only after the body signals completion with `done`.
//!
//! - [`EventedExample`] the runner-facing entry point (`loop_only`, `broker_session`, `run`)
//! - [`ExampleContext`] handle passed to bodies and hooks (`done`, `timeout`, `reactor`)
//! - [`ShutdownStrategy`] pluggable variant behaviour (`launch`, `on_done`, `on_finish_example`)
//! - [`LoopOnly`] plain loop variant
//! - [`BrokerSession`] broker variant, with its explicit [`SessionState`] machine
//!
//! ## Lifecycle
//! ```text
//! run()
//!  ├─ publish ExampleStarting
//!  ├─ Reactor::run(enter_loop)
//!  │    ├─ before-loop hooks          (failure: captured, finish_loop)
//!  │    ├─ clear captured failure
//!  │    ├─ timeout(spec_timeout)      (if configured)
//!  │    └─ strategy.launch(body)      (failure: captured, done)
//!  │
//!  │   done ─► finish block ─► strategy.on_done ─► ... ─► finish_loop
//!  │                                                   ├─ cancel timer
//!  │                                                   ├─ after-loop hooks
//!  │                                                   └─ stop loop
//!  ├─ loop error?  captured, finish_loop (after-loop hooks still run once)
//!  └─ finish_example
//!       ├─ strategy.on_finish_example (broker state cleanup)
//!       └─ return captured failure (ExamplePassed / ExampleFailed)
//! ```
//!
//! ## Rules
//! - Exactly one captured failure; the **first** writer wins, later ones are
//!   logged and published as `FailureSuppressed`
//! - `done` is accepted once; later calls are no-ops, except the forced
//!   completion issued by the example timer
//! - At most one example timer is armed at any time

mod broker_session;
mod context;
mod controller;
mod loop_only;
mod session;
mod strategy;

pub use broker_session::BrokerSession;
pub use context::{ExampleContext, FinishFn};
pub use controller::{Body, EventedExample};
pub use loop_only::LoopOnly;
pub use session::SessionState;
pub use strategy::ShutdownStrategy;
