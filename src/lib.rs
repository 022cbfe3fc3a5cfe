//! # evented-spec
//!
//! **evented-spec** runs event-loop driven test examples under a synchronous
//! contract: the caller invokes `run()` and gets back either success or the
//! first failure that happened inside the loop, after the loop has been torn
//! down and any broker state has been cleaned.
//!
//! Each example runs inside its own single-threaded [`Reactor`], wrapped in
//! lifecycle hooks, guarded by an optional example timeout, and only finishes
//! once the body signals completion with [`ExampleContext::done`].
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!   │   Harness    │   │ HookRegistry │   │    Broker    │
//!   │ (per suite)  │──►│ (per suite)  │   │ (per suite)  │
//!   └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!          ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  EventedExample (per example)                                     │
//! │  - Reactor (current-thread loop: timers, next-iteration ticks)    │
//! │  - ExampleContext (captured failure, example timer, completion)      │
//! │  - ShutdownStrategy: LoopOnly | BrokerSession                     │
//! └──────────────────────────────┬────────────────────────────────────┘
//!                                │ publishes lifecycle events
//!                                ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! └──────────────────────────────┬────────────────────────────────────┘
//!                                ▼
//!                    ┌────────────────────────┐
//!                    │   harness listener     │
//!                    └───┬────────────────┬───┘
//!                        ▼                ▼
//!                      Tally        SubscriberSet
//!                   (verdicts)     (per-sub queues)
//! ```
//!
//! ### Lifecycle
//! ```text
//! run()
//!   ├─► before-loop hooks ─► arm example timer ─► launch body
//!   │        (broker: open session ─► broker-before hooks ─► body)
//!   │
//!   ├─► body / timer calls done
//!   │        ├─ loop-only: next iteration ─► finish_loop
//!   │        └─ broker:    next iteration ─► broker-after hooks
//!   │                        ├─ connected, not timed out ─► close ─► ack ─► next iteration ─► finish_loop
//!   │                        └─ otherwise                ─► reset broker state ─► next iteration ─► finish_loop
//!   │
//!   ├─► finish_loop: cancel timer ─► after-loop hooks ─► stop loop
//!   └─► finish_example: reset broker state (once) ─► return first captured failure
//! ```
//!
//! ## Features
//! | Area              | Description                                                    | Key types / traits                                  |
//! |-------------------|----------------------------------------------------------------|-----------------------------------------------------|
//! | **Examples**      | Run a body inside a loop, with timeout and completion signal.  | [`EventedExample`], [`ExampleContext`]              |
//! | **Variants**      | Pluggable shutdown behaviour.                                  | [`ShutdownStrategy`], [`LoopOnly`], [`BrokerSession`] |
//! | **Hooks**         | Callbacks bound to lifecycle phases.                           | [`HookRegistry`], [`HookPhase`], [`Hook`]           |
//! | **Loop**          | Single-threaded timers and next-iteration deferral.            | [`Reactor`], [`LoopHandle`]                         |
//! | **Broker**        | Session collaborator contract and in-memory implementation.    | [`Broker`], [`LoopbackBroker`]                      |
//! | **Subscriber API**| Observe lifecycle events (logging, reporting).                 | [`Subscribe`], [`Tally`]                            |
//! | **Suite**         | Shared hooks, broker and subscribers for many examples.        | [`Harness`], [`HarnessBuilder`]                     |
//! | **Errors**        | Typed errors for examples, the loop, brokers and the harness.  | [`ExampleError`], [`ReactorError`]                  |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use evented_spec::{ExampleContext, ExampleError, HarnessBuilder, HarnessConfig, HookPhase, HookRegistry};
//!
//! let hooks = HookRegistry::new()
//!     .with(HookPhase::BeforeLoop, "fixtures", |_ctx: &ExampleContext| Ok(()));
//!
//! let mut cfg = HarnessConfig::default();
//! cfg.example.spec_timeout = Some(Duration::from_millis(200));
//!
//! let harness = HarnessBuilder::new(cfg).with_hooks(hooks).build()?;
//!
//! // Completes after 10ms.
//! harness.run_loop("completes", |ctx| {
//!     ctx.done_after(Duration::from_millis(10));
//!     Ok(())
//! })?;
//!
//! // Never calls done: fails with a timeout after 200ms.
//! let err = harness.run_loop("hangs", |_ctx| Ok(())).unwrap_err();
//! assert!(matches!(err, ExampleError::Timeout { .. }));
//!
//! harness.shutdown()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod broker;
mod config;
mod error;
mod events;
mod example;
mod harness;
mod hooks;
mod reactor;
mod subscribers;

// ---- Public re-exports ----

pub use broker::{Broker, BrokerCallback, CloseMode, ConnectMode, LoopbackBroker, LoopbackStats};
pub use config::{BrokerConfig, ExampleConfig, HarnessConfig};
pub use error::{BrokerError, ExampleError, HarnessError, PanicPayload, ReactorError};
pub use events::{Bus, Event, EventKind};
pub use example::{
    Body, BrokerSession, EventedExample, ExampleContext, FinishFn, LoopOnly, SessionState,
    ShutdownStrategy,
};
pub use harness::{Harness, HarnessBuilder};
pub use hooks::{Hook, HookPhase, HookRegistry};
pub use reactor::{LoopHandle, Reactor, TimerId};
pub use subscribers::{Subscribe, SubscriberSet, Tally, TallySummary, Verdict};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
