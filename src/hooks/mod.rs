//! # Lifecycle hooks.
//!
//! This module provides the hook types the controller runs around the loop:
//! - [`HookPhase`] - the fixed set of lifecycle phases
//! - [`Hook`] - a named callback evaluated against the running [`ExampleContext`](crate::ExampleContext)
//! - [`HookRegistry`] - phase → ordered hooks, built once per suite
//!
//! ## Phases
//! ```text
//! loop start ─► before-loop ─► [broker open ─► broker-before] ─► body
//!                                                                  │
//!                                              done ─► [broker-after ─► broker close]
//!                                                                  │
//!                                                after-loop ◄──────┘ ─► loop stop
//! ```
//!
//! The registry is read-only during a run: the controller never mutates it,
//! and it is shared between examples behind an `Arc`.

mod hook;
mod phase;
mod registry;

pub use hook::Hook;
pub use phase::HookPhase;
pub use registry::HookRegistry;
