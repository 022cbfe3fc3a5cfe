//! Example events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted by evented examples.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `ExampleContext` (hooks, timeout, done, loop stop, verdict),
//!   `BrokerSession` (session handshake, state reset), `SubscriberSet` workers.
//! - **Consumers**: the `Harness` listener (fans out to `SubscriberSet`), and any
//!   receiver obtained with [`Bus::subscribe`].

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
