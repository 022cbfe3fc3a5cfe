//! # Broker collaborator.
//!
//! The broker variant of an evented example opens a session against a
//! message-broker-like service before the body runs and closes it before the
//! loop may stop. The wire protocol is out of scope: this module only defines
//! the contract the controller consumes and an in-memory implementation.
//!
//! ## Contents
//! - [`Broker`] the collaborator contract (connect/close handshakes, state reset)
//! - [`LoopbackBroker`] in-memory broker completing handshakes through the loop
//! - [`LoopbackStats`] counters exposed by the loopback broker
//!
//! ## Handshakes
//! ```text
//! connect(reactor, cfg, on_open) ──► ... loop iterations ... ──► on_open()
//! close(reactor, on_closed)      ──► ... loop iterations ... ──► on_closed() ──► marked closed
//! reset_state()                  ──► client state dropped (idempotent)
//! ```
//!
//! The broker's client state is process-wide in spirit: one broker instance is
//! shared by every example of a suite, and it must be reset after each run.

mod client;
mod loopback;

pub use client::{Broker, BrokerCallback};
pub use loopback::{CloseMode, ConnectMode, LoopbackBroker, LoopbackStats};
