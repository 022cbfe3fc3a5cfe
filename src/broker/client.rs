//! # Broker contract.

use crate::config::BrokerConfig;
use crate::error::BrokerError;
use crate::reactor::LoopHandle;

/// Callback fired by a broker when a handshake completes.
pub type BrokerCallback = Box<dyn FnOnce() + Send + 'static>;

/// # Asynchronous broker client.
///
/// Handshakes complete via callbacks driven by the example's loop: the
/// implementation receives the [`LoopHandle`] and must invoke callbacks from
/// loop iterations, never from inside `connect`/`close` themselves.
///
/// ### Contract
/// - `connect` either fails fast with an error or starts a handshake; if the
///   handshake never succeeds, `on_open` is never called.
/// - `close` is only called while [`Broker::is_connected`] is true and
///   [`Broker::is_closing`] is false. `on_closed` fires **before** the session
///   is marked closed at the protocol level.
/// - `reset_state` drops any client state (pending handshakes included) and
///   must be idempotent.
pub trait Broker: Send + Sync + 'static {
    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Starts opening a session with `config`.
    fn connect(
        &self,
        reactor: &LoopHandle,
        config: &BrokerConfig,
        on_open: BrokerCallback,
    ) -> Result<(), BrokerError>;

    /// True while a session is established (including while it is closing).
    fn is_connected(&self) -> bool;

    /// True while a close handshake is in flight.
    fn is_closing(&self) -> bool;

    /// Starts the close handshake.
    fn close(&self, reactor: &LoopHandle, on_closed: BrokerCallback);

    /// Drops all client state.
    fn reset_state(&self) -> Result<(), BrokerError>;
}
