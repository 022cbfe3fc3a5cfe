//! # LoopbackBroker: in-memory broker for tests and demos.
//!
//! Completes connect/close handshakes through loop timers after a configurable
//! latency, and can be told to misbehave the ways a real broker does:
//! refuse outright, never answer a connect, or never acknowledge a close.
//!
//! ## Link states
//! ```text
//! Disconnected ─connect─► Connecting ─(latency)─► Connected ─close─► Closing
//!       ▲                                                               │
//!       └──────────────── on_closed() then marked closed ◄──(latency)───┘
//!
//! reset_state(): any ─► Disconnected (pending handshakes are invalidated)
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::BrokerConfig;
use crate::error::BrokerError;
use crate::reactor::LoopHandle;

use super::client::{Broker, BrokerCallback};

/// How the loopback broker answers `connect`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectMode {
    /// Open the session after the connect latency.
    #[default]
    Accept,
    /// Fail fast with [`BrokerError::Refused`].
    Refuse,
    /// Start the handshake but never call back.
    Silent,
}

/// How the loopback broker answers `close`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CloseMode {
    /// Acknowledge after the close latency.
    #[default]
    Acknowledge,
    /// Never acknowledge.
    Hang,
}

/// Counters of broker interactions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopbackStats {
    /// `connect` calls that started a handshake.
    pub connects: u32,
    /// Sessions that reached the connected state.
    pub opened: u32,
    /// `close` calls accepted.
    pub closes: u32,
    /// Close handshakes acknowledged.
    pub acks: u32,
    /// `reset_state` calls.
    pub resets: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Link {
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

struct LoopbackState {
    link: Link,
    /// Bumped by `reset_state`; stale handshake timers compare against it.
    generation: u64,
    stats: LoopbackStats,
}

/// In-memory [`Broker`].
///
/// Cloning shares the underlying client state, like a process-wide client.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use evented_spec::{CloseMode, LoopbackBroker};
///
/// let broker = LoopbackBroker::new()
///     .with_connect_latency(Duration::from_millis(5))
///     .with_close_mode(CloseMode::Hang);
/// assert_eq!(broker.stats().connects, 0);
/// ```
#[derive(Clone)]
pub struct LoopbackBroker {
    connect_latency: Duration,
    close_latency: Duration,
    connect_mode: ConnectMode,
    close_mode: CloseMode,
    fail_reset: bool,
    state: Arc<Mutex<LoopbackState>>,
}

impl Default for LoopbackBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackBroker {
    /// Creates a well-behaved broker with 1ms handshake latencies.
    pub fn new() -> Self {
        Self {
            connect_latency: Duration::from_millis(1),
            close_latency: Duration::from_millis(1),
            connect_mode: ConnectMode::Accept,
            close_mode: CloseMode::Acknowledge,
            fail_reset: false,
            state: Arc::new(Mutex::new(LoopbackState {
                link: Link::Disconnected,
                generation: 0,
                stats: LoopbackStats::default(),
            })),
        }
    }

    /// Sets the delay between `connect` and `on_open`.
    pub fn with_connect_latency(mut self, latency: Duration) -> Self {
        self.connect_latency = latency;
        self
    }

    /// Sets the delay between `close` and `on_closed`.
    pub fn with_close_latency(mut self, latency: Duration) -> Self {
        self.close_latency = latency;
        self
    }

    /// Sets how `connect` is answered.
    pub fn with_connect_mode(mut self, mode: ConnectMode) -> Self {
        self.connect_mode = mode;
        self
    }

    /// Sets how `close` is answered.
    pub fn with_close_mode(mut self, mode: CloseMode) -> Self {
        self.close_mode = mode;
        self
    }

    /// Makes `reset_state` report a failure (state is still dropped).
    pub fn with_failing_reset(mut self) -> Self {
        self.fail_reset = true;
        self
    }

    /// Snapshot of the interaction counters.
    pub fn stats(&self) -> LoopbackStats {
        self.state.lock().stats
    }

    /// True when no session exists and no handshake is pending.
    pub fn is_idle(&self) -> bool {
        self.state.lock().link == Link::Disconnected
    }
}

impl Broker for LoopbackBroker {
    fn name(&self) -> &'static str {
        "loopback"
    }

    fn connect(
        &self,
        reactor: &LoopHandle,
        config: &BrokerConfig,
        on_open: BrokerCallback,
    ) -> Result<(), BrokerError> {
        if self.connect_mode == ConnectMode::Refuse {
            return Err(BrokerError::Refused {
                endpoint: config.endpoint(),
            });
        }

        let generation = {
            let mut st = self.state.lock();
            st.link = Link::Connecting;
            st.stats.connects += 1;
            st.generation
        };
        if self.connect_mode == ConnectMode::Silent {
            return Ok(());
        }

        let state = Arc::clone(&self.state);
        reactor.schedule_once(self.connect_latency, move || {
            {
                let mut st = state.lock();
                if st.generation != generation || st.link != Link::Connecting {
                    return;
                }
                st.link = Link::Connected;
                st.stats.opened += 1;
            }
            on_open();
        });
        Ok(())
    }

    fn is_connected(&self) -> bool {
        matches!(self.state.lock().link, Link::Connected | Link::Closing)
    }

    fn is_closing(&self) -> bool {
        self.state.lock().link == Link::Closing
    }

    fn close(&self, reactor: &LoopHandle, on_closed: BrokerCallback) {
        let generation = {
            let mut st = self.state.lock();
            if st.link != Link::Connected {
                tracing::warn!(link = ?st.link, "close requested without an open session");
                return;
            }
            st.link = Link::Closing;
            st.stats.closes += 1;
            st.generation
        };
        if self.close_mode == CloseMode::Hang {
            return;
        }

        let state = Arc::clone(&self.state);
        reactor.schedule_once(self.close_latency, move || {
            {
                let mut st = state.lock();
                if st.generation != generation || st.link != Link::Closing {
                    return;
                }
                st.stats.acks += 1;
            }
            on_closed();
            let mut st = state.lock();
            if st.generation == generation && st.link == Link::Closing {
                st.link = Link::Disconnected;
            }
        });
    }

    fn reset_state(&self) -> Result<(), BrokerError> {
        {
            let mut st = self.state.lock();
            st.link = Link::Disconnected;
            st.generation += 1;
            st.stats.resets += 1;
        }
        if self.fail_reset {
            return Err(BrokerError::Reset {
                reason: "loopback configured to fail resets".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactor::Reactor;

    #[test]
    fn handshakes_complete_through_the_loop() {
        let broker = LoopbackBroker::new();
        let reactor = Reactor::new();
        let h = reactor.handle();
        let b = broker.clone();

        reactor
            .run(move || {
                let (h2, b2) = (h.clone(), b.clone());
                b.connect(
                    &h,
                    &BrokerConfig::default(),
                    Box::new(move || {
                        assert!(b2.is_connected());
                        let h3 = h2.clone();
                        b2.close(&h2, Box::new(move || h3.stop()));
                        assert!(b2.is_closing());
                    }),
                )
                .unwrap();
                assert!(!b.is_connected());
            })
            .unwrap();

        let stats = broker.stats();
        assert_eq!((stats.connects, stats.opened, stats.closes, stats.acks), (1, 1, 1, 1));
        assert!(broker.is_idle());
    }

    #[test]
    fn refusing_broker_fails_fast() {
        let broker = LoopbackBroker::new().with_connect_mode(ConnectMode::Refuse);
        let h = Reactor::new().handle();
        let err = broker
            .connect(&h, &BrokerConfig::default(), Box::new(|| {}))
            .unwrap_err();
        assert!(matches!(err, BrokerError::Refused { .. }));
        assert_eq!(broker.stats().connects, 0);
    }

    #[test]
    fn reset_invalidates_pending_handshake() {
        let broker = LoopbackBroker::new().with_connect_latency(Duration::from_millis(5));
        let reactor = Reactor::new();
        let h = reactor.handle();
        let b = broker.clone();

        reactor
            .run(move || {
                b.connect(&h, &BrokerConfig::default(), Box::new(|| panic!("stale open")))
                    .unwrap();
                b.reset_state().unwrap();
                b.reset_state().unwrap();
                let stopper = h.clone();
                h.schedule_once(Duration::from_millis(20), move || stopper.stop());
            })
            .unwrap();

        assert_eq!(broker.stats().opened, 0);
        assert_eq!(broker.stats().resets, 2);
        assert!(broker.is_idle());
    }

    #[test]
    fn close_without_session_is_ignored() {
        let broker = LoopbackBroker::new();
        let h = Reactor::new().handle();
        broker.close(&h, Box::new(|| panic!("no session")));
        assert_eq!(broker.stats().closes, 0);
        assert!(!broker.is_closing());
    }
}
