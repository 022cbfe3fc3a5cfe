//! # Broker session state machine.
//!
//! ```text
//! Unopened ─► Opening ─► Open ─► Closing ─► Closed
//!     └──────────┴─────────┴────────┴──────────▲   (forced cleanup)
//! ```
//!
//! ## Rules
//! - `close` may only be requested from `Open`
//! - The loop may only stop in `Unopened` or `Closed`
//! - Any state may move to `Closed`

use std::fmt;

/// Lifecycle of the broker variant's session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No connect attempted.
    #[default]
    Unopened,
    /// Connect requested, handshake pending.
    Opening,
    /// Session established.
    Open,
    /// Close requested, acknowledgement pending.
    Closing,
    /// Session closed or client state reset.
    Closed,
}

impl SessionState {
    /// True if moving from `self` to `next` is allowed.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Unopened, Opening) | (Opening, Open) | (Open, Closing) | (_, Closed)
        )
    }

    /// True if the loop may be stopped in this state.
    pub fn may_stop_loop(self) -> bool {
        matches!(self, SessionState::Unopened | SessionState::Closed)
    }

    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Unopened => "unopened",
            SessionState::Opening => "opening",
            SessionState::Open => "open",
            SessionState::Closing => "closing",
            SessionState::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::SessionState::*;

    #[test]
    fn happy_path_is_linear() {
        assert!(Unopened.can_transition_to(Opening));
        assert!(Opening.can_transition_to(Open));
        assert!(Open.can_transition_to(Closing));
        assert!(Closing.can_transition_to(Closed));
        assert!(!Unopened.can_transition_to(Open));
        assert!(!Opening.can_transition_to(Closing));
        assert!(!Closed.can_transition_to(Open));
    }

    #[test]
    fn any_state_may_be_forced_closed() {
        for s in [Unopened, Opening, Open, Closing, Closed] {
            assert!(s.can_transition_to(Closed), "{s}");
        }
    }

    #[test]
    fn loop_stops_only_when_quiescent() {
        assert!(Unopened.may_stop_loop());
        assert!(Closed.may_stop_loop());
        assert!(!Opening.may_stop_loop());
        assert!(!Open.may_stop_loop());
        assert!(!Closing.may_stop_loop());
    }
}
