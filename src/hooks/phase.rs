//! # Hook phases.

use std::fmt;

/// Lifecycle phase a [`Hook`](crate::Hook) is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    /// Inside the loop, before the timeout is armed and the body runs.
    BeforeLoop,
    /// Before the loop is asked to stop (also on the outside-the-loop failure path).
    AfterLoop,
    /// Broker variant: after the session opened, before the body runs.
    BrokerBefore,
    /// Broker variant: after `done`, before the session is closed.
    BrokerAfter,
}

impl HookPhase {
    /// All phases in lifecycle order.
    pub const ALL: [HookPhase; 4] = [
        HookPhase::BeforeLoop,
        HookPhase::BrokerBefore,
        HookPhase::BrokerAfter,
        HookPhase::AfterLoop,
    ];

    /// Stable kebab-case name (`before-loop`, `after-loop`, `broker-before`, `broker-after`).
    pub fn as_str(&self) -> &'static str {
        match self {
            HookPhase::BeforeLoop => "before-loop",
            HookPhase::AfterLoop => "after-loop",
            HookPhase::BrokerBefore => "broker-before",
            HookPhase::BrokerAfter => "broker-after",
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
