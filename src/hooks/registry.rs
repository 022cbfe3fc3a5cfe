//! # Hook registry.
//!
//! [`HookRegistry`] maps each [`HookPhase`] to an ordered list of [`Hook`]s.
//! It is built once per suite and handed to every example by reference
//! (`Arc<HookRegistry>`); there is no global lookup.
//!
//! ## Rules
//! - Hooks within a phase run in **registration order**
//! - The registry is never mutated during a run
//!
//! ## Example
//! ```rust
//! use evented_spec::{ExampleContext, HookPhase, HookRegistry};
//!
//! let hooks = HookRegistry::new()
//!     .with(HookPhase::BeforeLoop, "open-db", |_ctx: &ExampleContext| Ok(()))
//!     .with(HookPhase::AfterLoop, "close-db", |_ctx: &ExampleContext| Ok(()));
//!
//! assert_eq!(hooks.len(HookPhase::BeforeLoop), 1);
//! assert_eq!(hooks.hooks(HookPhase::BrokerAfter).len(), 0);
//! ```

use std::borrow::Cow;
use std::collections::HashMap;

use crate::example::ExampleContext;

use super::{Hook, HookPhase};

/// Phase → ordered hooks.
#[derive(Clone, Debug, Default)]
pub struct HookRegistry {
    phases: HashMap<HookPhase, Vec<Hook>>,
}

impl HookRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a hook to `phase`.
    pub fn register<F>(
        &mut self,
        phase: HookPhase,
        name: impl Into<Cow<'static, str>>,
        f: F,
    ) -> &mut Self
    where
        F: Fn(&ExampleContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.push(phase, Hook::new(name, f))
    }

    /// Appends an already built hook to `phase`.
    pub fn push(&mut self, phase: HookPhase, hook: Hook) -> &mut Self {
        self.phases.entry(phase).or_default().push(hook);
        self
    }

    /// Builder-style [`HookRegistry::register`].
    pub fn with<F>(mut self, phase: HookPhase, name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(&ExampleContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(phase, name, f);
        self
    }

    /// Hooks registered for `phase`, in registration order.
    pub fn hooks(&self, phase: HookPhase) -> &[Hook] {
        self.phases.get(&phase).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of hooks registered for `phase`.
    pub fn len(&self, phase: HookPhase) -> usize {
        self.hooks(phase).len()
    }

    /// True if no hook is registered for any phase.
    pub fn is_empty(&self) -> bool {
        self.phases.values().all(Vec::is_empty)
    }
}
