//! # Named hook callback.
//!
//! [`Hook`] wraps a closure `Fn(&ExampleContext) -> anyhow::Result<()>` with a
//! stable name used in events and logs. Hooks are `Fn`, not `FnOnce`: the same
//! registry serves every example of a suite.
//!
//! ## Example
//! ```rust
//! use evented_spec::{ExampleContext, Hook};
//!
//! let hook = Hook::new("reset-fixtures", |_ctx: &ExampleContext| Ok(()));
//! assert_eq!(hook.name(), "reset-fixtures");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::example::ExampleContext;

type HookFn = dyn Fn(&ExampleContext) -> anyhow::Result<()> + Send + Sync + 'static;

/// Named lifecycle callback.
#[derive(Clone)]
pub struct Hook {
    name: Cow<'static, str>,
    f: Arc<HookFn>,
}

impl Hook {
    /// Creates a new hook.
    pub fn new<F>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(&ExampleContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            f: Arc::new(f),
        }
    }

    /// Returns the hook name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluates the hook against the running example.
    pub fn call(&self, ctx: &ExampleContext) -> anyhow::Result<()> {
        (self.f)(ctx)
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook").field("name", &self.name).finish()
    }
}
