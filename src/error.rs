//! Error types used by the evented example runtime.
//!
//! This module defines the error enums that cross the public API:
//!
//! - [`ExampleError`]: the single failure an example reports to its caller.
//! - [`ReactorError`]: failures of the event loop itself (startup, escaped panics).
//! - [`BrokerError`]: failures reported by a [`Broker`](crate::Broker) collaborator.
//! - [`HarnessError`]: failures of the suite-level harness (runtime, subscriber drain).
//!
//! All types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use std::any::Any;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Opaque panic payload captured by `catch_unwind`.
///
/// Kept intact so that [`ExampleError::resume`] can re-raise the original panic
/// on the caller's thread.
pub struct PanicPayload(Box<dyn Any + Send + 'static>);

impl PanicPayload {
    /// Wraps a payload returned by [`std::panic::catch_unwind`].
    pub fn new(payload: Box<dyn Any + Send + 'static>) -> Self {
        Self(payload)
    }

    /// Best-effort textual form of the panic (`&str` and `String` payloads).
    pub fn message(&self) -> String {
        if let Some(s) = self.0.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = self.0.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        }
    }

    /// Returns the raw payload.
    pub fn into_inner(self) -> Box<dyn Any + Send + 'static> {
        self.0
    }
}

impl fmt::Debug for PanicPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PanicPayload").field(&self.message()).finish()
    }
}

/// # Failure reported by a single example run.
///
/// Every failure path of an example (timeout, body, hooks, loop startup,
/// broker cleanup) is funnelled into one captured slot holding an
/// `ExampleError`; [`EventedExample::run`](crate::EventedExample::run)
/// returns it after the loop has been torn down.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ExampleError {
    /// The example timer fired before the example signalled `done`.
    #[error("example timed out after {timeout:?}")]
    Timeout {
        /// The configured timeout that elapsed.
        timeout: Duration,
    },

    /// The body (or a `before-loop` / `broker-before` hook) returned an error.
    ///
    /// Display and source are those of the original error.
    #[error(transparent)]
    Body(#[from] anyhow::Error),

    /// The body, a hook, or a loop callback panicked.
    #[error("example panicked: {message}")]
    Panicked {
        /// Textual form of the panic payload.
        message: String,
        /// Original payload, re-raised by [`ExampleError::resume`].
        payload: PanicPayload,
    },

    /// The event loop could not be started or driven.
    #[error("event loop failed: {0}")]
    Loop(ReactorError),

    /// The broker collaborator failed outside the body.
    #[error("broker failure: {0}")]
    Broker(#[from] BrokerError),
}

impl ExampleError {
    /// Builds a [`ExampleError::Panicked`] from a `catch_unwind` payload.
    pub fn from_panic(payload: Box<dyn Any + Send + 'static>) -> Self {
        let payload = PanicPayload::new(payload);
        ExampleError::Panicked {
            message: payload.message(),
            payload,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use evented_spec::ExampleError;
    /// use std::time::Duration;
    ///
    /// let err = ExampleError::Timeout { timeout: Duration::from_millis(500) };
    /// assert_eq!(err.as_label(), "example_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ExampleError::Timeout { .. } => "example_timeout",
            ExampleError::Body(_) => "example_body_failed",
            ExampleError::Panicked { .. } => "example_panicked",
            ExampleError::Loop(_) => "example_loop_failed",
            ExampleError::Broker(_) => "example_broker_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ExampleError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            ExampleError::Body(e) => format!("error: {e:#}"),
            ExampleError::Panicked { message, .. } => format!("panic: {message}"),
            ExampleError::Loop(e) => format!("loop: {}", e.as_message()),
            ExampleError::Broker(e) => format!("broker: {e}"),
        }
    }

    /// True for [`ExampleError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExampleError::Timeout { .. })
    }

    /// Re-raises the failure as a panic on the current thread.
    ///
    /// Panics are resumed with their original payload, so assertion messages
    /// from the body surface unchanged in the test output. Other failures
    /// panic with their `Display` form.
    pub fn resume(self) -> ! {
        match self {
            ExampleError::Panicked { payload, .. } => {
                std::panic::resume_unwind(payload.into_inner())
            }
            other => panic!("{other}"),
        }
    }
}

impl From<ReactorError> for ExampleError {
    /// Panics escaping the loop keep their payload; everything else is a loop failure.
    fn from(err: ReactorError) -> Self {
        match err {
            ReactorError::Panicked { payload, .. } => {
                ExampleError::from_panic(payload.into_inner())
            }
            other => ExampleError::Loop(other),
        }
    }
}

/// # Errors produced by the event loop.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ReactorError {
    /// The underlying tokio runtime could not be built.
    #[error("failed to build loop runtime: {source}")]
    Runtime {
        /// I/O error reported by the runtime builder.
        #[source]
        source: std::io::Error,
    },

    /// `run` was called from inside an async runtime; blocking there would deadlock.
    #[error("cannot start the event loop from within an async runtime")]
    NestedRuntime,

    /// The loop is already running.
    #[error("event loop is already running")]
    AlreadyRunning,

    /// A scheduled callback panicked; the loop was abandoned.
    #[error("loop callback panicked: {message}")]
    Panicked {
        /// Textual form of the panic payload.
        message: String,
        /// Original payload.
        payload: PanicPayload,
    },
}

impl ReactorError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ReactorError::Runtime { .. } => "reactor_runtime",
            ReactorError::NestedRuntime => "reactor_nested_runtime",
            ReactorError::AlreadyRunning => "reactor_already_running",
            ReactorError::Panicked { .. } => "reactor_callback_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ReactorError::Runtime { source } => format!("runtime: {source}"),
            ReactorError::NestedRuntime => "nested runtime".to_string(),
            ReactorError::AlreadyRunning => "already running".to_string(),
            ReactorError::Panicked { message, .. } => format!("callback panic: {message}"),
        }
    }
}

/// # Errors reported by a broker collaborator.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// The broker rejected the connection attempt outright.
    #[error("connection to {endpoint} refused")]
    Refused {
        /// Rendered `host:port/vhost`.
        endpoint: String,
    },

    /// Resetting client state failed.
    #[error("failed to reset broker state: {reason}")]
    Reset {
        /// Failure description.
        reason: String,
    },
}

/// # Errors produced by the suite-level harness.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HarnessError {
    /// The background runtime for subscriber workers could not be built.
    #[error("failed to build harness runtime: {source}")]
    Runtime {
        /// I/O error reported by the runtime builder.
        #[source]
        source: std::io::Error,
    },

    /// Subscriber queues were not drained within the grace period.
    #[error("shutdown timeout {grace:?} exceeded; stuck subscribers: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of subscribers whose workers did not finish in time.
        stuck: Vec<String>,
    },
}

impl HarnessError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use evented_spec::HarnessError;
    /// use std::time::Duration;
    ///
    /// let err = HarnessError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "harness_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            HarnessError::Runtime { .. } => "harness_runtime",
            HarnessError::GraceExceeded { .. } => "harness_grace_exceeded",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_error_keeps_original_message() {
        let err = ExampleError::from(anyhow::anyhow!("expected 1, got 2"));
        assert_eq!(err.to_string(), "expected 1, got 2");
        assert_eq!(err.as_label(), "example_body_failed");
    }

    #[test]
    fn timeout_message_names_duration() {
        let err = ExampleError::Timeout {
            timeout: Duration::from_millis(500),
        };
        assert!(err.is_timeout());
        assert!(err.to_string().contains("500ms"));
    }

    #[test]
    fn escaped_panic_maps_to_panicked() {
        let payload = std::panic::catch_unwind(|| {
            panic!("boom");
        })
        .unwrap_err();
        let reactor = ReactorError::Panicked {
            message: "boom".into(),
            payload: PanicPayload::new(payload),
        };
        match ExampleError::from(reactor) {
            ExampleError::Panicked { message, .. } => assert_eq!(message, "boom"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn resume_reraises_original_payload() {
        let payload = std::panic::catch_unwind(|| {
            panic!("original");
        })
        .unwrap_err();
        let err = ExampleError::from_panic(payload);
        let resumed = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            err.resume();
        }))
        .unwrap_err();
        assert_eq!(PanicPayload::new(resumed).message(), "original");
    }
}
