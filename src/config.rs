//! # Example and harness configuration.
//!
//! Provides the settings consumed by the example controller and the suite-level harness:
//! - [`ExampleConfig`] per-run options (example timeout, broker connection parameters);
//! - [`BrokerConfig`] opaque connection parameters, read only by the broker variant;
//! - [`HarnessConfig`] suite-wide defaults (example config, bus capacity, drain grace).
//!
//! Config is used in two ways:
//! 1. **Direct construction**: `EventedExample::loop_only(cfg, hooks, body)`
//! 2. **Harness defaults**: `Harness::run_loop(name, body)` uses `HarnessConfig::example`
//!
//! ## Sentinel values
//! - `spec_timeout = Some(0s)` → no timeout (treated as `None` by [`ExampleConfig::timeout`])
//! - `bus_capacity = 0` → clamped to 1

use std::fmt;
use std::time::Duration;

/// Broker connection parameters.
///
/// Opaque to the controller: they are handed to the [`Broker`](crate::Broker)
/// collaborator when the broker variant opens its session.
///
/// `Debug` output redacts the password.
#[derive(Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Broker host name or address.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// Login user.
    pub user: String,
    /// Login password.
    pub pass: String,
    /// Virtual host.
    pub vhost: String,
}

impl BrokerConfig {
    /// Renders `host:port/vhost` for logs and errors.
    pub fn endpoint(&self) -> String {
        let vhost = self.vhost.trim_start_matches('/');
        format!("{}:{}/{}", self.host, self.port, vhost)
    }
}

impl Default for BrokerConfig {
    /// Default connection: `guest:guest@127.0.0.1:5672/`.
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5672,
            user: "guest".to_string(),
            pass: "guest".to_string(),
            vhost: "/".to_string(),
        }
    }
}

impl fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .field("vhost", &self.vhost)
            .finish()
    }
}

/// Per-run options of an evented example.
///
/// Owned by the caller and read-only to the controller.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use evented_spec::ExampleConfig;
///
/// let cfg = ExampleConfig::default().with_timeout(Duration::from_millis(500));
/// assert_eq!(cfg.timeout(), Some(Duration::from_millis(500)));
///
/// // `0s` means "no timeout"
/// let cfg = ExampleConfig::default().with_timeout(Duration::ZERO);
/// assert_eq!(cfg.timeout(), None);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ExampleConfig {
    /// Upper bound for the example to call `done`.
    ///
    /// - `None` or `Some(0s)` = no timeout (an example that never calls `done` runs forever)
    /// - `Some(d)` = the example fails with a timeout error after `d`
    pub spec_timeout: Option<Duration>,

    /// Connection parameters for the broker variant.
    pub broker: BrokerConfig,
}

impl ExampleConfig {
    /// Returns the example timeout as an `Option`, treating zero as "not configured".
    #[inline]
    pub fn timeout(&self) -> Option<Duration> {
        self.spec_timeout.filter(|d| *d > Duration::ZERO)
    }

    /// Returns a copy with the given example timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.spec_timeout = Some(timeout);
        self
    }

    /// Returns a copy with the given broker parameters.
    pub fn with_broker(mut self, broker: BrokerConfig) -> Self {
        self.broker = broker;
        self
    }
}

/// Suite-wide configuration for the [`Harness`](crate::Harness).
///
/// ## Field semantics
/// - `example`: default per-run options for every example of the suite
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped)
/// - `grace`: maximum wait for subscriber queues to drain on shutdown
#[derive(Clone, Debug)]
pub struct HarnessConfig {
    /// Default options handed to each example.
    pub example: ExampleConfig,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow listeners that lag behind more than `bus_capacity` events skip older items.
    pub bus_capacity: usize,

    /// Maximum time to wait for subscribers to process queued events on shutdown.
    pub grace: Duration,
}

impl HarnessConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for HarnessConfig {
    /// Default configuration:
    ///
    /// - `example = ExampleConfig::default()` (no timeout, local guest broker)
    /// - `bus_capacity = 1024`
    /// - `grace = 5s`
    fn default() -> Self {
        Self {
            example: ExampleConfig::default(),
            bus_capacity: 1024,
            grace: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timeout_is_disabled() {
        let cfg = ExampleConfig {
            spec_timeout: Some(Duration::ZERO),
            ..ExampleConfig::default()
        };
        assert_eq!(cfg.timeout(), None);
        assert_eq!(ExampleConfig::default().timeout(), None);
    }

    #[test]
    fn broker_debug_redacts_password() {
        let cfg = BrokerConfig {
            pass: "s3cret".to_string(),
            ..BrokerConfig::default()
        };
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("s3cret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn endpoint_renders_vhost() {
        let cfg = BrokerConfig {
            vhost: "/test".to_string(),
            ..BrokerConfig::default()
        };
        assert_eq!(cfg.endpoint(), "127.0.0.1:5672/test");
        assert_eq!(BrokerConfig::default().endpoint(), "127.0.0.1:5672/");
    }

    #[test]
    fn bus_capacity_is_clamped() {
        let cfg = HarnessConfig {
            bus_capacity: 0,
            ..HarnessConfig::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
