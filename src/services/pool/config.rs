//! Connection pool configuration.

use std::time::Duration;

/// Configuration for the connection pool manager.
///
/// # Environment Variables
///
/// | Variable | Type | Default | Description |
/// |----------|------|---------|-------------|
/// | `QONDUIT_POOL_MAX_CONNECTIONS` | usize | `5` | Soft pool capacity |
/// | `QONDUIT_POOL_CONNECT_TIMEOUT_MS` | u64 | `10000` | Connect attempt timeout |
/// | `QONDUIT_POOL_IDLE_TIMEOUT_MS` | u64 | `300000` | Idle duration before sweep removal |
/// | `QONDUIT_POOL_SWEEP_INTERVAL_MS` | u64 | `60000` | Idle sweep period |
/// | `QONDUIT_POOL_HEARTBEAT_INTERVAL_MS` | u64 | `30000` | Heartbeat probe period |
/// | `QONDUIT_POOL_MAX_RECONNECT_ATTEMPTS` | u32 | `3` | Reconnect attempts before a link is dropped |
/// | `QONDUIT_POOL_MAX_BACKOFF_MS` | u64 | unset | Optional backoff delay ceiling |
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use qonduit::services::pool::PoolConfig;
///
/// let config = PoolConfig::default();
/// assert_eq!(config.max_connections, 5);
/// assert_eq!(config.connect_timeout, Duration::from_secs(10));
/// assert_eq!(config.max_backoff, None);
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Soft capacity. Exceeded transiently only when every pooled link
    /// has subscribers.
    pub max_connections: usize,

    /// How long a connect attempt may take before rejecting the caller.
    pub connect_timeout: Duration,

    /// Idle duration after which an inactive link is swept.
    pub idle_timeout: Duration,

    /// How often the idle sweep runs.
    pub sweep_interval: Duration,

    /// How often open, active links are probed.
    pub heartbeat_interval: Duration,

    /// Reconnect attempts before a failed link is removed.
    pub max_reconnect_attempts: u32,

    /// Optional ceiling on the exponential reconnect delay. `None` leaves
    /// the delay unclamped.
    pub max_backoff: Option<Duration>,
}

impl PoolConfig {
    /// Creates a new configuration from environment variables.
    ///
    /// Falls back to defaults for unset or unparseable variables; a zero
    /// `QONDUIT_POOL_MAX_CONNECTIONS` is ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_connections = std::env::var("QONDUIT_POOL_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&size: &usize| size > 0)
            .unwrap_or(defaults.max_connections);

        let connect_timeout = std::env::var("QONDUIT_POOL_CONNECT_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map_or(defaults.connect_timeout, Duration::from_millis);

        let idle_timeout = std::env::var("QONDUIT_POOL_IDLE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map_or(defaults.idle_timeout, Duration::from_millis);

        let sweep_interval = std::env::var("QONDUIT_POOL_SWEEP_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map_or(defaults.sweep_interval, Duration::from_millis);

        let heartbeat_interval = std::env::var("QONDUIT_POOL_HEARTBEAT_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map_or(defaults.heartbeat_interval, Duration::from_millis);

        let max_reconnect_attempts = std::env::var("QONDUIT_POOL_MAX_RECONNECT_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_reconnect_attempts);

        let max_backoff = std::env::var("QONDUIT_POOL_MAX_BACKOFF_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .or(defaults.max_backoff);

        Self {
            max_connections,
            connect_timeout,
            idle_timeout,
            sweep_interval,
            heartbeat_interval,
            max_reconnect_attempts,
            max_backoff,
        }
    }

    /// Builder method to set the soft capacity.
    #[must_use]
    pub const fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Builder method to set the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Builder method to set the idle timeout.
    #[must_use]
    pub const fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Builder method to set the sweep interval.
    #[must_use]
    pub const fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Builder method to set the heartbeat interval.
    #[must_use]
    pub const fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Builder method to set the reconnect attempt limit.
    #[must_use]
    pub const fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Builder method to set (or clear) the backoff ceiling.
    #[must_use]
    pub const fn with_max_backoff(mut self, cap: Option<Duration>) -> Self {
        self.max_backoff = cap;
        self
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(60),
            heartbeat_interval: Duration::from_secs(30),
            max_reconnect_attempts: 3,
            max_backoff: None,
        }
    }
}
