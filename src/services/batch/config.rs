//! Batch scheduler configuration.

use std::time::Duration;

/// Configuration for the adaptive batch scheduler.
///
/// # Environment Variables
///
/// | Variable | Type | Default | Description |
/// |----------|------|---------|-------------|
/// | `QONDUIT_BATCH_HIGH_THRESHOLD` | usize | `5` | Queued high-priority count that forces a flush |
/// | `QONDUIT_BATCH_NORMAL_THRESHOLD` | usize | `15` | Queued normal-priority count that forces a flush |
/// | `QONDUIT_BATCH_LOW_THRESHOLD` | usize | `25` | Queued low-priority count that forces a flush |
/// | `QONDUIT_BATCH_MAX_SIZE` | usize | `25` | Hard queue cap and per-flush drain limit |
/// | `QONDUIT_BATCH_DEBOUNCE_MS` | u64 | `2000` | Debounce delay before an idle queue flushes |
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use qonduit::services::batch::BatchConfig;
///
/// let config = BatchConfig::default();
/// assert_eq!(config.high_threshold, 5);
/// assert_eq!(config.debounce, Duration::from_millis(2000));
/// ```
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Queued high-priority operations that force an immediate flush.
    pub high_threshold: usize,

    /// Queued normal-priority operations that force an immediate flush.
    pub normal_threshold: usize,

    /// Queued low-priority operations that force an immediate flush.
    pub low_threshold: usize,

    /// Total queue size that forces a flush; also the per-flush drain cap.
    pub max_batch_size: usize,

    /// How long an under-threshold queue waits before flushing anyway.
    pub debounce: Duration,
}

impl BatchConfig {
    /// Creates a new configuration from environment variables.
    ///
    /// Falls back to defaults for unset or unparseable variables; a zero
    /// `QONDUIT_BATCH_MAX_SIZE` is ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let high_threshold = std::env::var("QONDUIT_BATCH_HIGH_THRESHOLD")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.high_threshold);

        let normal_threshold = std::env::var("QONDUIT_BATCH_NORMAL_THRESHOLD")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.normal_threshold);

        let low_threshold = std::env::var("QONDUIT_BATCH_LOW_THRESHOLD")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.low_threshold);

        let max_batch_size = std::env::var("QONDUIT_BATCH_MAX_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&size: &usize| size > 0)
            .unwrap_or(defaults.max_batch_size);

        let debounce = std::env::var("QONDUIT_BATCH_DEBOUNCE_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map_or(defaults.debounce, Duration::from_millis);

        Self {
            high_threshold,
            normal_threshold,
            low_threshold,
            max_batch_size,
            debounce,
        }
    }

    /// Builder method to set the high-priority flush threshold.
    #[must_use]
    pub const fn with_high_threshold(mut self, threshold: usize) -> Self {
        self.high_threshold = threshold;
        self
    }

    /// Builder method to set the normal-priority flush threshold.
    #[must_use]
    pub const fn with_normal_threshold(mut self, threshold: usize) -> Self {
        self.normal_threshold = threshold;
        self
    }

    /// Builder method to set the low-priority flush threshold.
    #[must_use]
    pub const fn with_low_threshold(mut self, threshold: usize) -> Self {
        self.low_threshold = threshold;
        self
    }

    /// Builder method to set the hard cap and per-flush drain limit.
    #[must_use]
    pub const fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    /// Builder method to set the debounce delay.
    #[must_use]
    pub const fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            high_threshold: 5,
            normal_threshold: 15,
            low_threshold: 25,
            max_batch_size: 25,
            debounce: Duration::from_millis(2000),
        }
    }
}
