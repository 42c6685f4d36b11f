//! Configuration management.
//!
//! Every service reads its settings from `QONDUIT_*` environment
//! variables with sensible defaults, so a bare `Config::from_env()` works
//! out of the box. Unparseable or out-of-range values fall back to their
//! defaults rather than failing startup.
//!
//! | Section | Variables |
//! |---------|-----------|
//! | `fingerprint` | `QONDUIT_FP_*` weights and thresholds |
//! | `dedup` | `QONDUIT_DEDUP_*` TTL and key strategy |
//! | `batch` | `QONDUIT_BATCH_*` thresholds and debounce |
//! | `pool` | `QONDUIT_POOL_*` capacity, timeouts, and intervals |
//!
//! See each service's config type for the full variable list.

use crate::services::batch::BatchConfig;
use crate::services::dedup::DedupConfig;
use crate::services::fingerprint::FingerprintConfig;
use crate::services::pool::PoolConfig;

/// Top-level configuration for all qonduit services.
///
/// # Examples
///
/// ```rust
/// use qonduit::config::Config;
///
/// let config = Config::from_env();
/// assert!(config.fingerprint.similarity_threshold > 0.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Fingerprint engine settings.
    pub fingerprint: FingerprintConfig,
    /// Deduplication dispatcher settings.
    pub dedup: DedupConfig,
    /// Batch scheduler settings.
    pub batch: BatchConfig,
    /// Connection pool settings.
    pub pool: PoolConfig,
}

impl Config {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every section from its environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            fingerprint: FingerprintConfig::from_env(),
            dedup: DedupConfig::from_env(),
            batch: BatchConfig::from_env(),
            pool: PoolConfig::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sections_match_service_defaults() {
        let config = Config::new();

        assert_eq!(config.batch.max_batch_size, BatchConfig::default().max_batch_size);
        assert_eq!(config.pool.max_connections, PoolConfig::default().max_connections);
        assert_eq!(config.dedup.ttl, DedupConfig::default().ttl);
    }

    #[test]
    fn test_from_env_without_overrides_is_default() {
        // No QONDUIT_* variables are set in the test environment
        let config = Config::from_env();
        assert_eq!(
            config.fingerprint.similarity_threshold,
            FingerprintConfig::default().similarity_threshold
        );
    }
}
