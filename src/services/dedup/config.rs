//! Deduplication dispatcher configuration.

use std::time::Duration;

use super::key::KeyStrategy;

/// Configuration for the deduplication dispatcher.
///
/// # Environment Variables
///
/// | Variable | Type | Default | Description |
/// |----------|------|---------|-------------|
/// | `QONDUIT_DEDUP_TTL_MS` | u64 | `30000` | Pending-entry time to live |
/// | `QONDUIT_DEDUP_KEY_STRATEGY` | string | `truncated` | `truncated` or `digest` |
/// | `QONDUIT_DEDUP_MESSAGE_PREFIX_CHARS` | usize | `50` | Message prefix length (truncated strategy) |
/// | `QONDUIT_DEDUP_CONTEXT_PREFIX_CHARS` | usize | `30` | Context prefix length (truncated strategy) |
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use qonduit::services::dedup::DedupConfig;
///
/// let config = DedupConfig::default();
/// assert_eq!(config.ttl, Duration::from_secs(30));
/// assert_eq!(config.message_prefix_chars, 50);
/// ```
#[derive(Debug, Clone)]
pub struct DedupConfig {
    /// How long a pending entry stays live. Entries older than this are
    /// purged lazily on the next lookup.
    pub ttl: Duration,

    /// Key derivation strategy.
    pub key_strategy: KeyStrategy,

    /// Message prefix length for the truncated strategy, in characters.
    pub message_prefix_chars: usize,

    /// Context prefix length for the truncated strategy, in characters.
    pub context_prefix_chars: usize,
}

impl DedupConfig {
    /// Creates a new configuration from environment variables.
    ///
    /// Falls back to defaults for unset or unparseable variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let ttl = std::env::var("QONDUIT_DEDUP_TTL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map_or(defaults.ttl, Duration::from_millis);

        let key_strategy = std::env::var("QONDUIT_DEDUP_KEY_STRATEGY")
            .ok()
            .and_then(|v| match v.to_lowercase().as_str() {
                "truncated" => Some(KeyStrategy::TruncatedPrefix),
                "digest" => Some(KeyStrategy::ContentDigest),
                _ => None,
            })
            .unwrap_or(defaults.key_strategy);

        let message_prefix_chars = std::env::var("QONDUIT_DEDUP_MESSAGE_PREFIX_CHARS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.message_prefix_chars);

        let context_prefix_chars = std::env::var("QONDUIT_DEDUP_CONTEXT_PREFIX_CHARS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.context_prefix_chars);

        Self {
            ttl,
            key_strategy,
            message_prefix_chars,
            context_prefix_chars,
        }
    }

    /// Builder method to set the pending-entry TTL.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Builder method to set the key strategy.
    #[must_use]
    pub const fn with_key_strategy(mut self, strategy: KeyStrategy) -> Self {
        self.key_strategy = strategy;
        self
    }

    /// Builder method to set the message prefix length.
    #[must_use]
    pub const fn with_message_prefix_chars(mut self, chars: usize) -> Self {
        self.message_prefix_chars = chars;
        self
    }

    /// Builder method to set the context prefix length.
    #[must_use]
    pub const fn with_context_prefix_chars(mut self, chars: usize) -> Self {
        self.context_prefix_chars = chars;
        self
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30),
            key_strategy: KeyStrategy::TruncatedPrefix,
            message_prefix_chars: 50,
            context_prefix_chars: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DedupConfig::default();

        assert_eq!(config.ttl, Duration::from_secs(30));
        assert_eq!(config.key_strategy, KeyStrategy::TruncatedPrefix);
        assert_eq!(config.message_prefix_chars, 50);
        assert_eq!(config.context_prefix_chars, 30);
    }

    #[test]
    fn test_builder_methods() {
        let config = DedupConfig::default()
            .with_ttl(Duration::from_secs(5))
            .with_key_strategy(KeyStrategy::ContentDigest)
            .with_message_prefix_chars(80)
            .with_context_prefix_chars(40);

        assert_eq!(config.ttl, Duration::from_secs(5));
        assert_eq!(config.key_strategy, KeyStrategy::ContentDigest);
        assert_eq!(config.message_prefix_chars, 80);
        assert_eq!(config.context_prefix_chars, 40);
    }
}
