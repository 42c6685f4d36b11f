//! Fingerprint engine configuration.

/// Configuration for the fingerprint engine.
///
/// Weights control how much each matching dimension contributes to the
/// similarity score; the score is the matched-weight sum divided by the
/// total weight sum, so weights need not add up to 1.0.
///
/// # Environment Variables
///
/// | Variable | Type | Default | Description |
/// |----------|------|---------|-------------|
/// | `QONDUIT_FP_SIMILARITY_THRESHOLD` | f64 | `0.85` | `are_similar` cutoff |
/// | `QONDUIT_FP_CONTEXT_WEIGHT` | f64 | `0.3` | Context-match weight |
/// | `QONDUIT_FP_CACHE_SIZE` | usize | `500` | Semantic memo cache entries |
/// | `QONDUIT_FP_INCLUDE_USER` | bool | `false` | Hash user identity instead of the anonymous sentinel |
///
/// # Example
///
/// ```rust
/// use qonduit::services::fingerprint::FingerprintConfig;
///
/// let config = FingerprintConfig::default();
/// assert!((config.similarity_threshold - 0.85).abs() < f64::EPSILON);
/// assert_eq!(config.supersede_window_ms, 30_000);
/// ```
#[derive(Debug, Clone)]
pub struct FingerprintConfig {
    /// Weight of an exact content-hash match.
    pub content_weight: f64,

    /// Weight of an exact semantic-hash match.
    pub semantic_weight: f64,

    /// Weight of an exact context-hash match.
    pub context_weight: f64,

    /// Weight of an exact user-hash match.
    pub user_weight: f64,

    /// Minimum similarity score for `are_similar`.
    pub similarity_threshold: f64,

    /// Window within which similar fingerprints from the same user
    /// supersede one another, in milliseconds.
    pub supersede_window_ms: i64,

    /// Window within which a same-context request counts as a follow-up,
    /// in milliseconds.
    pub follow_up_window_ms: i64,

    /// Whether user/session identity participates in the user hash.
    ///
    /// When disabled every request hashes to the anonymous sentinel, so
    /// the user dimension always matches.
    pub include_user: bool,

    /// Semantic memo cache capacity, in entries.
    pub cache_size: usize,
}

impl FingerprintConfig {
    /// Creates a new configuration from environment variables.
    ///
    /// Falls back to defaults for unset or unparseable variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let similarity_threshold = std::env::var("QONDUIT_FP_SIMILARITY_THRESHOLD")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.similarity_threshold);

        let context_weight = std::env::var("QONDUIT_FP_CONTEXT_WEIGHT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.context_weight);

        let cache_size = std::env::var("QONDUIT_FP_CACHE_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&size: &usize| size > 0)
            .unwrap_or(defaults.cache_size);

        let include_user = std::env::var("QONDUIT_FP_INCLUDE_USER")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(defaults.include_user);

        Self {
            similarity_threshold,
            context_weight,
            cache_size,
            include_user,
            ..defaults
        }
    }

    /// Builder method to set the similarity threshold.
    #[must_use]
    pub const fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Builder method to set the context-match weight.
    #[must_use]
    pub const fn with_context_weight(mut self, weight: f64) -> Self {
        self.context_weight = weight;
        self
    }

    /// Builder method to set the supersede window.
    #[must_use]
    pub const fn with_supersede_window_ms(mut self, window_ms: i64) -> Self {
        self.supersede_window_ms = window_ms;
        self
    }

    /// Builder method to set the follow-up window.
    #[must_use]
    pub const fn with_follow_up_window_ms(mut self, window_ms: i64) -> Self {
        self.follow_up_window_ms = window_ms;
        self
    }

    /// Builder method to enable or disable user-identity hashing.
    #[must_use]
    pub const fn with_include_user(mut self, include_user: bool) -> Self {
        self.include_user = include_user;
        self
    }

    /// Builder method to set the memo cache capacity.
    #[must_use]
    pub const fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            content_weight: 0.4,
            semantic_weight: 0.3,
            context_weight: 0.3,
            user_weight: 0.1,
            similarity_threshold: 0.85,
            supersede_window_ms: 30_000,  // 30 seconds
            follow_up_window_ms: 10_000,  // 10 seconds
            include_user: false,
            cache_size: 500,
        }
    }
}
