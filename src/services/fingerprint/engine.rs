//! Fingerprint engine service.

use tracing::instrument;

use super::cache::SemanticMemoCache;
use super::concepts::extract_concepts;
use super::config::FingerprintConfig;
use super::hash::content_hash;
use super::normalize::normalize;
use super::types::{ConversationContext, RequestFingerprint, UserIdentity};
use crate::current_timestamp_ms;

/// Context hash sentinel for requests that carry no context.
pub const NO_CONTEXT_SENTINEL: &str = "no-context";

/// User hash sentinel when identity hashing is disabled or no identity was
/// supplied.
pub const ANONYMOUS_SENTINEL: &str = "anonymous";

/// Derives comparable signatures from requests and scores their similarity.
///
/// The engine is pure aside from an internal LRU memo for semantic hashes;
/// construct one per logical client (or share it behind an `Arc`) and pass
/// it wherever fingerprints are produced or compared.
///
/// # How it works
///
/// 1. `fingerprint` normalizes the message and derives four hashes:
///    content (polynomial), semantic (concept tag set), context (canonical
///    context subset), user (identity or anonymous sentinel)
/// 2. `similarity` compares two fingerprints dimension by dimension; each
///    exactly-matching dimension contributes its configured weight
/// 3. `should_supersede` / `is_follow_up` layer conversational rules on
///    top of the hash comparisons
///
/// # Example
///
/// ```rust
/// use qonduit::services::fingerprint::{FingerprintConfig, FingerprintEngine};
///
/// let engine = FingerprintEngine::new(FingerprintConfig::default());
///
/// let a = engine.fingerprint("What is quantum entanglement?", None, None);
/// let b = engine.fingerprint("what is QUANTUM entanglement", None, None);
/// assert_eq!(a.content_hash, b.content_hash);
/// assert!((engine.similarity(&a, &b) - 1.0).abs() < f64::EPSILON);
/// ```
pub struct FingerprintEngine {
    /// Weights, thresholds, and windows.
    config: FingerprintConfig,
    /// Memoized semantic hashes keyed by normalized text.
    memo: SemanticMemoCache,
}

impl FingerprintEngine {
    /// Creates an engine from configuration.
    ///
    /// # Panics
    ///
    /// Panics if `config.cache_size` is 0.
    #[must_use]
    pub fn new(config: FingerprintConfig) -> Self {
        let memo = SemanticMemoCache::new(config.cache_size);
        Self { config, memo }
    }

    /// Returns the engine's configuration.
    #[must_use]
    pub const fn config(&self) -> &FingerprintConfig {
        &self.config
    }

    /// Computes the semantic hash of a message.
    ///
    /// The message is normalized, reduced to its sorted concept tag set,
    /// and the joined tags are content-hashed. Results are memoized by
    /// normalized text, so repeated phrasings of one question cost a
    /// single extraction.
    #[must_use]
    pub fn semantic_hash(&self, text: &str) -> String {
        let normalized = normalize(text);
        self.semantic_hash_of_normalized(&normalized)
    }

    /// Semantic hash for already-normalized text.
    fn semantic_hash_of_normalized(&self, normalized: &str) -> String {
        if let Some(hash) = self.memo.get(normalized) {
            return hash;
        }

        let concepts = extract_concepts(normalized);
        let hash = content_hash(&concepts.join("|"));
        self.memo.put(normalized.to_string(), hash.clone());
        hash
    }

    /// Computes the context hash for an optional conversation context.
    ///
    /// Hashes the canonical subset (expertise level, preferred style,
    /// domain, at most the three most recent topics); absent context
    /// yields [`NO_CONTEXT_SENTINEL`].
    #[must_use]
    pub fn context_hash(&self, context: Option<&ConversationContext>) -> String {
        context.map_or_else(
            || NO_CONTEXT_SENTINEL.to_string(),
            |ctx| content_hash(&ctx.canonical_repr()),
        )
    }

    /// Computes the user hash for an optional identity.
    ///
    /// Hashes `{user_id, session_id}` when `include_user` is enabled and
    /// an identity is present; otherwise yields [`ANONYMOUS_SENTINEL`].
    #[must_use]
    pub fn user_hash(&self, user: Option<&UserIdentity>) -> String {
        if !self.config.include_user {
            return ANONYMOUS_SENTINEL.to_string();
        }

        user.map_or_else(
            || ANONYMOUS_SENTINEL.to_string(),
            |identity| {
                content_hash(&format!(
                    "{}|{}",
                    identity.user_id,
                    identity.session_id.as_deref().unwrap_or("")
                ))
            },
        )
    }

    /// Produces a fingerprint for a request.
    ///
    /// # Arguments
    ///
    /// * `message` - Raw message text
    /// * `context` - Optional conversation context
    /// * `user` - Optional user/session identity
    #[instrument(
        skip(self, message, context, user),
        fields(operation = "fingerprint", message_length = message.len())
    )]
    #[must_use]
    pub fn fingerprint(
        &self,
        message: &str,
        context: Option<&ConversationContext>,
        user: Option<&UserIdentity>,
    ) -> RequestFingerprint {
        let normalized = normalize(message);

        let fingerprint = RequestFingerprint {
            content_hash: content_hash(&normalized),
            semantic_hash: self.semantic_hash_of_normalized(&normalized),
            context_hash: self.context_hash(context),
            user_hash: self.user_hash(user),
            timestamp: current_timestamp_ms(),
        };

        tracing::debug!(
            content_hash = %fingerprint.content_hash,
            semantic_hash = %fingerprint.semantic_hash,
            context_hash = %fingerprint.context_hash,
            "Fingerprint derived"
        );
        metrics::counter!("fingerprint_requests_total").increment(1);

        fingerprint
    }

    /// Scores the similarity of two fingerprints in `[0, 1]`.
    ///
    /// Binary-match scoring: each dimension whose hashes are exactly equal
    /// contributes its configured weight; the result is the matched-weight
    /// sum over the total weight sum. A zero total weight (nothing
    /// configured to compare) scores 0.
    #[must_use]
    pub fn similarity(&self, a: &RequestFingerprint, b: &RequestFingerprint) -> f64 {
        let cfg = &self.config;
        let total = cfg.content_weight + cfg.semantic_weight + cfg.context_weight + cfg.user_weight;
        if total <= 0.0 {
            return 0.0;
        }

        let mut matched = 0.0;
        if a.content_hash == b.content_hash {
            matched += cfg.content_weight;
        }
        if a.semantic_hash == b.semantic_hash {
            matched += cfg.semantic_weight;
        }
        if a.context_hash == b.context_hash {
            matched += cfg.context_weight;
        }
        if a.user_hash == b.user_hash {
            matched += cfg.user_weight;
        }

        matched / total
    }

    /// Whether two fingerprints meet the similarity threshold.
    #[must_use]
    pub fn are_similar(&self, a: &RequestFingerprint, b: &RequestFingerprint) -> bool {
        self.similarity(a, b) >= self.config.similarity_threshold
    }

    /// Whether `newer` supersedes `older`.
    ///
    /// True only for fingerprints from the same user, when either:
    /// - `newer` refines the same question: same semantic hash, different
    ///   content hash, same context hash (no time limit), or
    /// - `newer` lands within the supersede window and the fingerprints
    ///   are similar (same conversational turn).
    #[must_use]
    pub fn should_supersede(&self, older: &RequestFingerprint, newer: &RequestFingerprint) -> bool {
        if older.user_hash != newer.user_hash {
            return false;
        }

        let refinement = older.semantic_hash == newer.semantic_hash
            && older.content_hash != newer.content_hash
            && older.context_hash == newer.context_hash;
        if refinement {
            return true;
        }

        older.elapsed_ms(newer) < self.config.supersede_window_ms && self.are_similar(older, newer)
    }

    /// Whether `current` is a quick follow-up to `previous`.
    ///
    /// True for same-user fingerprints with the same context hash captured
    /// within the follow-up window.
    #[must_use]
    pub fn is_follow_up(&self, previous: &RequestFingerprint, current: &RequestFingerprint) -> bool {
        previous.user_hash == current.user_hash
            && previous.elapsed_ms(current) < self.config.follow_up_window_ms
            && previous.context_hash == current.context_hash
    }
}

impl Default for FingerprintEngine {
    fn default() -> Self {
        Self::new(FingerprintConfig::default())
    }
}
