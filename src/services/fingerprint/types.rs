//! Fingerprint data types.

use serde::{Deserialize, Serialize};

/// A derived signature identifying a request's content, meaning, context,
/// and originator.
///
/// Produced once per request by
/// [`FingerprintEngine::fingerprint`](super::FingerprintEngine::fingerprint),
/// immutable afterwards, and never persisted beyond the caller's lifetime.
/// All comparisons between fingerprints are exact-hash equality per
/// dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFingerprint {
    /// Polynomial hash of the normalized message text.
    pub content_hash: String,
    /// Hash of the sorted concept tag set extracted from the message.
    pub semantic_hash: String,
    /// Hash of the canonical conversation-context subset, or the
    /// no-context sentinel.
    pub context_hash: String,
    /// Hash of the user/session identity, or the anonymous sentinel.
    pub user_hash: String,
    /// Capture time, Unix milliseconds.
    pub timestamp: i64,
}

impl RequestFingerprint {
    /// Elapsed milliseconds from `self` to `other`.
    ///
    /// Negative when `other` was captured before `self`.
    #[must_use]
    pub const fn elapsed_ms(&self, other: &Self) -> i64 {
        other.timestamp - self.timestamp
    }
}

/// Conversation context considered when fingerprinting a request.
///
/// Only a canonical subset participates in hashing: expertise level,
/// preferred style, domain, and at most the three most recent topics
/// (`recent_topics` is ordered oldest first).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationContext {
    /// The user's expertise level, if known.
    pub expertise_level: Option<String>,
    /// The user's preferred response style, if known.
    pub preferred_style: Option<String>,
    /// The conversation's subject domain, if known.
    pub domain: Option<String>,
    /// Recent conversation topics, oldest first.
    #[serde(default)]
    pub recent_topics: Vec<String>,
}

/// How many trailing `recent_topics` entries participate in hashing.
const CANONICAL_TOPIC_COUNT: usize = 3;

impl ConversationContext {
    /// Serializes the canonical subset into a stable string.
    ///
    /// Fields are pipe-joined with absent values as empty strings; topics
    /// are the final [`CANONICAL_TOPIC_COUNT`] entries, comma-joined. The
    /// same representation feeds both context hashing and dedup key
    /// derivation, so two contexts that agree on the canonical subset are
    /// interchangeable to both services.
    ///
    /// # Example
    ///
    /// ```rust
    /// use qonduit::services::fingerprint::ConversationContext;
    ///
    /// let ctx = ConversationContext {
    ///     expertise_level: Some("expert".to_string()),
    ///     domain: Some("quantum".to_string()),
    ///     recent_topics: vec![
    ///         "gates".to_string(),
    ///         "qubits".to_string(),
    ///         "entanglement".to_string(),
    ///         "teleportation".to_string(),
    ///     ],
    ///     ..Default::default()
    /// };
    /// assert_eq!(
    ///     ctx.canonical_repr(),
    ///     "expert||quantum|qubits,entanglement,teleportation"
    /// );
    /// ```
    #[must_use]
    pub fn canonical_repr(&self) -> String {
        let start = self.recent_topics.len().saturating_sub(CANONICAL_TOPIC_COUNT);
        let topics = self.recent_topics[start..].join(",");

        format!(
            "{}|{}|{}|{topics}",
            self.expertise_level.as_deref().unwrap_or(""),
            self.preferred_style.as_deref().unwrap_or(""),
            self.domain.as_deref().unwrap_or("")
        )
    }
}

/// User and session identity attributed to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Stable user identifier.
    pub user_id: String,
    /// Session identifier, when one exists.
    pub session_id: Option<String>,
}

impl UserIdentity {
    /// Creates an identity with a user id only.
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: None,
        }
    }

    /// Builder method to attach a session id.
    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_fingerprint(timestamp: i64) -> RequestFingerprint {
        RequestFingerprint {
            content_hash: "c1".to_string(),
            semantic_hash: "s1".to_string(),
            context_hash: "x1".to_string(),
            user_hash: "u1".to_string(),
            timestamp,
        }
    }

    #[test]
    fn test_elapsed_ms() {
        let older = create_test_fingerprint(1_000);
        let newer = create_test_fingerprint(4_500);

        assert_eq!(older.elapsed_ms(&newer), 3_500);
        assert_eq!(newer.elapsed_ms(&older), -3_500);
    }

    #[test]
    fn test_canonical_repr_empty_context() {
        let ctx = ConversationContext::default();
        assert_eq!(ctx.canonical_repr(), "|||");
    }

    #[test]
    fn test_canonical_repr_truncates_to_recent_topics() {
        let ctx = ConversationContext {
            recent_topics: (1..=5).map(|i| format!("t{i}")).collect(),
            ..Default::default()
        };
        assert_eq!(ctx.canonical_repr(), "|||t3,t4,t5");
    }

    #[test]
    fn test_canonical_repr_fewer_topics_than_limit() {
        let ctx = ConversationContext {
            recent_topics: vec!["only".to_string()],
            ..Default::default()
        };
        assert_eq!(ctx.canonical_repr(), "|||only");
    }

    #[test]
    fn test_user_identity_builder() {
        let id = UserIdentity::new("user-1").with_session("sess-9");
        assert_eq!(id.user_id, "user-1");
        assert_eq!(id.session_id.as_deref(), Some("sess-9"));
    }

    #[test]
    fn test_fingerprint_serde_roundtrip() {
        let fp = create_test_fingerprint(42);
        let json = serde_json::to_string(&fp).unwrap();
        let back: RequestFingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(fp, back);
    }
}
