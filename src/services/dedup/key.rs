//! Dedup key derivation.
//!
//! The dedup key is deliberately simpler than a fingerprint: a lightly
//! normalized message prefix joined with a context prefix. Prefix
//! truncation means two long requests sharing a prefix can coalesce; the
//! digest strategy exists for callers that cannot tolerate that.

use sha2::{Digest, Sha256};

use super::config::DedupConfig;
use crate::services::fingerprint::ConversationContext;

/// How the dedup key is derived from a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// Truncated prefixes of the normalized message and serialized
    /// context. Cheap and stable, but prefix collisions can coalesce two
    /// distinct long requests.
    TruncatedPrefix,
    /// SHA-256 digest over the full normalized message and serialized
    /// context. Collision-safe at the cost of hashing the whole input.
    ContentDigest,
}

/// Light normalization for key derivation.
///
/// Trim, lowercase, collapse whitespace. Deliberately not the fingerprint
/// pipeline: the key only needs to be stable across minor formatting
/// differences, not across paraphrase.
fn normalize_for_key(message: &str) -> String {
    message
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// First `max_chars` characters of a string, char-boundary safe.
fn prefix(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Derives the dedup key for a message/context pair.
///
/// Absent context contributes an empty context part. The same inputs
/// always derive the same key under the same configuration.
///
/// # Example
///
/// ```rust
/// use qonduit::services::dedup::{DedupConfig, derive_key};
///
/// let config = DedupConfig::default();
/// let a = derive_key("  What IS   entanglement? ", None, &config);
/// let b = derive_key("what is entanglement?", None, &config);
/// assert_eq!(a, b);
/// ```
#[must_use]
pub fn derive_key(
    message: &str,
    context: Option<&ConversationContext>,
    config: &DedupConfig,
) -> String {
    let normalized = normalize_for_key(message);
    let serialized = context.map(ConversationContext::canonical_repr).unwrap_or_default();

    match config.key_strategy {
        KeyStrategy::TruncatedPrefix => format!(
            "{}:{}",
            prefix(&normalized, config.message_prefix_chars),
            prefix(&serialized, config.context_prefix_chars)
        ),
        KeyStrategy::ContentDigest => {
            let mut hasher = Sha256::new();
            hasher.update(normalized.as_bytes());
            hasher.update(b"\n");
            hasher.update(serialized.as_bytes());
            hex::encode(hasher.finalize())
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatting_differences_share_key() {
        let config = DedupConfig::default();

        let a = derive_key("Explain  Entanglement", None, &config);
        let b = derive_key("  explain entanglement  ", None, &config);
        assert_eq!(a, b);
    }

    #[test]
    fn test_context_changes_key() {
        let config = DedupConfig::default();
        let ctx = ConversationContext {
            domain: Some("quantum".to_string()),
            ..Default::default()
        };

        let without = derive_key("explain entanglement", None, &config);
        let with = derive_key("explain entanglement", Some(&ctx), &config);
        assert_ne!(without, with);
    }

    #[test]
    fn test_truncated_prefix_coalesces_shared_prefixes() {
        let config = DedupConfig::default().with_message_prefix_chars(10);

        let a = derive_key("explain entanglement to a beginner", None, &config);
        let b = derive_key("explain entanglement like a textbook", None, &config);
        assert_eq!(a, b);
    }

    #[test]
    fn test_digest_distinguishes_shared_prefixes() {
        let config = DedupConfig::default()
            .with_message_prefix_chars(10)
            .with_key_strategy(KeyStrategy::ContentDigest);

        let a = derive_key("explain entanglement to a beginner", None, &config);
        let b = derive_key("explain entanglement like a textbook", None, &config);
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_truncation_is_char_boundary_safe() {
        let config = DedupConfig::default().with_message_prefix_chars(3);

        // Multi-byte characters near the cut point must not panic
        let key = derive_key("量子もつれを説明して", None, &config);
        assert!(key.starts_with("量子も"));
    }

    #[test]
    fn test_empty_message() {
        let config = DedupConfig::default();
        assert_eq!(derive_key("", None, &config), ":");
    }
}
