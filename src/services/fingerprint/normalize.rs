//! Message normalization for fingerprinting.
//!
//! Normalization makes hashing robust to surface-level phrasing: casing,
//! punctuation, filler politeness, and the particular interrogative used to
//! ask a question. Two messages that differ only in these ways normalize to
//! the same string and therefore hash identically.

use once_cell::sync::Lazy;
use regex::Regex;

/// Canonical replacement token for interrogative words.
///
/// "what is entanglement", "how is entanglement", and "why is entanglement"
/// all normalize onto the same token stream.
pub const QUERY_TOKEN: &str = "query";

/// Matches any character that is neither a word character nor whitespace.
static PUNCTUATION: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)] // Pattern is a compile-time literal
    Regex::new(r"[^\w\s]").expect("punctuation pattern is valid")
});

/// Matches politeness filler phrases, multi-word alternatives first so the
/// leftmost-first alternation prefers them.
static POLITENESS: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)] // Pattern is a compile-time literal
    Regex::new(r"\b(thank you|could you|would you|can you|please|thanks|kindly)\b")
        .expect("politeness pattern is valid")
});

/// Matches interrogative words to be replaced by [`QUERY_TOKEN`].
static INTERROGATIVES: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)] // Pattern is a compile-time literal
    Regex::new(r"\b(what|how|why|when|where|which|who|can|could|would|should|is|are|do|does)\b")
        .expect("interrogative pattern is valid")
});

/// Normalizes a message for hashing.
///
/// Steps, in order:
/// 1. Convert to lowercase
/// 2. Strip punctuation (anything neither word character nor whitespace)
/// 3. Remove politeness phrases (`please`, `thanks`, `could you`, ...)
/// 4. Replace interrogative words with the canonical [`QUERY_TOKEN`]
/// 5. Collapse whitespace runs to single spaces and trim
///
/// Deterministic and total: any input (including empty or pure-punctuation
/// strings) yields a valid output, possibly the empty string.
///
/// # Example
///
/// ```rust
/// use qonduit::services::fingerprint::normalize;
///
/// let a = normalize("Could you please explain QUANTUM entanglement?");
/// let b = normalize("explain quantum entanglement");
/// assert_eq!(a, b);
///
/// let c = normalize("What is superposition?");
/// let d = normalize("How is superposition?");
/// assert_eq!(c, d);
/// ```
#[must_use]
pub fn normalize(message: &str) -> String {
    let lowered = message.to_lowercase();
    let stripped = PUNCTUATION.replace_all(&lowered, "");
    let depolited = POLITENESS.replace_all(&stripped, " ");
    let canonical = INTERROGATIVES.replace_all(&depolited, QUERY_TOKEN);

    canonical.split_whitespace().collect::<Vec<_>>().join(" ")
}
