//! Concept token extraction for semantic hashing.
//!
//! Reduces a normalized message to a sorted set of tagged concept tokens:
//! domain-vocabulary hits (`domain:`), action-verb hits (`action:`), and any
//! remaining token longer than four characters (`concept:`). Two messages
//! that ask for the same thing in different word orders or with different
//! filler produce the same tag set.

use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashSet};

/// Domain vocabulary recognized as `domain:` concepts.
static DOMAIN_VOCABULARY: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "quantum",
        "qubit",
        "qubits",
        "entanglement",
        "superposition",
        "decoherence",
        "interference",
        "teleportation",
        "annealing",
        "supremacy",
        "photon",
        "circuit",
        "gate",
        "algorithm",
        "grover",
        "shor",
        "measurement",
        "amplitude",
        "wavefunction",
        "coherence",
    ]
    .into_iter()
    .collect()
});

/// Action verbs recognized as `action:` concepts.
static ACTION_VERBS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "explain",
        "describe",
        "show",
        "tell",
        "help",
        "compare",
        "calculate",
        "compute",
        "simulate",
        "run",
        "create",
        "generate",
        "analyze",
        "define",
        "summarize",
        "list",
    ]
    .into_iter()
    .collect()
});

/// Minimum character count (exclusive) for a residual token to count as a
/// `concept:` hit.
const CONCEPT_MIN_CHARS: usize = 4;

/// Extracts the sorted, deduplicated concept tag set from normalized text.
///
/// Each whitespace-separated token is classified exactly once: domain
/// vocabulary wins over action verbs, which win over the residual length
/// rule. Tokens of four characters or fewer that match neither table are
/// dropped. Degenerate input (empty or all-short tokens) yields an empty
/// set, never an error.
///
/// # Example
///
/// ```rust
/// use qonduit::services::fingerprint::extract_concepts;
///
/// let tags = extract_concepts("query explain quantum entanglement now");
/// assert_eq!(
///     tags,
///     vec![
///         "action:explain".to_string(),
///         "concept:query".to_string(),
///         "domain:entanglement".to_string(),
///         "domain:quantum".to_string(),
///     ]
/// );
///
/// assert!(extract_concepts("a an it of").is_empty());
/// ```
#[must_use]
pub fn extract_concepts(normalized: &str) -> Vec<String> {
    let mut tags = BTreeSet::new();

    for token in normalized.split_whitespace() {
        if DOMAIN_VOCABULARY.contains(token) {
            tags.insert(format!("domain:{token}"));
        } else if ACTION_VERBS.contains(token) {
            tags.insert(format!("action:{token}"));
        } else if token.chars().count() > CONCEPT_MIN_CHARS {
            tags.insert(format!("concept:{token}"));
        }
    }

    tags.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("quantum qubit", &["domain:quantum", "domain:qubit"] ; "domain hits")]
    #[test_case("explain compare", &["action:compare", "action:explain"] ; "action hits")]
    #[test_case("telescope star", &["concept:telescope"] ; "residual below cutoff dropped")]
    #[test_case("a of the it this", &[] ; "all short residuals dropped")]
    #[test_case("quantum", &["domain:quantum"] ; "domain wins over length rule")]
    #[test_case("quantum quantum quantum", &["domain:quantum"] ; "duplicates collapse")]
    #[test_case("", &[] ; "empty input")]
    fn test_classification(input: &str, expected: &[&str]) {
        assert_eq!(extract_concepts(input), expected);
    }

    #[test]
    fn test_order_independent() {
        let a = extract_concepts("explain quantum entanglement");
        let b = extract_concepts("entanglement quantum explain");
        assert_eq!(a, b);
    }

    #[test]
    fn test_sorted_output() {
        let tags = extract_concepts("simulate quantum teleportation circuits");
        let mut sorted = tags.clone();
        sorted.sort();
        assert_eq!(tags, sorted);
    }
}
