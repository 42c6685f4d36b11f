//! Property-based tests for the fingerprint engine.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Normalization is deterministic; filler words never survive it
//! - Casing, trailing whitespace, and punctuation never change a content hash
//! - Content hashes are compact lowercase base-36 strings
//! - Similarity is symmetric, bounded to `[0, 1]`, and reflexive
//! - Concept extraction is sorted, deduplicated, and drawn from the input

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use qonduit::services::fingerprint::{
    FingerprintConfig, FingerprintEngine, UserIdentity, extract_concepts, normalize,
};

proptest! {
    /// Property: normalization is deterministic.
    #[test]
    fn prop_normalize_deterministic(s in ".{0,200}") {
        prop_assert_eq!(normalize(&s), normalize(&s));
    }

    /// Property: politeness words and interrogatives never survive
    /// normalization as standalone tokens.
    #[test]
    fn prop_filler_tokens_never_survive(s in ".{0,200}") {
        const REMOVED: &[&str] = &[
            "please", "thanks", "kindly", "what", "how", "why", "when", "where",
            "which", "who", "can", "could", "would", "should", "is", "are",
            "do", "does",
        ];

        let normalized = normalize(&s);
        prop_assert!(
            normalized
                .split_whitespace()
                .all(|token| !REMOVED.contains(&token))
        );
    }

    /// Property: casing never affects the normalized form.
    #[test]
    fn prop_normalize_case_insensitive(s in "[a-zA-Z0-9 ?!.,]{0,200}") {
        prop_assert_eq!(normalize(&s), normalize(&s.to_uppercase()));
    }

    /// Property: normalized output never holds leading, trailing, or
    /// doubled whitespace.
    #[test]
    fn prop_normalize_collapses_whitespace(s in ".{0,200}") {
        let normalized = normalize(&s);
        prop_assert_eq!(normalized.trim(), normalized.as_str());
        prop_assert!(!normalized.contains("  "));
    }

    /// Property: surface punctuation and trailing whitespace never change
    /// the content hash.
    #[test]
    fn prop_surface_noise_preserves_content_hash(s in "[a-z]{1,20}( [a-z]{1,20}){0,10}") {
        let engine = FingerprintEngine::default();

        let plain = engine.fingerprint(&s, None, None);
        let noisy = engine.fingerprint(&format!("  {}!!!  ", s.to_uppercase()), None, None);

        prop_assert_eq!(plain.content_hash, noisy.content_hash);
        prop_assert_eq!(plain.semantic_hash, noisy.semantic_hash);
    }

    /// Property: a fingerprint is maximally similar to itself.
    #[test]
    fn prop_self_similarity_is_one(s in ".{1,200}", user_id in "[a-z0-9]{1,20}") {
        let engine = FingerprintEngine::default();
        let user = UserIdentity::new(user_id);

        let fp = engine.fingerprint(&s, None, Some(&user));
        let score = engine.similarity(&fp, &fp);

        prop_assert!((score - 1.0).abs() < f64::EPSILON);
    }

    /// Property: similarity is symmetric and bounded to `[0, 1]`.
    #[test]
    fn prop_similarity_symmetric_and_bounded(
        a in ".{0,200}",
        b in ".{0,200}",
        user_a in "[a-z0-9]{1,10}",
        user_b in "[a-z0-9]{1,10}"
    ) {
        let engine = FingerprintEngine::default();
        let fp_a = engine.fingerprint(&a, None, Some(&UserIdentity::new(user_a)));
        let fp_b = engine.fingerprint(&b, None, Some(&UserIdentity::new(user_b)));

        let forward = engine.similarity(&fp_a, &fp_b);
        let backward = engine.similarity(&fp_b, &fp_a);

        prop_assert!((0.0..=1.0).contains(&forward));
        prop_assert!((forward - backward).abs() < f64::EPSILON);
    }

    /// Property: zero configured weight sums score 0, never divide by zero.
    #[test]
    fn prop_zero_weights_score_zero(s in ".{0,100}") {
        let config = FingerprintConfig {
            content_weight: 0.0,
            semantic_weight: 0.0,
            user_weight: 0.0,
            ..FingerprintConfig::default()
        }
        .with_context_weight(0.0);
        let engine = FingerprintEngine::new(config);

        let fp = engine.fingerprint(&s, None, None);
        let score = engine.similarity(&fp, &fp);

        prop_assert!(score.abs() < f64::EPSILON);
    }

    /// Property: content hashes are short lowercase base-36 strings. A
    /// `u32` renders to at most seven base-36 digits.
    #[test]
    fn prop_content_hash_is_base36(s in ".{0,200}") {
        let engine = FingerprintEngine::default();
        let fp = engine.fingerprint(&s, None, None);

        prop_assert!((1..=7).contains(&fp.content_hash.len()));
        prop_assert!(
            fp.content_hash
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
        );
    }

    /// Property: concept tags are sorted, deduplicated, and each names a
    /// token present in the input.
    #[test]
    fn prop_concepts_sorted_unique_from_input(s in "[a-z]{1,12}( [a-z]{1,12}){0,15}") {
        let normalized = normalize(&s);
        let tags = extract_concepts(&normalized);

        let mut sorted = tags.clone();
        sorted.sort();
        sorted.dedup();
        prop_assert_eq!(&tags, &sorted);

        for tag in &tags {
            let token = tag.split(':').nth(1).expect("tag has kind:token shape");
            prop_assert!(normalized.split_whitespace().any(|t| t == token));
        }
    }
}
