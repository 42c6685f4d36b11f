//! Semantic-hash memoization cache.
//!
//! Concept extraction and hashing are recomputed for every message; the
//! memo cache short-circuits that work for repeated normalized texts. The
//! cache is LRU-bounded by entry count so long sessions cannot grow it
//! without limit.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::RwLock;

/// LRU memoization cache mapping normalized text to its semantic hash.
///
/// # Thread Safety
///
/// Uses `RwLock` for interior mutability. Lookups take the write lock
/// because a hit promotes the entry's recency.
///
/// # Lock Poisoning
///
/// Handled with fail-open semantics: a poisoned lock makes lookups miss
/// and stores skip. Memoization is a performance optimization; recomputing
/// a hash is always safe.
pub struct SemanticMemoCache {
    /// LRU cache mapping normalized text to semantic hash.
    cache: RwLock<LruCache<String, String>>,
}

impl SemanticMemoCache {
    /// Creates a new memo cache.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of memoized texts
    ///
    /// # Panics
    ///
    /// Panics if capacity is 0.
    #[must_use]
    #[allow(clippy::expect_used)] // Documented panic for invalid input
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).expect("capacity must be > 0");
        Self {
            cache: RwLock::new(LruCache::new(cap)),
        }
    }

    /// Looks up the memoized hash for a normalized text.
    ///
    /// A hit promotes the entry to most-recently-used.
    #[must_use]
    pub fn get(&self, normalized: &str) -> Option<String> {
        let result = {
            let mut cache = self.cache.write().ok()?;
            cache.get(normalized).cloned()
        };

        let outcome = if result.is_some() { "hit" } else { "miss" };
        metrics::counter!("fingerprint_semantic_cache_total", "result" => outcome).increment(1);

        result
    }

    /// Stores a computed hash, evicting the least-recently-used entry when
    /// at capacity.
    pub fn put(&self, normalized: String, hash: String) {
        if let Ok(mut cache) = self.cache.write() {
            cache.put(normalized, hash);

            #[allow(clippy::cast_precision_loss)]
            metrics::gauge!("fingerprint_semantic_cache_size").set(cache.len() as f64);
        }
    }

    /// Returns the current number of memoized entries.
    #[cfg(test)]
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Returns true if the cache is empty.
    #[cfg(test)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
