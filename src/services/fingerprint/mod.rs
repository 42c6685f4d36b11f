//! Request fingerprinting and similarity.
//!
//! This module derives comparable signatures from chat requests along four
//! dimensions and scores their similarity by exact-hash agreement:
//! 1. **Content**: polynomial hash of the normalized message
//! 2. **Semantic**: hash of the extracted concept tag set
//! 3. **Context**: hash of the canonical conversation-context subset
//! 4. **User**: hash of the user/session identity (opt-in)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        FingerprintEngine                         │
//! │                                                                  │
//! │  message ──► normalize ──┬─► content_hash ──────────┐            │
//! │                          └─► semantic_hash ─────────┤            │
//! │                              (memoized, LRU)        ├─► Request  │
//! │  context ──► canonical subset ──► content_hash ─────┤ Fingerprint│
//! │  identity ─► user hash / anonymous sentinel ────────┘            │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use qonduit::services::fingerprint::{FingerprintConfig, FingerprintEngine};
//!
//! let engine = FingerprintEngine::new(FingerprintConfig::default());
//! let first = engine.fingerprint("Explain quantum entanglement", None, None);
//! let second = engine.fingerprint("Could you explain quantum entanglement?", None, None);
//!
//! assert!(engine.are_similar(&first, &second));
//! ```

mod cache;
mod concepts;
mod config;
mod engine;
mod hash;
mod normalize;
mod types;

pub use concepts::extract_concepts;
pub use config::FingerprintConfig;
pub use engine::{ANONYMOUS_SENTINEL, FingerprintEngine, NO_CONTEXT_SENTINEL};
pub use hash::content_hash;
pub use normalize::{QUERY_TOKEN, normalize};
pub use types::{ConversationContext, RequestFingerprint, UserIdentity};
