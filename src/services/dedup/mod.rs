//! Request deduplication service.
//!
//! Coalesces concurrent identical requests onto a single in-flight
//! operation so the underlying work runs once per key. Keys derive from
//! the normalized message plus the canonical conversation context, either
//! as truncated prefixes or as a content digest.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   RequestDeduplicator                    │
//! │                                                          │
//! │  dedupe(message, context, factory)                       │
//! │       │                                                  │
//! │       ▼                                                  │
//! │  ┌───────────┐    hit    ┌──────────────────────────┐    │
//! │  │ derive_key├──────────►│ clone shared handle      │    │
//! │  └─────┬─────┘           │ (no new work starts)     │    │
//! │        │ miss            └──────────────────────────┘    │
//! │        ▼                                                 │
//! │  ┌──────────────────────────────────────────────────┐    │
//! │  │ spawn factory, register shared handle,           │    │
//! │  │ remove entry on settlement or TTL expiry         │    │
//! │  └──────────────────────────────────────────────────┘    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Failures propagate to every coalesced caller; cancellation is advisory
//! and removes bookkeeping without stopping the running operation.
//!
//! # Example
//!
//! ```rust,ignore
//! use qonduit::services::dedup::{DedupConfig, RequestDeduplicator};
//!
//! let dedup: RequestDeduplicator<String> = RequestDeduplicator::new(DedupConfig::default());
//! let reply = dedup
//!     .dedupe("what is superposition", None, || async {
//!         Ok("a linear combination of basis states".to_string())
//!     })
//!     .await?;
//! ```

mod config;
mod dispatcher;
mod key;

pub use config::DedupConfig;
pub use dispatcher::RequestDeduplicator;
pub use key::{KeyStrategy, derive_key};
