//! # Qonduit
//!
//! Resource-management core for interactive chat clients.
//!
//! Qonduit sits between a UI pipeline and its external network/persistence
//! collaborators and owns the concurrency coordination that layer needs:
//! request fingerprinting and similarity, in-flight request deduplication,
//! adaptive write batching, and a bounded pool of persistent duplex
//! connections.
//!
//! ## Features
//!
//! - Fingerprint engine: pure, deterministic request signatures with
//!   binary-match similarity scoring and supersession detection
//! - Deduplication dispatcher: coalesces concurrent identical requests onto
//!   one shared in-flight operation
//! - Adaptive batch scheduler: priority-aware write-behind queue with
//!   debounced, threshold-triggered flushes
//! - Connection pool manager: bounded, reference-counted duplex links with
//!   reconnection backoff, idle sweep, and heartbeat probing
//!
//! ## Example
//!
//! ```rust,ignore
//! use qonduit::{FingerprintEngine, RequestDeduplicator};
//! use qonduit::config::Config;
//!
//! let config = Config::from_env();
//! let engine = FingerprintEngine::new(config.fingerprint);
//! let dedup: RequestDeduplicator<String> = RequestDeduplicator::new(config.dedup);
//!
//! let fp = engine.fingerprint("what is quantum entanglement?", None, None);
//! let reply = dedup
//!     .dedupe("what is quantum entanglement?", None, || async {
//!         Ok("...".to_string())
//!     })
//!     .await?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
// multiple_crate_versions is inherently crate-level (detects duplicate transitive dependencies).
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod observability;
pub mod services;

// Re-exports for convenience
pub use config::Config;
pub use services::{
    BatchHandler, BatchOperation, BatchOutcome, BatchScheduler, Connection, ConnectionPool,
    Connector, ConversationContext, FingerprintEngine, PoolEvent, Priority, RequestDeduplicator,
    RequestFingerprint,
};

/// Error type for qonduit operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
/// The type is `Clone` because a single failed operation may have many
/// callers coalesced onto it, each of which receives the failure.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Empty endpoint, zero capacities, malformed caller input |
/// | `OperationFailed` | Wrapped caller operations fail, batch handlers fail, spawned tasks panic |
/// | `Timeout` | A connection attempt exceeds the configured connect timeout |
/// | `ConnectionFailed` | Transport open/reconnect fails, reconnection attempts exhausted |
/// | `ServiceClosed` | Using a scheduler or pool after `shutdown()` |
#[derive(Debug, Clone, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - An endpoint identifier is empty
    /// - A configured capacity or threshold is zero where it must not be
    /// - A batch operation type is empty
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - A caller-supplied operation factory's future returns an error
    /// - A batch handler reports a whole-group failure
    /// - A spawned task is cancelled or panics before settling
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// An operation exceeded its deadline.
    ///
    /// Raised when a connection attempt does not open within the configured
    /// connect timeout. The half-open attempt is discarded; no pool entry
    /// remains.
    #[error("operation '{operation}' timed out after {elapsed_ms}ms")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// Elapsed time before the deadline fired, in milliseconds.
        elapsed_ms: u64,
    },

    /// A connection could not be established or was lost permanently.
    ///
    /// Raised when:
    /// - The transport's `connect` returns an error
    /// - Reconnection attempts are exhausted for an existing link
    #[error("connection to '{endpoint}' failed: {cause}")]
    ConnectionFailed {
        /// The endpoint the connection was for.
        endpoint: String,
        /// The underlying cause.
        cause: String,
    },

    /// The service has been shut down.
    ///
    /// Raised when `enqueue` or `get_connection` is called after
    /// `shutdown()` completed on the owning service.
    #[error("service closed: {0}")]
    ServiceClosed(String),
}

/// Result type alias for qonduit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in milliseconds.
///
/// Centralized so every service stamps time the same way. Fingerprint
/// timestamps, dedup entry ages, and batch operation timestamps all use
/// this clock.
///
/// # Examples
///
/// ```rust
/// use qonduit::current_timestamp_ms;
///
/// let ts = current_timestamp_ms();
/// assert!(ts > 0);
/// ```
#[must_use]
pub fn current_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
