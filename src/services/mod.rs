//! Resource-management services.
//!
//! Each service owns one concurrency concern: fingerprinting computes
//! request signatures, dedup coalesces identical in-flight requests,
//! batch schedules write-behind flushes, and pool manages persistent
//! duplex connections.

pub mod batch;
pub mod dedup;
pub mod fingerprint;
pub mod pool;

pub use batch::{
    BatchConfig, BatchHandler, BatchOperation, BatchOutcome, BatchScheduler, Priority,
    SchedulerStats,
};
pub use dedup::{DedupConfig, KeyStrategy, RequestDeduplicator};
pub use fingerprint::{
    ConversationContext, FingerprintConfig, FingerprintEngine, RequestFingerprint, UserIdentity,
};
pub use pool::{
    Connection, ConnectionPool, Connector, LinkHealth, LinkSnapshot, PoolConfig, PoolEvent,
    PoolStats, PooledLink,
};
