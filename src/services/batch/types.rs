//! Batch scheduler data types and the persistence handler seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// Flush priority of a queued operation.
///
/// Each priority has its own flush threshold; a burst of high-priority
/// operations flushes long before a low-priority trickle would.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Flushes at the smallest threshold.
    High,
    /// Default priority.
    Normal,
    /// Flushes only at the largest threshold or on the debounce timer.
    Low,
}

impl Priority {
    /// Stable lowercase name, used for metric labels and serialization.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A queued, deferred persistence intent.
///
/// Owned by the scheduler's queue until flushed; removed from the queue at
/// flush time regardless of outcome. The scheduler never re-enqueues a
/// failed operation: `retry_count` is carried for callers that implement
/// their own retry policy via
/// [`BatchScheduler::enqueue_operation`](super::BatchScheduler::enqueue_operation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOperation {
    /// Unique operation id.
    pub id: String,
    /// Type name used to group operations at flush time.
    #[serde(rename = "type")]
    pub op_type: String,
    /// Opaque payload forwarded to the handler.
    pub payload: Value,
    /// Flush priority.
    pub priority: Priority,
    /// Enqueue time, Unix milliseconds.
    pub timestamp: i64,
    /// Caller-maintained retry counter; never incremented by the scheduler.
    #[serde(default)]
    pub retry_count: u32,
}

impl BatchOperation {
    /// Creates an operation with a fresh id and the current timestamp.
    #[must_use]
    pub fn new(op_type: impl Into<String>, payload: Value, priority: Priority) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            op_type: op_type.into(),
            payload,
            priority,
            timestamp: crate::current_timestamp_ms(),
            retry_count: 0,
        }
    }
}

/// Per-group result reported by a [`BatchHandler`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Operations the handler persisted.
    pub success: usize,
    /// Operations the handler could not persist.
    pub failed: usize,
}

impl BatchOutcome {
    /// Creates an outcome from counts.
    #[must_use]
    pub const fn new(success: usize, failed: usize) -> Self {
        Self { success, failed }
    }
}

/// Executes one flushed type-group against external persistence.
///
/// One handler serves every operation type; `op_type` names the group
/// being dispatched. Returning `Err` marks the whole group failed without
/// affecting sibling groups in the same flush.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use qonduit::services::batch::{BatchHandler, BatchOperation, BatchOutcome};
///
/// struct DbWriter { db: Database }
///
/// #[async_trait]
/// impl BatchHandler for DbWriter {
///     async fn execute(
///         &self,
///         op_type: &str,
///         operations: Vec<BatchOperation>,
///     ) -> qonduit::Result<BatchOutcome> {
///         let written = self.db.bulk_insert(op_type, &operations).await?;
///         Ok(BatchOutcome::new(written, operations.len() - written))
///     }
/// }
/// ```
#[async_trait]
pub trait BatchHandler: Send + Sync {
    /// Persists one type-group of operations, FIFO within the group.
    ///
    /// # Errors
    ///
    /// An error fails the entire group; the scheduler does not retry.
    async fn execute(&self, op_type: &str, operations: Vec<BatchOperation>)
    -> Result<BatchOutcome>;
}

/// Running scheduler counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    /// Operations currently queued.
    pub queued: usize,
    /// Operations reported persisted across all flushes.
    pub processed: u64,
    /// Operations reported failed across all flushes.
    pub failed: u64,
    /// Completed flush cycles.
    pub flushes: u64,
}
