//! Priority-aware write-behind queue with debounced flushing.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Instant;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::instrument;

use super::config::BatchConfig;
use super::types::{BatchHandler, BatchOperation, BatchOutcome, Priority, SchedulerStats};
use crate::{Error, Result};

/// Queue contents plus the acknowledgment channels awaiting them.
#[derive(Default)]
struct QueueState {
    /// Pending operations, FIFO.
    queue: VecDeque<BatchOperation>,
    /// Acknowledgment senders by operation id, resolved at flush time.
    acks: HashMap<String, oneshot::Sender<Result<()>>>,
}

/// Buffers persistence intents and flushes them in typed groups.
///
/// # How it works
///
/// 1. `enqueue` appends an operation and evaluates flush policy
/// 2. Crossing a per-priority threshold or the hard cap flushes
///    immediately; otherwise a single debounce timer is (re)armed
/// 3. `flush` drains up to the batch-size cap FIFO, partitions by type,
///    and dispatches every type-group concurrently to the handler
/// 4. A group's failure resolves that group's acknowledgments with an
///    error without affecting sibling groups
///
/// The scheduler never retries: a failed operation leaves the queue at
/// flush time, and re-enqueueing (with a bumped `retry_count`) is the
/// caller's decision via [`Self::enqueue_operation`].
///
/// # Thread Safety
///
/// Queue state sits behind a `Mutex` held only across queue operations,
/// never across an await, so operations enqueued from within a handler
/// while a flush is dispatching land in the queue and are picked up by the
/// post-flush re-schedule check.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use qonduit::services::batch::{BatchConfig, BatchScheduler, Priority};
///
/// let scheduler = BatchScheduler::new(BatchConfig::default(), Arc::new(writer));
/// scheduler.enqueue("capture", serde_json::json!({"text": "qubit counts"}), Priority::Normal)?;
///
/// // Teardown: drain whatever is still buffered
/// scheduler.shutdown().await;
/// ```
pub struct BatchScheduler {
    /// Thresholds, cap, and debounce settings.
    config: BatchConfig,
    /// Persistence seam; one handler serves every operation type.
    handler: Arc<dyn BatchHandler>,
    /// Queue and pending acknowledgments.
    state: Mutex<QueueState>,
    /// The single debounce timer; re-arming aborts the previous one.
    timer: Mutex<Option<JoinHandle<()>>>,
    /// Set by `shutdown`; closed schedulers reject new operations.
    closed: AtomicBool,
    /// Operations reported persisted across all flushes.
    processed: AtomicU64,
    /// Operations reported failed across all flushes.
    failed: AtomicU64,
    /// Completed flush cycles.
    flushes: AtomicU64,
    /// Self-reference handed to timer tasks so an abandoned scheduler is
    /// not kept alive by its own pending timer.
    weak: Weak<Self>,
}

impl BatchScheduler {
    /// Creates a scheduler from configuration and a persistence handler.
    #[must_use]
    pub fn new(config: BatchConfig, handler: Arc<dyn BatchHandler>) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            config,
            handler,
            state: Mutex::new(QueueState::default()),
            timer: Mutex::new(None),
            closed: AtomicBool::new(false),
            processed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
            weak: weak.clone(),
        })
    }

    /// Returns the scheduler's configuration.
    #[must_use]
    pub const fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Enqueues an operation and evaluates flush policy.
    ///
    /// Returns the new operation's id.
    ///
    /// # Errors
    ///
    /// Returns `Error::ServiceClosed` after `shutdown`.
    pub fn enqueue(
        &self,
        op_type: impl Into<String>,
        payload: serde_json::Value,
        priority: Priority,
    ) -> Result<String> {
        let operation = BatchOperation::new(op_type, payload, priority);
        let id = operation.id.clone();
        self.push(operation, None)?;
        Ok(id)
    }

    /// Enqueues an operation with a flush acknowledgment channel.
    ///
    /// The receiver resolves when the operation's flush settles: `Ok(())`
    /// for a group reported fully successful, an error otherwise. Dropping
    /// the receiver is harmless.
    ///
    /// # Errors
    ///
    /// Returns `Error::ServiceClosed` after `shutdown`.
    pub fn enqueue_with_ack(
        &self,
        op_type: impl Into<String>,
        payload: serde_json::Value,
        priority: Priority,
    ) -> Result<(String, oneshot::Receiver<Result<()>>)> {
        let operation = BatchOperation::new(op_type, payload, priority);
        let id = operation.id.clone();
        let (tx, rx) = oneshot::channel();
        self.push(operation, Some(tx))?;
        Ok((id, rx))
    }

    /// Enqueues a caller-built operation, preserving its id, timestamp,
    /// and `retry_count`.
    ///
    /// This is the re-enqueue seam for caller-side retry policies.
    ///
    /// # Errors
    ///
    /// Returns `Error::ServiceClosed` after `shutdown`.
    pub fn enqueue_operation(&self, operation: BatchOperation) -> Result<String> {
        let id = operation.id.clone();
        self.push(operation, None)?;
        Ok(id)
    }

    /// Appends to the queue, registers the optional ack, applies policy.
    fn push(
        &self,
        operation: BatchOperation,
        ack: Option<oneshot::Sender<Result<()>>>,
    ) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::ServiceClosed("batch scheduler".to_string()));
        }

        metrics::counter!("batch_enqueued_total", "priority" => operation.priority.as_str())
            .increment(1);

        {
            let mut state = self.lock_state();
            if let Some(tx) = ack {
                state.acks.insert(operation.id.clone(), tx);
            }
            tracing::trace!(
                op_type = %operation.op_type,
                priority = %operation.priority,
                queued = state.queue.len() + 1,
                "Operation enqueued"
            );
            state.queue.push_back(operation);
        }

        self.schedule_flush();
        Ok(())
    }

    /// Whether the queue has crossed a flush threshold.
    ///
    /// True when any priority's queued count reaches its threshold or the
    /// total queue size reaches the hard cap.
    #[must_use]
    pub fn should_flush(&self) -> bool {
        let state = self.lock_state();
        self.should_flush_locked(&state)
    }

    fn should_flush_locked(&self, state: &QueueState) -> bool {
        if state.queue.len() >= self.config.max_batch_size {
            return true;
        }

        let (mut high, mut normal, mut low) = (0_usize, 0_usize, 0_usize);
        for operation in &state.queue {
            match operation.priority {
                Priority::High => high += 1,
                Priority::Normal => normal += 1,
                Priority::Low => low += 1,
            }
        }

        high >= self.config.high_threshold
            || normal >= self.config.normal_threshold
            || low >= self.config.low_threshold
    }

    /// Flushes immediately if a threshold is crossed, otherwise (re)arms
    /// the debounce timer. Re-arming cancels the previous timer.
    ///
    /// No-op after `shutdown`.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule_flush(&self) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }

        if self.should_flush() {
            self.cancel_timer();
            let weak = self.weak.clone();
            tokio::spawn(async move {
                if let Some(scheduler) = weak.upgrade() {
                    scheduler.flush().await;
                }
            });
        } else {
            self.arm_debounce();
        }
    }

    /// Arms the debounce timer, aborting any previously pending one.
    fn arm_debounce(&self) {
        let debounce = self.config.debounce;
        let weak = self.weak.clone();

        let mut timer = self.lock_timer();
        if let Some(handle) = timer.take() {
            handle.abort();
        }
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if let Some(scheduler) = weak.upgrade() {
                scheduler.flush().await;
            }
        }));
    }

    /// Aborts the pending debounce timer, if any.
    fn cancel_timer(&self) {
        if let Some(handle) = self.lock_timer().take() {
            handle.abort();
        }
    }

    /// Flushes up to the batch-size cap of queued operations.
    ///
    /// Drains FIFO, partitions by type in first-seen order, dispatches
    /// every type-group concurrently, resolves acknowledgments, and
    /// re-schedules if the queue is still non-empty. Returns the aggregate
    /// outcome across groups.
    #[instrument(skip(self), fields(operation = "batch_flush"))]
    pub async fn flush(&self) -> BatchOutcome {
        let (operations, mut acks) = self.drain();
        if operations.is_empty() {
            return BatchOutcome::default();
        }

        let started = Instant::now();
        let drained = operations.len();

        // Partition by type, first-seen order, FIFO within each group
        let mut groups: Vec<(String, Vec<BatchOperation>)> = Vec::new();
        for operation in operations {
            match groups.iter_mut().find(|(name, _)| *name == operation.op_type) {
                Some((_, group)) => group.push(operation),
                None => groups.push((operation.op_type.clone(), vec![operation])),
            }
        }

        let dispatches = groups.into_iter().map(|(op_type, group)| {
            let handler = Arc::clone(&self.handler);
            async move {
                let ids: Vec<String> = group.iter().map(|op| op.id.clone()).collect();
                let outcome = handler.execute(&op_type, group).await;
                (op_type, ids, outcome)
            }
        });
        let settled = futures::future::join_all(dispatches).await;

        let mut aggregate = BatchOutcome::default();
        for (op_type, ids, outcome) in settled {
            match outcome {
                Ok(outcome) => {
                    aggregate.success += outcome.success;
                    aggregate.failed += outcome.failed;
                    metrics::counter!("batch_operations_flushed_total", "outcome" => "success")
                        .increment(outcome.success as u64);
                    metrics::counter!("batch_operations_flushed_total", "outcome" => "failed")
                        .increment(outcome.failed as u64);

                    // Partial failures cannot be attributed to individual
                    // operations, so the whole group acks conservatively
                    let ack_result = if outcome.failed == 0 {
                        Ok(())
                    } else {
                        Err(Error::OperationFailed {
                            operation: "batch_flush".to_string(),
                            cause: format!(
                                "{} of {} operations in group '{op_type}' failed",
                                outcome.failed,
                                ids.len()
                            ),
                        })
                    };
                    for id in &ids {
                        if let Some(tx) = acks.remove(id) {
                            let _ = tx.send(ack_result.clone());
                        }
                    }
                },
                Err(e) => {
                    aggregate.failed += ids.len();
                    metrics::counter!("batch_operations_flushed_total", "outcome" => "failed")
                        .increment(ids.len() as u64);
                    tracing::warn!(
                        op_type = %op_type,
                        operations = ids.len(),
                        error = %e,
                        "Batch group failed"
                    );
                    for id in &ids {
                        if let Some(tx) = acks.remove(id) {
                            let _ = tx.send(Err(Error::OperationFailed {
                                operation: "batch_flush".to_string(),
                                cause: e.to_string(),
                            }));
                        }
                    }
                },
            }
        }

        self.processed
            .fetch_add(aggregate.success as u64, Ordering::Relaxed);
        self.failed
            .fetch_add(aggregate.failed as u64, Ordering::Relaxed);
        self.flushes.fetch_add(1, Ordering::Relaxed);
        metrics::histogram!("batch_flush_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        tracing::debug!(
            drained,
            success = aggregate.success,
            failed = aggregate.failed,
            "Flush completed"
        );

        let residual = self.queue_len();
        if residual > 0 {
            tracing::debug!(residual, "Residual operations after flush");
            self.schedule_flush();
        }

        aggregate
    }

    /// Forces an immediate flush, cancelling any pending debounce timer.
    ///
    /// Callers invoke this when the consuming context is about to
    /// disappear and buffered writes must not wait out the debounce.
    pub async fn flush_now(&self) -> BatchOutcome {
        self.cancel_timer();
        self.flush().await
    }

    /// Drains the queue to empty and closes the scheduler.
    ///
    /// Subsequent `enqueue` calls return `Error::ServiceClosed`. Returns
    /// the aggregate outcome of the final drain.
    pub async fn shutdown(&self) -> BatchOutcome {
        self.closed.store(true, Ordering::SeqCst);
        self.cancel_timer();

        let mut total = BatchOutcome::default();
        while self.queue_len() > 0 {
            let outcome = self.flush().await;
            total.success += outcome.success;
            total.failed += outcome.failed;
        }

        tracing::info!(
            processed = total.success,
            failed = total.failed,
            "Batch scheduler shut down"
        );
        total
    }

    /// Running counters plus the current queue depth.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            queued: self.queue_len(),
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
        }
    }

    /// Removes up to `max_batch_size` operations FIFO, with their acks.
    fn drain(
        &self,
    ) -> (
        Vec<BatchOperation>,
        HashMap<String, oneshot::Sender<Result<()>>>,
    ) {
        let mut state = self.lock_state();
        let take = state.queue.len().min(self.config.max_batch_size);
        let operations: Vec<BatchOperation> = state.queue.drain(..take).collect();

        let mut acks = HashMap::new();
        for operation in &operations {
            if let Some(tx) = state.acks.remove(&operation.id) {
                acks.insert(operation.id.clone(), tx);
            }
        }
        (operations, acks)
    }

    fn queue_len(&self) -> usize {
        self.lock_state().queue.len()
    }

    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_timer(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for BatchScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScheduler")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    /// Records every dispatched group; configurable failure modes.
    #[derive(Default)]
    struct RecordingHandler {
        /// `(op_type, operation ids in dispatch order)` per group.
        groups: Mutex<Vec<(String, Vec<String>)>>,
        /// Retry counts observed across all dispatched operations.
        retry_counts: Mutex<Vec<u32>>,
        /// Types whose groups return `Err`.
        fail_types: Vec<String>,
        /// Types whose groups report one failed operation.
        partial_types: Vec<String>,
    }

    impl RecordingHandler {
        fn failing(types: &[&str]) -> Self {
            Self {
                fail_types: types.iter().map(ToString::to_string).collect(),
                ..Default::default()
            }
        }

        fn partial(types: &[&str]) -> Self {
            Self {
                partial_types: types.iter().map(ToString::to_string).collect(),
                ..Default::default()
            }
        }

        fn groups(&self) -> Vec<(String, Vec<String>)> {
            self.groups.lock().unwrap().clone()
        }

        fn group_count(&self) -> usize {
            self.groups.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl BatchHandler for RecordingHandler {
        async fn execute(
            &self,
            op_type: &str,
            operations: Vec<BatchOperation>,
        ) -> Result<BatchOutcome> {
            let ids = operations.iter().map(|op| op.id.clone()).collect();
            self.groups.lock().unwrap().push((op_type.to_string(), ids));
            self.retry_counts
                .lock()
                .unwrap()
                .extend(operations.iter().map(|op| op.retry_count));

            if self.fail_types.iter().any(|t| t == op_type) {
                return Err(Error::OperationFailed {
                    operation: "persist".to_string(),
                    cause: "backend rejected group".to_string(),
                });
            }
            if self.partial_types.iter().any(|t| t == op_type) {
                return Ok(BatchOutcome::new(operations.len() - 1, 1));
            }
            Ok(BatchOutcome::new(operations.len(), 0))
        }
    }

    /// Thresholds high enough that only explicit flushes trigger.
    fn quiet_config() -> BatchConfig {
        BatchConfig::default()
            .with_high_threshold(100)
            .with_normal_threshold(100)
            .with_low_threshold(100)
            .with_max_batch_size(100)
            .with_debounce(Duration::from_millis(200))
    }

    #[tokio::test(start_paused = true)]
    async fn test_high_threshold_flushes_without_debounce() {
        let handler = Arc::new(RecordingHandler::default());
        let config = quiet_config().with_high_threshold(5).with_debounce(Duration::from_secs(60));
        let scheduler = BatchScheduler::new(config, handler.clone());

        for i in 0..5 {
            scheduler
                .enqueue("capture", json!({"n": i}), Priority::High)
                .unwrap();
        }

        // Far less than the 60s debounce
        tokio::time::sleep(Duration::from_millis(10)).await;

        let groups = handler.groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].1.len(), 5);
        assert_eq!(scheduler.stats().processed, 5);
        assert_eq!(scheduler.stats().queued, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_below_threshold_waits_for_debounce() {
        let handler = Arc::new(RecordingHandler::default());
        let scheduler = BatchScheduler::new(quiet_config(), handler.clone());

        scheduler
            .enqueue("capture", json!({}), Priority::Normal)
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(handler.group_count(), 0);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(handler.group_count(), 1);
        assert_eq!(scheduler.stats().flushes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearming_resets_the_debounce_timer() {
        let handler = Arc::new(RecordingHandler::default());
        let scheduler = BatchScheduler::new(quiet_config(), handler.clone());

        scheduler.enqueue("capture", json!({"n": 1}), Priority::Normal).unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        scheduler.enqueue("capture", json!({"n": 2}), Priority::Normal).unwrap();

        // The first timer would have fired by now had re-arming not
        // cancelled it
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(handler.group_count(), 0);

        tokio::time::sleep(Duration::from_millis(150)).await;
        let groups = handler.groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].1.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hard_cap_flushes_any_priority() {
        let handler = Arc::new(RecordingHandler::default());
        let config = quiet_config()
            .with_max_batch_size(3)
            .with_debounce(Duration::from_secs(60));
        let scheduler = BatchScheduler::new(config, handler.clone());

        for i in 0..3 {
            scheduler
                .enqueue("capture", json!({"n": i}), Priority::Low)
                .unwrap();
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(handler.group_count(), 1);
        assert_eq!(scheduler.stats().processed, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_group_does_not_affect_siblings() {
        let handler = Arc::new(RecordingHandler::failing(&["metrics"]));
        let scheduler = BatchScheduler::new(quiet_config(), handler.clone());

        let (_, notes_a) = scheduler
            .enqueue_with_ack("notes", json!({"n": 1}), Priority::Normal)
            .unwrap();
        let (_, metrics_a) = scheduler
            .enqueue_with_ack("metrics", json!({"n": 2}), Priority::Normal)
            .unwrap();
        let (_, notes_b) = scheduler
            .enqueue_with_ack("notes", json!({"n": 3}), Priority::Normal)
            .unwrap();
        let (_, metrics_b) = scheduler
            .enqueue_with_ack("metrics", json!({"n": 4}), Priority::Normal)
            .unwrap();

        let outcome = scheduler.flush_now().await;
        assert_eq!(outcome, BatchOutcome::new(2, 2));

        assert!(notes_a.await.unwrap().is_ok());
        assert!(notes_b.await.unwrap().is_ok());
        assert!(metrics_a.await.unwrap().is_err());
        assert!(metrics_b.await.unwrap().is_err());

        let stats = scheduler.stats();
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.flushes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_group_failure_acks_conservatively() {
        let handler = Arc::new(RecordingHandler::partial(&["flaky"]));
        let scheduler = BatchScheduler::new(quiet_config(), handler.clone());

        let (_, ack_a) = scheduler
            .enqueue_with_ack("flaky", json!({"n": 1}), Priority::Normal)
            .unwrap();
        let (_, ack_b) = scheduler
            .enqueue_with_ack("flaky", json!({"n": 2}), Priority::Normal)
            .unwrap();

        let outcome = scheduler.flush_now().await;
        assert_eq!(outcome, BatchOutcome::new(1, 1));

        // Failure cannot be attributed, so both operations ack with an error
        assert!(ack_a.await.unwrap().is_err());
        assert!(ack_b.await.unwrap().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fifo_order_within_type_group() {
        let handler = Arc::new(RecordingHandler::default());
        let scheduler = BatchScheduler::new(quiet_config(), handler.clone());

        let ids: Vec<String> = (0..3)
            .map(|i| {
                scheduler
                    .enqueue("capture", json!({"n": i}), Priority::Normal)
                    .unwrap()
            })
            .collect();

        scheduler.flush_now().await;

        let groups = handler.groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].1, ids);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_drains_and_rejects_new_work() {
        let handler = Arc::new(RecordingHandler::default());
        let scheduler = BatchScheduler::new(quiet_config(), handler.clone());

        for i in 0..3 {
            scheduler
                .enqueue("capture", json!({"n": i}), Priority::Low)
                .unwrap();
        }

        let outcome = scheduler.shutdown().await;
        assert_eq!(outcome, BatchOutcome::new(3, 0));
        assert_eq!(scheduler.stats().queued, 0);

        let rejected = scheduler.enqueue("capture", json!({}), Priority::High);
        assert!(matches!(rejected, Err(Error::ServiceClosed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_count_passes_through_unchanged() {
        let handler = Arc::new(RecordingHandler::failing(&["capture"]));
        let scheduler = BatchScheduler::new(quiet_config(), handler.clone());

        let mut operation = BatchOperation::new("capture", json!({}), Priority::Normal);
        operation.retry_count = 2;
        scheduler.enqueue_operation(operation).unwrap();

        scheduler.flush_now().await;

        // The handler saw the caller's count; the failed operation was not
        // re-enqueued or bumped
        assert_eq!(*handler.retry_counts.lock().unwrap(), vec![2]);
        assert_eq!(scheduler.stats().queued, 0);
        assert_eq!(handler.group_count(), 1);
    }

    /// Enqueues a follow-up operation from inside its first dispatch.
    #[derive(Default)]
    struct ReentrantHandler {
        scheduler: Mutex<Option<Arc<BatchScheduler>>>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl BatchHandler for ReentrantHandler {
        async fn execute(
            &self,
            op_type: &str,
            operations: Vec<BatchOperation>,
        ) -> Result<BatchOutcome> {
            self.calls.lock().unwrap().push(op_type.to_string());
            if op_type == "initial" {
                let guard = self.scheduler.lock().unwrap();
                if let Some(scheduler) = guard.as_ref() {
                    scheduler
                        .enqueue("followup", json!({}), Priority::Normal)
                        .unwrap();
                }
            }
            Ok(BatchOutcome::new(operations.len(), 0))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_enqueue_during_flush_is_not_lost() {
        let handler = Arc::new(ReentrantHandler::default());
        let scheduler = BatchScheduler::new(quiet_config(), handler.clone());
        *handler.scheduler.lock().unwrap() = Some(scheduler.clone());

        scheduler.enqueue("initial", json!({}), Priority::Normal).unwrap();
        scheduler.flush_now().await;

        // The follow-up landed in the queue and the post-flush re-schedule
        // flushes it after the debounce
        assert_eq!(scheduler.stats().queued, 1);
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(*handler.calls.lock().unwrap(), vec!["initial", "followup"]);
        assert_eq!(scheduler.stats().queued, 0);
        assert_eq!(scheduler.stats().processed, 2);
    }
}
