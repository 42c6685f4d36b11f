//! In-flight request deduplication.

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::instrument;

use super::config::DedupConfig;
use super::key::derive_key;
use crate::services::fingerprint::ConversationContext;
use crate::{Error, Result};

/// Shared handle to an in-flight operation's eventual result.
type SharedHandle<T> = Shared<BoxFuture<'static, Result<T>>>;

/// Bookkeeping for one in-flight operation.
struct PendingEntry<T: Clone> {
    /// Shared result handle every coalesced caller awaits.
    handle: SharedHandle<T>,
    /// When the operation started.
    created_at: Instant,
    /// Distinguishes this entry from later entries under the same key, so
    /// a settling operation never removes a successor's bookkeeping.
    generation: u64,
}

/// Coalesces concurrent identical requests onto one in-flight operation.
///
/// # How it works
///
/// 1. `dedupe` derives a string key from the message and context
/// 2. If a live, non-expired entry exists for the key, the caller receives
///    a clone of the existing result handle; no new work starts
/// 3. Otherwise the operation factory runs as a spawned task; its shared
///    handle is stored until the operation settles
/// 4. Settlement (success or failure) removes the bookkeeping entry before
///    any caller observes the result; entries older than the TTL are
///    purged lazily on the next lookup
///
/// The wrapped operation is a spawned task, so it runs to completion even
/// if every awaiting caller is dropped; `cancel` is advisory and removes
/// bookkeeping only.
///
/// # Thread Safety
///
/// The pending map sits behind a `Mutex` held only across map operations,
/// never across an await. Lock poisoning is handled by continuing with the
/// inner state: the map stays usable after a panicking caller.
///
/// # Example
///
/// ```rust,ignore
/// use qonduit::services::dedup::{DedupConfig, RequestDeduplicator};
///
/// let dedup: RequestDeduplicator<String> = RequestDeduplicator::new(DedupConfig::default());
///
/// // Both calls resolve from one underlying request
/// let (a, b) = tokio::join!(
///     dedup.dedupe("what is entanglement", None, || fetch_reply()),
///     dedup.dedupe("what is entanglement", None, || fetch_reply()),
/// );
/// ```
pub struct RequestDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// TTL and key derivation settings.
    config: DedupConfig,
    /// Pending operations by derived key.
    pending: Arc<Mutex<HashMap<String, PendingEntry<T>>>>,
    /// Monotonic generation counter for entry identity.
    generation: AtomicU64,
}

impl<T> RequestDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a dispatcher from configuration.
    #[must_use]
    pub fn new(config: DedupConfig) -> Self {
        Self {
            config,
            pending: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    /// Returns the dispatcher's configuration.
    #[must_use]
    pub const fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Runs an operation, coalescing onto an identical in-flight one.
    ///
    /// If a live entry exists for the derived key, this call awaits the
    /// existing operation's shared handle and the factory is never
    /// invoked. Otherwise the factory's future is spawned and registered;
    /// every caller that coalesces onto it receives a clone of the settled
    /// result, including failures.
    ///
    /// # Errors
    ///
    /// Returns the wrapped operation's error, or `Error::OperationFailed`
    /// if the spawned task was cancelled or panicked before settling.
    #[instrument(
        skip(self, message, context, factory),
        fields(operation = "dedupe", message_length = message.len())
    )]
    pub async fn dedupe<F, Fut>(
        &self,
        message: &str,
        context: Option<&ConversationContext>,
        factory: F,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let key = derive_key(message, context, &self.config);
        let handle = self.join_or_start(&key, factory);
        handle.await
    }

    /// Returns the live entry's handle for `key`, or starts the operation.
    fn join_or_start<F, Fut>(&self, key: &str, factory: F) -> SharedHandle<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let mut pending = self.lock_pending();

        if let Some(entry) = pending.get(key) {
            if entry.created_at.elapsed() <= self.config.ttl {
                metrics::counter!("dedup_requests_total", "outcome" => "coalesced").increment(1);
                tracing::debug!(pending = pending.len(), "Coalesced onto in-flight operation");
                return entry.handle.clone();
            }
            // Expired while still registered; purge before starting anew
            pending.remove(key);
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let task = tokio::spawn(factory());

        let handle = {
            let pending_map = Arc::clone(&self.pending);
            let key = key.to_string();
            async move {
                let result = match task.await {
                    Ok(result) => result,
                    Err(e) => Err(Error::OperationFailed {
                        operation: "dedupe".to_string(),
                        cause: format!("operation task did not settle: {e}"),
                    }),
                };

                // Finally-style cleanup: the entry is gone before any
                // caller observes the settled result
                let mut map = pending_map
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                if map.get(&key).is_some_and(|entry| entry.generation == generation) {
                    map.remove(&key);
                    #[allow(clippy::cast_precision_loss)]
                    metrics::gauge!("dedup_pending_entries").set(map.len() as f64);
                }

                result
            }
            .boxed()
            .shared()
        };

        pending.insert(
            key.to_string(),
            PendingEntry {
                handle: handle.clone(),
                created_at: Instant::now(),
                generation,
            },
        );

        metrics::counter!("dedup_requests_total", "outcome" => "started").increment(1);
        #[allow(clippy::cast_precision_loss)]
        metrics::gauge!("dedup_pending_entries").set(pending.len() as f64);
        drop(pending);

        // Detached driver: the operation settles and cleans up even if
        // every caller drops its await before completion
        tokio::spawn(handle.clone());

        handle
    }

    /// Whether a live, non-expired operation is pending for these inputs.
    ///
    /// An expired entry found here is purged before answering.
    #[must_use]
    pub fn is_pending(&self, message: &str, context: Option<&ConversationContext>) -> bool {
        let key = derive_key(message, context, &self.config);
        let mut pending = self.lock_pending();

        match pending.get(&key) {
            Some(entry) if entry.created_at.elapsed() <= self.config.ttl => true,
            Some(_) => {
                pending.remove(&key);
                #[allow(clippy::cast_precision_loss)]
                metrics::gauge!("dedup_pending_entries").set(pending.len() as f64);
                false
            },
            None => false,
        }
    }

    /// Removes the bookkeeping entry for these inputs, if one exists.
    ///
    /// Advisory only: the underlying operation keeps running and callers
    /// already sharing its handle still receive its result. The next
    /// `dedupe` for the same inputs starts fresh work.
    ///
    /// Returns whether an entry was removed.
    pub fn cancel(&self, message: &str, context: Option<&ConversationContext>) -> bool {
        let key = derive_key(message, context, &self.config);
        let mut pending = self.lock_pending();

        let removed = pending.remove(&key).is_some();
        if removed {
            metrics::counter!("dedup_cancellations_total").increment(1);
            #[allow(clippy::cast_precision_loss)]
            metrics::gauge!("dedup_pending_entries").set(pending.len() as f64);
            tracing::debug!(pending = pending.len(), "Cancelled pending entry");
        }
        removed
    }

    /// Current pending-entry count.
    ///
    /// Includes entries past their TTL that no lookup has purged yet.
    #[must_use]
    pub fn count(&self) -> usize {
        self.lock_pending().len()
    }

    /// Removes every expired entry, returning how many were purged.
    pub fn purge_expired(&self) -> usize {
        let mut pending = self.lock_pending();
        let before = pending.len();
        pending.retain(|_, entry| entry.created_at.elapsed() <= self.config.ttl);
        let purged = before - pending.len();

        if purged > 0 {
            #[allow(clippy::cast_precision_loss)]
            metrics::gauge!("dedup_pending_entries").set(pending.len() as f64);
            tracing::debug!(purged, "Purged expired pending entries");
        }
        purged
    }

    /// Locks the pending map, continuing with inner state if poisoned.
    fn lock_pending(&self) -> std::sync::MutexGuard<'_, HashMap<String, PendingEntry<T>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for RequestDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(DedupConfig::default())
    }
}
