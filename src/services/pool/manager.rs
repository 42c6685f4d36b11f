//! Bounded connection pool with reconnection and health checking.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::instrument;

use super::config::PoolConfig;
use super::events::PoolEvent;
use super::link::{PooledLink, identity_key};
use super::transport::Connector;
use super::types::{LinkHealth, PoolStats};
use crate::{Error, Result};

/// Buffered capacity of the pool event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Manages a bounded set of persistent duplex links.
///
/// # How it works
///
/// 1. `get_connection` returns the pooled link for an endpoint identity,
///    dialing a new one (under the connect timeout) on first use
/// 2. At capacity, the least-recently-used link with no subscribers is
///    evicted; when every link has subscribers the pool transiently
///    exceeds its soft cap rather than rejecting the caller
/// 3. Transport failures schedule exponential-backoff reconnects; links
///    that exhaust their attempts are dropped and announced on the event
///    stream
/// 4. Background tasks sweep idle inactive links and probe open active
///    links, on their own intervals
///
/// Lifecycle notifications reach subscribers through a broadcast
/// [`PoolEvent`] stream; slow receivers observe lag rather than blocking
/// the pool.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use qonduit::services::pool::{ConnectionPool, PoolConfig};
///
/// let pool = ConnectionPool::new(PoolConfig::default(), Arc::new(dialer));
/// pool.start();
///
/// let link = pool.subscribe("wss://qpu.example", "dashboard", &["chat".into()]).await?;
/// link.send(b"{\"op\":\"hello\"}").await?;
/// ```
pub struct ConnectionPool {
    /// Capacity, timeout, and interval settings.
    config: PoolConfig,
    /// Transport seam used to dial links.
    connector: Arc<dyn Connector>,
    /// Pooled links by identity key.
    links: RwLock<HashMap<String, Arc<PooledLink>>>,
    /// Per-key dial guards so concurrent first requests for one identity
    /// open exactly one transport connection.
    connecting: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    /// Lifecycle event fan-out.
    events: broadcast::Sender<PoolEvent>,
    /// Idle sweep and heartbeat task handles.
    tasks: Mutex<Vec<JoinHandle<()>>>,
    /// Set by `shutdown`; a closed pool rejects new connections.
    closed: AtomicBool,
    /// Self-reference handed to background and reconnect tasks.
    weak: Weak<Self>,
}

impl ConnectionPool {
    /// Creates a pool from configuration and a transport connector.
    ///
    /// Background tasks are not running until [`Self::start`] is called.
    #[must_use]
    pub fn new(config: PoolConfig, connector: Arc<dyn Connector>) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new_cyclic(|weak| Self {
            config,
            connector,
            links: RwLock::new(HashMap::new()),
            connecting: Mutex::new(HashMap::new()),
            events,
            tasks: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            weak: weak.clone(),
        })
    }

    /// Returns the pool's configuration.
    #[must_use]
    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Subscribes to pool lifecycle events.
    ///
    /// Receivers that fall behind by more than the channel capacity
    /// observe `RecvError::Lagged` and continue from the newest events.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<PoolEvent> {
        self.events.subscribe()
    }

    /// Returns the pooled link for an endpoint identity, dialing on
    /// first use.
    ///
    /// An existing link is returned as-is, including one currently
    /// reconnecting; its sends fail until the transport is restored. A
    /// new dial runs under the configured connect timeout, and a timed
    /// out or failed dial leaves no entry in the pool.
    ///
    /// # Errors
    ///
    /// `Error::InvalidInput` for an empty endpoint,
    /// `Error::ServiceClosed` after shutdown, `Error::Timeout` when the
    /// dial exceeds the connect timeout, and `Error::ConnectionFailed`
    /// when the transport refuses the connection.
    #[instrument(
        skip(self, protocols),
        fields(operation = "get_connection", endpoint = %endpoint)
    )]
    pub async fn get_connection(
        &self,
        endpoint: &str,
        protocols: &[String],
    ) -> Result<Arc<PooledLink>> {
        if endpoint.is_empty() {
            return Err(Error::InvalidInput("endpoint must not be empty".to_string()));
        }
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::ServiceClosed("connection pool".to_string()));
        }

        let key = identity_key(endpoint, protocols);

        if let Some(link) = self.lookup(&key) {
            link.touch();
            tracing::trace!(key = %key, "Reusing pooled link");
            return Ok(link);
        }

        let guard = self.connect_guard(&key);
        let _permit = guard.lock().await;

        // Another caller may have dialed while we waited for the guard
        if let Some(link) = self.lookup(&key) {
            link.touch();
            self.release_connect_guard(&key);
            return Ok(link);
        }

        self.evict_for_capacity();

        let dialed = tokio::time::timeout(
            self.config.connect_timeout,
            self.connector.connect(endpoint, protocols),
        )
        .await;

        let connection = match dialed {
            Ok(Ok(connection)) => connection,
            Ok(Err(e)) => {
                self.release_connect_guard(&key);
                metrics::counter!("pool_connects_total", "outcome" => "error").increment(1);
                tracing::warn!(endpoint = %endpoint, error = %e, "Connect failed");
                return Err(Error::ConnectionFailed {
                    endpoint: endpoint.to_string(),
                    cause: e.to_string(),
                });
            },
            Err(_) => {
                self.release_connect_guard(&key);
                metrics::counter!("pool_connects_total", "outcome" => "timeout").increment(1);
                let elapsed_ms =
                    u64::try_from(self.config.connect_timeout.as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(endpoint = %endpoint, elapsed_ms, "Connect timed out");
                return Err(Error::Timeout {
                    operation: "connect".to_string(),
                    elapsed_ms,
                });
            },
        };

        let link = Arc::new(PooledLink::new(endpoint, protocols.to_vec(), connection));
        let size = {
            let mut links = self.write_links();
            if let Some(previous) = links.insert(key.clone(), Arc::clone(&link)) {
                tokio::spawn(async move { previous.close().await });
            }
            links.len()
        };
        self.release_connect_guard(&key);

        metrics::counter!("pool_connects_total", "outcome" => "success").increment(1);
        #[allow(clippy::cast_precision_loss)]
        metrics::gauge!("pool_connections").set(size as f64);
        tracing::info!(endpoint = %endpoint, pool_size = size, "Connection opened");
        self.publish(PoolEvent::Connected { key });

        Ok(link)
    }

    /// Adds a subscriber to an endpoint's link, dialing it on first use.
    ///
    /// A link with at least one subscriber is never evicted or swept.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::get_connection`].
    pub async fn subscribe(
        &self,
        endpoint: &str,
        subscriber_id: &str,
        protocols: &[String],
    ) -> Result<Arc<PooledLink>> {
        let link = self.get_connection(endpoint, protocols).await?;
        if link.add_subscriber(subscriber_id) {
            tracing::debug!(
                key = %link.key(),
                subscriber_id = %subscriber_id,
                subscribers = link.subscriber_count(),
                "Subscriber added"
            );
        }
        Ok(link)
    }

    /// Removes a subscriber from an endpoint's link.
    ///
    /// Returns whether the subscriber was present. A link whose
    /// subscriber set empties becomes eviction-eligible but stays pooled
    /// until capacity pressure or the idle sweep removes it.
    pub fn unsubscribe(&self, endpoint: &str, subscriber_id: &str, protocols: &[String]) -> bool {
        let key = identity_key(endpoint, protocols);
        let Some(link) = self.lookup(&key) else {
            return false;
        };

        let removed = link.remove_subscriber(subscriber_id);
        if removed {
            tracing::debug!(
                key = %key,
                subscriber_id = %subscriber_id,
                subscribers = link.subscriber_count(),
                "Subscriber removed"
            );
        }
        removed
    }

    /// Reports a transport failure on an endpoint's link.
    ///
    /// Enters the same reconnection path as a failed heartbeat probe:
    /// schedules an exponential-backoff reconnect, or drops the link once
    /// attempts are exhausted. Unknown identities are ignored.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn report_failure(&self, endpoint: &str, protocols: &[String], reason: &str) {
        let key = identity_key(endpoint, protocols);
        let Some(link) = self.lookup(&key) else {
            tracing::debug!(key = %key, "Failure reported for unknown link");
            return;
        };
        self.fail_link(&key, &link, reason);
    }

    /// Spawns the idle sweep and heartbeat background tasks.
    ///
    /// Idempotent; a second call while tasks are running is a no-op.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        let mut tasks = self.lock_tasks();
        if !tasks.is_empty() {
            return;
        }

        let weak = self.weak.clone();
        let sweep_interval = self.config.sweep_interval;
        tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(pool) = weak.upgrade() else { return };
                if pool.closed.load(Ordering::SeqCst) {
                    return;
                }
                pool.sweep_idle();
            }
        }));

        let weak = self.weak.clone();
        let heartbeat_interval = self.config.heartbeat_interval;
        tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(heartbeat_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(pool) = weak.upgrade() else { return };
                if pool.closed.load(Ordering::SeqCst) {
                    return;
                }
                pool.heartbeat_pass().await;
            }
        }));

        tracing::info!(
            sweep_interval_ms = u64::try_from(sweep_interval.as_millis()).unwrap_or(u64::MAX),
            heartbeat_interval_ms =
                u64::try_from(heartbeat_interval.as_millis()).unwrap_or(u64::MAX),
            "Connection pool background tasks started"
        );
    }

    /// Point-in-time view of the pool.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let links = self.read_links();
        let connections: Vec<_> = links.values().map(|link| link.snapshot()).collect();
        let approx_memory_bytes = links
            .values()
            .map(|link| link.approx_memory_bytes())
            .sum();
        drop(links);

        let active = connections.iter().filter(|snap| snap.subscribers > 0).count();
        PoolStats {
            total: connections.len(),
            active,
            connections,
            approx_memory_bytes,
        }
    }

    /// Closes every link, aborts background tasks, and rejects further
    /// connections.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        for task in self.lock_tasks().drain(..) {
            task.abort();
        }

        let drained: Vec<Arc<PooledLink>> = {
            let mut links = self.write_links();
            links.drain().map(|(_, link)| link).collect()
        };
        let count = drained.len();
        for link in drained {
            link.set_health(LinkHealth::Failed);
            link.close().await;
        }

        metrics::gauge!("pool_connections").set(0.0);
        tracing::info!(closed = count, "Connection pool shut down");
    }

    /// Evicts least-recently-used inactive links until under capacity.
    ///
    /// When every pooled link has subscribers, nothing is evictable and
    /// the pool transiently exceeds its soft cap.
    fn evict_for_capacity(&self) {
        loop {
            let evicted = {
                let mut links = self.write_links();
                if links.len() < self.config.max_connections {
                    return;
                }
                let candidate = links
                    .iter()
                    .filter(|(_, link)| !link.is_active())
                    .min_by_key(|(_, link)| link.last_used_instant())
                    .map(|(key, _)| key.clone());
                let Some(key) = candidate else {
                    tracing::debug!(
                        pool_size = links.len(),
                        "Pool at capacity with every link subscribed; allowing overflow"
                    );
                    return;
                };
                let removed = links.remove_entry(&key);
                #[allow(clippy::cast_precision_loss)]
                metrics::gauge!("pool_connections").set(links.len() as f64);
                removed
            };

            if let Some((key, link)) = evicted {
                metrics::counter!("pool_evictions_total").increment(1);
                tracing::debug!(
                    key = %key,
                    idle_ms = u64::try_from(link.idle_for().as_millis()).unwrap_or(u64::MAX),
                    "Evicted least-recently-used link"
                );
                self.publish(PoolEvent::Evicted { key });
                tokio::spawn(async move { link.close().await });
            }
        }
    }

    /// Removes inactive links idle past the configured timeout.
    fn sweep_idle(&self) {
        let idle_timeout = self.config.idle_timeout;
        let swept: Vec<(String, Arc<PooledLink>)> = {
            let mut links = self.write_links();
            let stale: Vec<String> = links
                .iter()
                .filter(|(_, link)| !link.is_active() && link.idle_for() > idle_timeout)
                .map(|(key, _)| key.clone())
                .collect();
            let swept = stale
                .into_iter()
                .filter_map(|key| links.remove_entry(&key))
                .collect();
            #[allow(clippy::cast_precision_loss)]
            metrics::gauge!("pool_connections").set(links.len() as f64);
            swept
        };

        for (key, link) in swept {
            metrics::counter!("pool_evictions_total").increment(1);
            tracing::debug!(key = %key, "Swept idle link");
            self.publish(PoolEvent::Evicted { key });
            tokio::spawn(async move { link.close().await });
        }
    }

    /// Probes every open, active link; failures enter the reconnect path.
    async fn heartbeat_pass(&self) {
        let targets: Vec<(String, Arc<PooledLink>)> = self
            .read_links()
            .iter()
            .filter(|(_, link)| link.is_active() && link.health() == LinkHealth::Open)
            .map(|(key, link)| (key.clone(), Arc::clone(link)))
            .collect();

        for (key, link) in targets {
            if let Err(e) = link.ping().await {
                metrics::counter!("pool_heartbeat_failures_total").increment(1);
                tracing::warn!(key = %key, error = %e, "Heartbeat probe failed");
                self.fail_link(&key, &link, &format!("heartbeat failed: {e}"));
            }
        }
    }

    /// Advances a link down the failure path: schedule a backoff
    /// reconnect, or drop the link once attempts are exhausted.
    fn fail_link(&self, key: &str, link: &Arc<PooledLink>, reason: &str) {
        let attempt = link.bump_reconnect_attempts();

        if attempt <= self.config.max_reconnect_attempts {
            link.set_health(LinkHealth::Reconnecting { attempt });
            let delay = self.backoff_delay(attempt);
            tracing::warn!(
                key = %key,
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                reason = %reason,
                "Transport failed; reconnect scheduled"
            );
            self.publish(PoolEvent::Reconnecting {
                key: key.to_string(),
                attempt,
            });

            let weak = self.weak.clone();
            let key = key.to_string();
            let link = Arc::clone(link);
            tokio::spawn(async move {
                // Drop the broken transport before waiting out the backoff
                if let Some(broken) = link.replace_connection(None).await {
                    broken.close().await;
                }
                tokio::time::sleep(delay).await;
                if let Some(pool) = weak.upgrade() {
                    pool.attempt_reconnect(&key, &link).await;
                }
            });
        } else {
            link.set_health(LinkHealth::Failed);
            metrics::counter!("pool_reconnects_total", "outcome" => "exhausted").increment(1);
            tracing::error!(
                key = %key,
                attempts = attempt - 1,
                reason = %reason,
                "Reconnect attempts exhausted; dropping link"
            );

            {
                let mut links = self.write_links();
                if links
                    .get(key)
                    .is_some_and(|current| Arc::ptr_eq(current, link))
                {
                    links.remove(key);
                }
                #[allow(clippy::cast_precision_loss)]
                metrics::gauge!("pool_connections").set(links.len() as f64);
            }
            self.publish(PoolEvent::ConnectionLost {
                key: key.to_string(),
                reason: reason.to_string(),
            });

            let link = Arc::clone(link);
            tokio::spawn(async move { link.close().await });
        }
    }

    /// One reconnect attempt after its backoff delay has elapsed.
    async fn attempt_reconnect(&self, key: &str, link: &Arc<PooledLink>) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        // The link may have been evicted or replaced while backing off,
        // or healed by a competing reconnect
        let still_pooled = self
            .read_links()
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, link));
        if !still_pooled || link.health() == LinkHealth::Open {
            return;
        }

        tracing::debug!(key = %key, attempt = link.reconnect_attempts(), "Attempting reconnect");
        let dialed = tokio::time::timeout(
            self.config.connect_timeout,
            self.connector.connect(link.endpoint(), link.protocols()),
        )
        .await;

        match dialed {
            Ok(Ok(connection)) => {
                if let Some(stale) = link.replace_connection(Some(connection)).await {
                    tokio::spawn(async move { stale.close().await });
                }
                link.reset_reconnect_attempts();
                link.set_health(LinkHealth::Open);
                link.touch();
                metrics::counter!("pool_reconnects_total", "outcome" => "success").increment(1);
                tracing::info!(key = %key, "Reconnected");
                self.publish(PoolEvent::Connected {
                    key: key.to_string(),
                });
            },
            Ok(Err(e)) => {
                metrics::counter!("pool_reconnects_total", "outcome" => "failed").increment(1);
                self.fail_link(key, link, &e.to_string());
            },
            Err(_) => {
                metrics::counter!("pool_reconnects_total", "outcome" => "failed").increment(1);
                self.fail_link(key, link, "connect timed out");
            },
        }
    }

    /// Exponential reconnect delay for an attempt number, optionally
    /// clamped by `max_backoff`.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let seconds = 1_u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let delay = Duration::from_secs(seconds);
        self.config.max_backoff.map_or(delay, |cap| delay.min(cap))
    }

    fn lookup(&self, key: &str) -> Option<Arc<PooledLink>> {
        self.read_links().get(key).cloned()
    }

    fn connect_guard(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut connecting = self
            .connecting
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            connecting
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        )
    }

    fn release_connect_guard(&self, key: &str) {
        self.connecting
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    fn publish(&self, event: PoolEvent) {
        let _ = self.events.send(event);
    }

    fn read_links(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<PooledLink>>> {
        self.links.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_links(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<PooledLink>>> {
        self.links.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_tasks(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("config", &self.config)
            .field("size", &self.read_links().len())
            .finish_non_exhaustive()
    }
}
