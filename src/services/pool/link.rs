//! A single pooled duplex link with health and usage tracking.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use tokio::sync::Mutex as AsyncMutex;

use super::transport::Connection;
use super::types::{LinkHealth, LinkSnapshot};
use crate::{Error, Result};

/// Bookkeeping overhead attributed to one link in memory estimates,
/// excluding string contents and the transport's own allocations.
const LINK_BASE_MEMORY_BYTES: usize = 256;

/// Builds the pool identity for an endpoint/protocols pair.
pub(crate) fn identity_key(endpoint: &str, protocols: &[String]) -> String {
    format!("{endpoint}|{}", protocols.join(","))
}

/// A reference-counted persistent duplex connection.
///
/// The transport connection sits behind an async mutex and is `None`
/// while the link is reconnecting; sends during that window fail without
/// blocking. A link is "active" while its subscriber set is non-empty,
/// and only inactive links are ever evicted or swept.
pub struct PooledLink {
    /// Pool identity: endpoint plus protocol list.
    key: String,
    /// Endpoint this link dials.
    endpoint: String,
    /// Protocols this link speaks.
    protocols: Vec<String>,
    /// Live transport, `None` while reconnecting or after close.
    connection: AsyncMutex<Option<Box<dyn Connection>>>,
    /// Current health.
    health: Mutex<LinkHealth>,
    /// Last successful use, for idle tracking and LRU eviction.
    last_used: Mutex<Instant>,
    /// Subscriber ids holding this link active.
    subscribers: Mutex<HashSet<String>>,
    /// Reconnect attempts since the link was last healthy.
    reconnect_attempts: AtomicU32,
}

impl PooledLink {
    /// Creates an open link wrapping a freshly connected transport.
    pub(crate) fn new(
        endpoint: impl Into<String>,
        protocols: Vec<String>,
        connection: Box<dyn Connection>,
    ) -> Self {
        let endpoint = endpoint.into();
        Self {
            key: identity_key(&endpoint, &protocols),
            endpoint,
            protocols,
            connection: AsyncMutex::new(Some(connection)),
            health: Mutex::new(LinkHealth::Open),
            last_used: Mutex::new(Instant::now()),
            subscribers: Mutex::new(HashSet::new()),
            reconnect_attempts: AtomicU32::new(0),
        }
    }

    /// Pool identity of this link.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Endpoint this link dials.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Protocols this link speaks.
    #[must_use]
    pub fn protocols(&self) -> &[String] {
        &self.protocols
    }

    /// Current health.
    #[must_use]
    pub fn health(&self) -> LinkHealth {
        *self.health.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_health(&self, health: LinkHealth) {
        *self.health.lock().unwrap_or_else(PoisonError::into_inner) = health;
    }

    /// Whether any subscriber holds this link.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Current subscriber count.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Adds a subscriber id. Returns false if it was already present.
    pub(crate) fn add_subscriber(&self, subscriber_id: &str) -> bool {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(subscriber_id.to_string())
    }

    /// Removes a subscriber id. Returns false if it was not present.
    pub(crate) fn remove_subscriber(&self, subscriber_id: &str) -> bool {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(subscriber_id)
    }

    /// Marks the link used now.
    pub(crate) fn touch(&self) {
        *self
            .last_used
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    pub(crate) fn last_used_instant(&self) -> Instant {
        *self
            .last_used
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Time since the link was last used.
    #[must_use]
    pub fn idle_for(&self) -> std::time::Duration {
        self.last_used_instant().elapsed()
    }

    /// Reconnect attempts since the link was last healthy.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts.load(Ordering::Relaxed)
    }

    /// Increments the attempt counter, returning the new attempt number.
    pub(crate) fn bump_reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn reset_reconnect_attempts(&self) {
        self.reconnect_attempts.store(0, Ordering::Relaxed);
    }

    /// Sends one payload over the live transport.
    ///
    /// Updates the last-used timestamp on success.
    ///
    /// # Errors
    ///
    /// `Error::ConnectionFailed` when the link has no live transport
    /// (reconnecting or closed), or the transport's own send failure.
    pub async fn send(&self, payload: &[u8]) -> Result<()> {
        let guard = self.connection.lock().await;
        let Some(connection) = guard.as_ref() else {
            return Err(Error::ConnectionFailed {
                endpoint: self.endpoint.clone(),
                cause: "no live transport".to_string(),
            });
        };
        connection.send(payload).await?;
        drop(guard);
        self.touch();
        Ok(())
    }

    /// Probes the live transport.
    ///
    /// # Errors
    ///
    /// `Error::ConnectionFailed` when the link has no live transport, or
    /// the transport's own probe failure.
    pub async fn ping(&self) -> Result<()> {
        let guard = self.connection.lock().await;
        let Some(connection) = guard.as_ref() else {
            return Err(Error::ConnectionFailed {
                endpoint: self.endpoint.clone(),
                cause: "no live transport".to_string(),
            });
        };
        connection.ping().await
    }

    /// Swaps the transport, returning the previous one.
    pub(crate) async fn replace_connection(
        &self,
        connection: Option<Box<dyn Connection>>,
    ) -> Option<Box<dyn Connection>> {
        let mut guard = self.connection.lock().await;
        std::mem::replace(&mut *guard, connection)
    }

    /// Takes and closes the transport, if present.
    pub(crate) async fn close(&self) {
        if let Some(connection) = self.replace_connection(None).await {
            connection.close().await;
        }
    }

    /// Point-in-time view of this link.
    #[must_use]
    pub fn snapshot(&self) -> LinkSnapshot {
        LinkSnapshot {
            key: self.key.clone(),
            endpoint: self.endpoint.clone(),
            protocols: self.protocols.clone(),
            health: self.health(),
            subscribers: self.subscriber_count(),
            idle_ms: u64::try_from(self.idle_for().as_millis()).unwrap_or(u64::MAX),
            reconnect_attempts: self.reconnect_attempts(),
        }
    }

    /// Rough bookkeeping footprint of this link.
    pub(crate) fn approx_memory_bytes(&self) -> usize {
        let strings = self.key.len()
            + self.endpoint.len()
            + self.protocols.iter().map(String::len).sum::<usize>()
            + self
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .map(String::len)
                .sum::<usize>();
        LINK_BASE_MEMORY_BYTES + strings
    }
}

impl std::fmt::Debug for PooledLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledLink")
            .field("key", &self.key)
            .field("health", &self.health())
            .field("subscribers", &self.subscriber_count())
            .field("reconnect_attempts", &self.reconnect_attempts())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NoopConnection;

    #[async_trait]
    impl Connection for NoopConnection {
        async fn send(&self, _payload: &[u8]) -> Result<()> {
            Ok(())
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }

        async fn close(&self) {}
    }

    fn create_test_link() -> PooledLink {
        PooledLink::new(
            "wss://qpu.example",
            vec!["chat".to_string()],
            Box::new(NoopConnection),
        )
    }

    #[test]
    fn test_identity_key_format() {
        assert_eq!(
            identity_key("wss://qpu.example", &["chat".to_string(), "telemetry".to_string()]),
            "wss://qpu.example|chat,telemetry"
        );
        assert_eq!(identity_key("wss://qpu.example", &[]), "wss://qpu.example|");
    }

    #[tokio::test]
    async fn test_subscribers_drive_activity() {
        let link = create_test_link();
        assert!(!link.is_active());

        assert!(link.add_subscriber("panel-1"));
        assert!(!link.add_subscriber("panel-1"));
        assert!(link.add_subscriber("panel-2"));
        assert_eq!(link.subscriber_count(), 2);
        assert!(link.is_active());

        assert!(link.remove_subscriber("panel-1"));
        assert!(link.is_active());
        assert!(link.remove_subscriber("panel-2"));
        assert!(!link.is_active());
        assert!(!link.remove_subscriber("panel-2"));
    }

    #[tokio::test]
    async fn test_send_without_transport_fails() {
        let link = create_test_link();
        link.send(b"hello").await.unwrap();

        link.close().await;
        let result = link.send(b"hello").await;
        assert!(matches!(result, Err(Error::ConnectionFailed { .. })));
    }

    #[tokio::test]
    async fn test_reconnect_attempt_counter() {
        let link = create_test_link();
        assert_eq!(link.bump_reconnect_attempts(), 1);
        assert_eq!(link.bump_reconnect_attempts(), 2);
        assert_eq!(link.reconnect_attempts(), 2);

        link.reset_reconnect_attempts();
        assert_eq!(link.reconnect_attempts(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_reflects_state() {
        let link = create_test_link();
        link.add_subscriber("panel-1");
        link.set_health(LinkHealth::Reconnecting { attempt: 1 });

        let snapshot = link.snapshot();
        assert_eq!(snapshot.key, "wss://qpu.example|chat");
        assert_eq!(snapshot.subscribers, 1);
        assert_eq!(snapshot.health, LinkHealth::Reconnecting { attempt: 1 });
    }
}
