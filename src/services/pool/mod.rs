//! Connection pool manager for persistent duplex links.
//!
//! Maintains a bounded pool of long-lived connections keyed by endpoint
//! identity (endpoint plus protocol list), with reference-counted
//! subscribers, LRU eviction, exponential-backoff reconnection, an idle
//! sweep, and heartbeat probing.
//!
//! # Architecture
//!
//! ```text
//!                    ┌───────────────────────────────┐
//!  get_connection ──▶│ links: identity → PooledLink  │──▶ Arc<PooledLink>
//!                    │                               │
//!   at capacity ────▶│ evict LRU among unsubscribed  │──▶ Evicted event
//!                    └──────────────┬────────────────┘
//!                                   │ transport failure
//!                                   ▼
//!                    ┌───────────────────────────────┐
//!                    │ reconnect: 2^attempt seconds, │──▶ Reconnecting /
//!                    │ drop after attempts exhausted │    ConnectionLost
//!                    └───────────────────────────────┘
//!
//!  background: idle sweep (unsubscribed + stale) and heartbeat (open + subscribed)
//! ```
//!
//! Links are shared: every caller asking for the same endpoint identity
//! receives the same [`PooledLink`], and subscribers pin it against
//! eviction until they unsubscribe. The transport itself is abstracted
//! behind [`Connector`] and [`Connection`] so tests and alternative
//! wire protocols can plug in.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use qonduit::services::pool::{ConnectionPool, PoolConfig, PoolEvent};
//!
//! let pool = ConnectionPool::new(PoolConfig::from_env(), Arc::new(dialer));
//! pool.start();
//!
//! let mut events = pool.events();
//! let link = pool.subscribe("wss://qpu.example", "session-7", &["chat".into()]).await?;
//! link.send(b"{\"op\":\"submit\"}").await?;
//!
//! while let Ok(event) = events.recv().await {
//!     if let PoolEvent::ConnectionLost { key, reason } = event {
//!         eprintln!("{key} dropped: {reason}");
//!     }
//! }
//! ```

mod config;
mod events;
mod link;
mod manager;
mod transport;
mod types;

pub use config::PoolConfig;
pub use events::PoolEvent;
pub use link::PooledLink;
pub use manager::ConnectionPool;
pub use transport::{Connection, Connector};
pub use types::{LinkHealth, LinkSnapshot, PoolStats};
