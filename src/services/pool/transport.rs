//! Transport seam for the connection pool.
//!
//! The pool owns no wire protocol. Callers implement these traits over
//! their transport of choice; tests use mock implementations.

use async_trait::async_trait;

use crate::Result;

/// Opens duplex connections on behalf of the pool.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a connection to `endpoint` speaking `protocols`.
    ///
    /// The pool wraps this call in its connect timeout; implementations
    /// do not need their own.
    ///
    /// # Errors
    ///
    /// Any transport-level failure to establish the connection.
    async fn connect(&self, endpoint: &str, protocols: &[String]) -> Result<Box<dyn Connection>>;
}

/// A live duplex connection.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Sends one opaque payload.
    ///
    /// # Errors
    ///
    /// Any transport-level send failure.
    async fn send(&self, payload: &[u8]) -> Result<()>;

    /// Liveness probe, used by the pool's heartbeat.
    ///
    /// # Errors
    ///
    /// Any transport-level failure; a failed probe is treated like a
    /// transport error.
    async fn ping(&self) -> Result<()>;

    /// Closes the connection. Best effort; errors are swallowed.
    async fn close(&self);
}
