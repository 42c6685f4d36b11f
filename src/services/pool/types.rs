//! Pool observability types.

use serde::Serialize;

/// Health of one pooled link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LinkHealth {
    /// The link has a live transport connection.
    Open,
    /// The transport failed; a reconnect attempt is scheduled or running.
    Reconnecting {
        /// Attempt number, starting at 1.
        attempt: u32,
    },
    /// Reconnect attempts are exhausted; the link is being removed.
    Failed,
}

/// Point-in-time view of one pooled link.
#[derive(Debug, Clone, Serialize)]
pub struct LinkSnapshot {
    /// Pool identity: endpoint plus protocol list.
    pub key: String,
    /// Endpoint the link dials.
    pub endpoint: String,
    /// Protocols the link speaks.
    pub protocols: Vec<String>,
    /// Current health.
    pub health: LinkHealth,
    /// Subscriber count; non-zero marks the link active.
    pub subscribers: usize,
    /// Milliseconds since the link was last used.
    pub idle_ms: u64,
    /// Reconnect attempts since the link was last healthy.
    pub reconnect_attempts: u32,
}

/// Point-in-time view of the whole pool.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStats {
    /// Pooled links.
    pub total: usize,
    /// Links with at least one subscriber.
    pub active: usize,
    /// Per-link snapshots.
    pub connections: Vec<LinkSnapshot>,
    /// Rough estimate of pool bookkeeping memory. Excludes whatever the
    /// transport itself holds.
    pub approx_memory_bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_serializes_tagged() {
        let json = serde_json::to_value(LinkHealth::Reconnecting { attempt: 2 }).unwrap();
        assert_eq!(json["state"], "reconnecting");
        assert_eq!(json["attempt"], 2);

        let json = serde_json::to_value(LinkHealth::Open).unwrap();
        assert_eq!(json["state"], "open");
    }
}
