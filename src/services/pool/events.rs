//! Pool lifecycle event stream.

use serde::{Deserialize, Serialize};

/// Lifecycle notification broadcast to pool event subscribers.
///
/// `key` is the pool identity of the affected link: the endpoint joined
/// with its comma-separated protocol list by `|`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PoolEvent {
    /// A link opened, on first connect or after a successful reconnect.
    Connected {
        /// Pool identity of the link.
        key: String,
    },
    /// A reconnect attempt was scheduled after a transport failure.
    Reconnecting {
        /// Pool identity of the link.
        key: String,
        /// Attempt number, starting at 1.
        attempt: u32,
    },
    /// A link was dropped after exhausting its reconnect attempts.
    ConnectionLost {
        /// Pool identity of the link.
        key: String,
        /// The failure that exhausted the link.
        reason: String,
    },
    /// An inactive link was evicted for capacity or idleness.
    Evicted {
        /// Pool identity of the link.
        key: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_tagged() {
        let event = PoolEvent::Reconnecting {
            key: "wss://qpu.example|chat".to_string(),
            attempt: 2,
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"], "reconnecting");
        assert_eq!(json["attempt"], 2);
    }
}
