//! Broker counters and the status snapshot served by the monitor endpoint.
//!
//! Counters are plain integers because every update happens on the event
//! core task; the monitor obtains a [`StatusSnapshot`] through the core, so
//! no shared mutable state is needed.

use serde::Serialize;
use tracing::info;

/// Running totals maintained by the event core.
#[derive(Debug, Default)]
pub struct BrokerStats {
    /// Producer lines accepted and journaled.
    pub ingested: u64,
    /// Records handed to consumers, redeliveries included.
    pub dispatched: u64,
    /// ACK/ERR verdicts applied.
    pub acked: u64,
    /// Ids moved back to the ready queue after a consumer loss.
    pub requeued: u64,
}

impl BrokerStats {
    /// One-line counters summary, emitted every few seconds by the core.
    pub fn log_summary(&self, queued: usize, in_flight: usize, producers: usize, consumers: usize) {
        info!(
            ingested = self.ingested,
            dispatched = self.dispatched,
            acked = self.acked,
            requeued = self.requeued,
            queued,
            in_flight,
            producers,
            consumers,
            "broker counters"
        );
    }
}

/// Read-only view over the broker served as the `/status` JSON document.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub broker: BrokerStatus,
    pub producers: Vec<ProducerStatus>,
    pub consumers: Vec<ConsumerStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BrokerStatus {
    pub active: bool,
    /// Ids issued so far (`next_id - 1`).
    pub total_messages: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProducerStatus {
    pub id: String,
    pub connected: bool,
    pub messages_sent: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsumerStatus {
    pub id: String,
    pub connected: bool,
    pub pending: usize,
    pub messages_received: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_serializes_with_wire_field_names() {
        let snapshot = StatusSnapshot {
            broker: BrokerStatus {
                active: true,
                total_messages: 5,
            },
            producers: vec![ProducerStatus {
                id: "p1".to_string(),
                connected: true,
                messages_sent: 5,
            }],
            consumers: vec![ConsumerStatus {
                id: "c1".to_string(),
                connected: true,
                pending: 2,
                messages_received: 3,
            }],
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["broker"]["total_messages"], 5);
        assert_eq!(json["producers"][0]["id"], "p1");
        assert_eq!(json["consumers"][0]["pending"], 2);
        assert_eq!(json["consumers"][0]["messages_received"], 3);
    }
}
