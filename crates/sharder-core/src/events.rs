//! Outbound Gateway Events
//!
//! Structured events the coordinator sends to workers. Every event is a JSON
//! object with an event kind `e` and a data object `d`; broadcast events also
//! carry the `to` address they were routed with.

use crate::partition::ShardRange;
use crate::{ShardId, WorkerSlot};
use serde::Serialize;

pub const READY: &str = "READY";
pub const INVALID_ID: &str = "INVALID ID";
pub const WORKER_DISCONNECT: &str = "WORKER_DISCONNECT";
pub const INVALID_ADDRESS: &str = "INVALID ADDRESS";

/// Wire envelope for an outbound event.
#[derive(Debug, Clone, Serialize)]
pub struct Event<D> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<&'static str>,
    pub e: &'static str,
    pub d: D,
}

/// Sent once per successful identification.
#[derive(Debug, Clone, Serialize)]
pub struct Ready<'a> {
    pub worker_id: WorkerSlot,
    pub workers: usize,
    pub shard_range: [ShardId; 2],
    pub shards: &'a [ShardId],
}

/// Sent when a worker asks for a slot that is already live.
#[derive(Debug, Clone, Serialize)]
pub struct InvalidId {
    pub id: WorkerSlot,
    pub new_id: Option<WorkerSlot>,
}

/// Broadcast when a worker's connection ends.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerDisconnect<'a> {
    pub id: WorkerSlot,
    pub shards: &'a [ShardId],
}

/// Sent back to a worker whose message could not be routed.
#[derive(Debug, Clone, Serialize)]
pub struct InvalidAddress {
    pub to: Option<String>,
    pub reason: String,
}

impl<'a> Event<Ready<'a>> {
    pub fn ready(
        worker_id: WorkerSlot,
        workers: usize,
        range: ShardRange,
        shards: &'a [ShardId],
    ) -> Self {
        Self {
            to: None,
            e: READY,
            d: Ready {
                worker_id,
                workers,
                shard_range: [range.first, range.last],
                shards,
            },
        }
    }
}

impl Event<InvalidId> {
    pub fn invalid_id(id: WorkerSlot) -> Self {
        Self {
            to: None,
            e: INVALID_ID,
            d: InvalidId { id, new_id: None },
        }
    }
}

impl<'a> Event<WorkerDisconnect<'a>> {
    pub fn worker_disconnect(id: WorkerSlot, shards: &'a [ShardId]) -> Self {
        Self {
            to: Some("*:*"),
            e: WORKER_DISCONNECT,
            d: WorkerDisconnect { id, shards },
        }
    }
}

impl Event<InvalidAddress> {
    pub fn invalid_address(to: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            to: None,
            e: INVALID_ADDRESS,
            d: InvalidAddress {
                to,
                reason: reason.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ready_shape() {
        let range = ShardRange { first: 0, last: 7 };
        let event = Event::ready(0, 3, range, &[0, 3, 6]);
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "e": "READY",
                "d": {"worker_id": 0, "workers": 3, "shard_range": [0, 7], "shards": [0, 3, 6]}
            })
        );
    }

    #[test]
    fn test_invalid_id_shape() {
        assert_eq!(
            serde_json::to_value(Event::invalid_id(2)).unwrap(),
            json!({"e": "INVALID ID", "d": {"id": 2, "new_id": null}})
        );
    }

    #[test]
    fn test_worker_disconnect_shape() {
        assert_eq!(
            serde_json::to_value(Event::worker_disconnect(1, &[1, 4, 7])).unwrap(),
            json!({"to": "*:*", "e": "WORKER_DISCONNECT", "d": {"id": 1, "shards": [1, 4, 7]}})
        );
    }

    #[test]
    fn test_invalid_address_shape() {
        let event = Event::invalid_address(Some("x".to_string()), "bad selector");
        assert_eq!(
            serde_json::to_value(event).unwrap(),
            json!({"e": "INVALID ADDRESS", "d": {"to": "x", "reason": "bad selector"}})
        );
    }
}
