//! Connection Registry
//!
//! Tracks which worker slots are live and which connection holds each one.
//! The registry starts with one provisioned slot per configured worker and
//! grows when more workers connect than were provisioned.
//!
//! Slot lifecycle:
//!
//! ```text
//! Unclaimed ──assign──> Live ──release──> Vacant ──assign(requested)──> Live
//! ```
//!
//! Fresh assignments never take a `Vacant` slot: it stays reserved for the
//! worker that left it, which reconnects by naming the slot.

use super::connection::{Connection, ConnectionId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sharder_core::{Partition, ShardId, WorkerSlot};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, trace};

#[derive(Debug, Clone)]
enum Slot {
    Unclaimed,
    Vacant,
    Live(Connection),
}

impl Slot {
    fn connection(&self) -> Option<&Connection> {
        match self {
            Slot::Live(conn) => Some(conn),
            Slot::Unclaimed | Slot::Vacant => None,
        }
    }
}

/// Result of [`ConnectionRegistry::assign`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// The connection now holds `slot`. `reconnect` is set when the worker
    /// asked for this slot by id.
    Assigned { slot: WorkerSlot, reconnect: bool },
    /// The requested slot is held by another live connection.
    Conflict { requested: WorkerSlot },
}

/// Observable state of a slot, for the worker listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    Unclaimed,
    Vacant,
    Live,
}

/// Point-in-time view of one slot.
#[derive(Debug, Clone, Serialize)]
pub struct SlotSnapshot {
    pub id: WorkerSlot,
    pub state: SlotState,
    pub connection_id: Option<ConnectionId>,
    pub connected_at: Option<DateTime<Utc>>,
    pub shards: Vec<ShardId>,
}

/// Lock-guarded slot table shared by every gateway task.
#[derive(Debug)]
pub struct ConnectionRegistry {
    partition: Arc<Partition>,
    slots: RwLock<Vec<Slot>>,
}

impl ConnectionRegistry {
    pub fn new(partition: Arc<Partition>) -> Self {
        let slots = vec![Slot::Unclaimed; partition.workers()];
        Self {
            partition,
            slots: RwLock::new(slots),
        }
    }

    /// Bind `connection` to a slot.
    ///
    /// A requested slot that is in range and not live is bound as-is. A
    /// requested slot past the end of the table is ignored and the connection
    /// is treated as fresh. A requested slot that is live is a conflict and
    /// leaves the table untouched.
    pub async fn assign(&self, requested: Option<WorkerSlot>, connection: Connection) -> Assignment {
        let mut slots = self.slots.write().await;

        if let Some(slot) = requested.filter(|slot| *slot < slots.len()) {
            if let Some(occupant) = slots[slot].connection() {
                debug!(
                    slot,
                    occupant = %occupant.id(),
                    rejected = %connection.id(),
                    "Requested slot is already live"
                );
                return Assignment::Conflict { requested: slot };
            }
            trace!(slot, connection_id = %connection.id(), "Binding requested slot");
            slots[slot] = Slot::Live(connection);
            return Assignment::Assigned {
                slot,
                reconnect: true,
            };
        }

        if let Some(slot) = requested {
            debug!(slot, len = slots.len(), "Requested slot out of range, assigning fresh slot");
        }

        let slot = match slots.iter().position(|s| matches!(s, Slot::Unclaimed)) {
            Some(slot) => slot,
            None => {
                slots.push(Slot::Unclaimed);
                slots.len() - 1
            }
        };
        trace!(slot, connection_id = %connection.id(), "Binding fresh slot");
        slots[slot] = Slot::Live(connection);

        Assignment::Assigned {
            slot,
            reconnect: false,
        }
    }

    /// Free `slot` if it is still held by connection `id`.
    ///
    /// The slot index stays reserved for a later reconnect.
    pub async fn release(&self, slot: WorkerSlot, id: ConnectionId) -> Option<Connection> {
        let mut slots = self.slots.write().await;
        let held = matches!(slots.get(slot), Some(Slot::Live(conn)) if conn.id() == id);
        if !held {
            return None;
        }
        trace!(slot, connection_id = %id, "Released slot");
        match std::mem::replace(&mut slots[slot], Slot::Vacant) {
            Slot::Live(conn) => Some(conn),
            Slot::Unclaimed | Slot::Vacant => None,
        }
    }

    pub async fn get(&self, slot: WorkerSlot) -> Option<Connection> {
        self.slots
            .read()
            .await
            .get(slot)
            .and_then(Slot::connection)
            .cloned()
    }

    /// Every live connection, in slot order.
    pub async fn live_connections(&self) -> Vec<Connection> {
        self.slots
            .read()
            .await
            .iter()
            .filter_map(Slot::connection)
            .cloned()
            .collect()
    }

    pub async fn live_count(&self) -> usize {
        self.slots
            .read()
            .await
            .iter()
            .filter(|slot| slot.connection().is_some())
            .count()
    }

    /// Shards owned by `slot`. Unchanged across release and reassign.
    pub fn shards_for(&self, slot: WorkerSlot) -> &[ShardId] {
        self.partition.shards_for(slot)
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub async fn snapshot(&self) -> Vec<SlotSnapshot> {
        self.slots
            .read()
            .await
            .iter()
            .enumerate()
            .map(|(id, slot)| {
                let (state, conn) = match slot {
                    Slot::Unclaimed => (SlotState::Unclaimed, None),
                    Slot::Vacant => (SlotState::Vacant, None),
                    Slot::Live(conn) => (SlotState::Live, Some(conn)),
                };
                SlotSnapshot {
                    id,
                    state,
                    connection_id: conn.map(Connection::id),
                    connected_at: conn.map(Connection::connected_at),
                    shards: self.partition.shards_for(id).to_vec(),
                }
            })
            .collect()
    }
}
