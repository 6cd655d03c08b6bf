//! Structured Events
//!
//! Structured logging for worker lifecycle and routing, with consistent field
//! names across the server.
//!
//! Event types:
//! - `worker_identified` - connection bound to a slot
//! - `worker_rejected` - requested slot already live
//! - `worker_disconnected` - slot released
//! - `address_rejected` - routed message had an unusable `to` field
//! - `coordinator_shutdown` - server closing all worker connections

use sharder_core::WorkerSlot;
use tracing::{info, warn};

/// Emit a worker identified event
pub fn worker_identified(
    slot: WorkerSlot,
    connection_id: &str,
    requested: Option<WorkerSlot>,
    shard_count: usize,
) {
    info!(
        event_type = "worker_identified",
        slot = slot,
        connection_id = %connection_id,
        requested = ?requested,
        shard_count = shard_count,
        "Worker identified"
    );
}

/// Emit a worker rejected event
pub fn worker_rejected(requested: WorkerSlot, connection_id: &str) {
    warn!(
        event_type = "worker_rejected",
        requested = requested,
        connection_id = %connection_id,
        "Worker rejected: slot already live"
    );
}

/// Emit a worker disconnected event
pub fn worker_disconnected(slot: WorkerSlot, connection_id: &str, reason: &str) {
    info!(
        event_type = "worker_disconnected",
        slot = slot,
        connection_id = %connection_id,
        reason = %reason,
        "Worker disconnected"
    );
}

/// Emit an address rejected event
pub fn address_rejected(slot: WorkerSlot, to: &str, error: &str) {
    warn!(
        event_type = "address_rejected",
        slot = slot,
        to = %to,
        error = %error,
        "Message address rejected"
    );
}

/// Emit a coordinator shutdown event
pub fn coordinator_shutdown(live_connections: usize, remaining: usize) {
    info!(
        event_type = "coordinator_shutdown",
        live_connections = live_connections,
        remaining = remaining,
        "Coordinator shut down"
    );
}
