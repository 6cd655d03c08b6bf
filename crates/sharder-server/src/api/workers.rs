//! Worker Listing Endpoint
//!
//! Exposes the slot table at GET /workers

use super::error::ApiError;
use super::AppState;
use crate::coordinator::SlotSnapshot;
use axum::{extract::State, Json};
use serde::Serialize;
use sharder_core::ShardRange;
use std::time::Duration;

const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(2);

/// Response for GET /workers
#[derive(Debug, Serialize)]
pub struct WorkersResponse {
    pub workers: usize,
    pub shard_range: ShardRange,
    pub live: usize,
    pub slots: Vec<SlotSnapshot>,
}

/// GET /workers - Current slot assignments
#[tracing::instrument(skip(state))]
pub async fn get_workers(State(state): State<AppState>) -> Result<Json<WorkersResponse>, ApiError> {
    let coordinator = &state.coordinator;
    let slots = tokio::time::timeout(SNAPSHOT_TIMEOUT, coordinator.registry().snapshot())
        .await
        .map_err(|_| ApiError::Timeout {
            operation: "registry snapshot",
            after_ms: SNAPSHOT_TIMEOUT.as_millis(),
        })?;
    let live = slots.iter().filter(|slot| slot.connection_id.is_some()).count();

    Ok(Json(WorkersResponse {
        workers: coordinator.partition().workers(),
        shard_range: coordinator.partition().range(),
        live,
        slots,
    }))
}
