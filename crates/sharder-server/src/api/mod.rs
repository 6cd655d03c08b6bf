//! HTTP API Module
//!
//! This module contains:
//! - `state`: Shared application state
//! - `health`: Liveness and readiness probes
//! - `metrics`: Prometheus metrics endpoint
//! - `workers`: Slot table listing
//! - `version`: Build metadata
//!
//! Workers connect to the WebSocket gateway at `/`.

mod error;
mod health;
mod metrics;
mod state;
mod version;
mod workers;

pub use error::{ApiError, INTERNAL_ERROR_BODY};
pub use state::AppState;
pub use workers::WorkersResponse;

use crate::coordinator::gateway;
use axum::{routing::get, Router};

/// Create the API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Worker gateway
        .route("/", get(gateway::gateway))
        // Health checks
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Observability
        .route("/metrics", get(metrics::get_metrics))
        .route("/workers", get(workers::get_workers))
        .route("/version", get(version::get_version))
        .with_state(state)
}
