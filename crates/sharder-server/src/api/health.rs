//! Health Check Endpoints
//!
//! Liveness and readiness probe handlers.

use super::state::AppState;
use axum::{extract::State, http::StatusCode};

/// Liveness probe endpoint.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe endpoint. Returns OK once the listener is bound and until
/// shutdown begins.
#[tracing::instrument(skip(state))]
pub async fn readiness_check(State(state): State<AppState>) -> Result<&'static str, StatusCode> {
    if state.is_ready() {
        Ok("READY")
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}
