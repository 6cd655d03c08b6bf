//! Prometheus Metrics Endpoint

use super::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};

const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// GET /metrics - Prometheus exposition format. 503 when the recorder could
/// not be installed at startup.
pub async fn get_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let Some(metrics) = &state.metrics_state else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, CONTENT_TYPE)],
            "Metrics not initialized".to_string(),
        );
    };

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, CONTENT_TYPE)],
        metrics.prometheus_handle.render(),
    )
}
