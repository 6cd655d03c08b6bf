//! Build Version Endpoint

use crate::version;
use axum::{http::StatusCode, response::IntoResponse};

/// GET /version - Build metadata as plain text
pub async fn get_version() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        version::build_info(),
    )
}
