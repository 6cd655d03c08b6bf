//! API Errors
//!
//! Handler failures logged in full and returned to the client as an opaque 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

pub const INTERNAL_ERROR_BODY: &str = "Unexpected Internal Error";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout {
        operation: &'static str,
        after_ms: u128,
    },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_error_body_is_opaque() {
        let response = ApiError::Timeout {
            operation: "registry snapshot",
            after_ms: 2000,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], INTERNAL_ERROR_BODY.as_bytes());
    }
}
