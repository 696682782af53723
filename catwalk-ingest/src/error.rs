//! Error types for catwalk-ingest
//!
//! Handler errors become `{"success": false, "error": {code, message}}`
//! bodies. A store that cannot be reached fails the request with 503 rather
//! than a generic 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::extractor::RenderError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - another batch job holds the catalog
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Catalog store unreachable (503)
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Crawl could not start its render session (502)
    #[error("Renderer failed: {0}")]
    Renderer(#[from] RenderError),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// catwalk-common error
    #[error("Common error: {0}")]
    Common(#[from] catwalk_common::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Common(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use catwalk_common::Error as CommonError;

        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Unavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE", msg)
            }
            ApiError::Renderer(ref err) => {
                (StatusCode::BAD_GATEWAY, "RENDERER_FAILED", err.to_string())
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Common(err) => match err {
                CommonError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
                CommonError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
                CommonError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
                CommonError::Cancelled(msg) => (StatusCode::CONFLICT, "CANCELLED", msg),
                CommonError::StoreUnavailable(msg) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE", msg)
                }
                other => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "COMMON_ERROR",
                    other.to_string(),
                ),
            },
        };

        let body = Json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
