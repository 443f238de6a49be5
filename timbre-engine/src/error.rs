//! Error types for timbre-engine

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// timbre-common error
    #[error("{0}")]
    Common(#[from] timbre_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use timbre_common::Error as CommonError;

        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Common(err) => match err {
                CommonError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
                CommonError::Protocol(msg) => (StatusCode::BAD_REQUEST, "PROTOCOL_ERROR", msg),
                CommonError::Config(msg) => (StatusCode::BAD_REQUEST, "CONFIG_ERROR", msg),
                CommonError::Resource(msg) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "RESOURCE_ERROR", msg)
                }
                other => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    other.to_string(),
                ),
            },
        };

        let body = Json(json!({
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
