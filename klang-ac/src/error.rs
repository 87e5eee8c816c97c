//! HTTP-facing error type for klang-ac
//!
//! Wraps the core error taxonomy and maps it onto status codes: client
//! faults (invalid input, undecodable audio) become 400s carrying their
//! cause, everything else becomes an opaque 500 whose detail is only
//! logged.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error as ThisError;
use tracing::error;

use klang_common::Error;

/// API error wrapper
#[derive(Debug, ThisError)]
#[error(transparent)]
pub struct ApiError(#[from] pub Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self.0 {
            Error::Input(msg) => (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg),
            Error::Decode(msg) => (StatusCode::BAD_REQUEST, "UNDECODABLE_AUDIO", msg),
            other => {
                error!(error = %other, "Request failed with internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred.".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
