//! Application error type mapping to HTTP status codes and the
//! `{success:false, error}` envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use relaychat_types::api::StatusResponse;
use relaychat_types::error::StoreError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Session store errors.
    Store(StoreError),
    /// Validation error.
    Validation(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Store(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Store(StoreError::NotFound) => {
                (StatusCode::NOT_FOUND, "Chat session not found".to_string())
            }
            AppError::Store(StoreError::Unavailable(reason)) => {
                tracing::warn!(reason = %reason, "Session store unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, format!("Session store unavailable: {reason}"))
            }
            AppError::Store(StoreError::Rejected(reason)) => (StatusCode::BAD_REQUEST, reason.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        (status, Json(StatusResponse::failed(message))).into_response()
    }
}
