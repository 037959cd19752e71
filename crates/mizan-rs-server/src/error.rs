//! Error types for the HTTP surface.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::{error, warn};
use mizan_rs_memory::MemoryError;
use serde::Serialize;

/// Errors returned by route handlers and the server loop.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Engine failure, mapped to a status by kind.
    #[error(transparent)]
    Memory(#[from] MemoryError),
    /// Malformed request (body, query, or path).
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested record does not exist.
    #[error("memory not found: {0}")]
    NotFound(String),
    /// Binding or serving the listener failed.
    #[error("server io error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl ServerError {
    /// HTTP status and stable error code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ServerError::Memory(err) => match err {
                MemoryError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                MemoryError::EmbeddingUnavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "EMBEDDING_UNAVAILABLE")
                }
                MemoryError::EmbeddingFailed(_) => (StatusCode::BAD_GATEWAY, "EMBEDDING_FAILED"),
                MemoryError::DuplicateId(_) => (StatusCode::CONFLICT, "DUPLICATE_ID"),
                MemoryError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
                MemoryError::Io(_) | MemoryError::MalformedLogEntry { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "LOG_ERROR")
                }
                MemoryError::Serde(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "SERIALIZATION_ERROR")
                }
            },
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ServerError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "SERVER_ERROR"),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!("request failed (status={}, code={code}): {self}", status.as_u16());
        } else {
            warn!("request rejected (status={}, code={code}): {self}", status.as_u16());
        }
        let body = ErrorResponse {
            error: self.to_string(),
            code,
        };
        (status, Json(body)).into_response()
    }
}
