//! Application error type mapping to HTTP status codes and envelope format.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use echolocator_core::service::gateway::GatewayError;
use echolocator_types::error::ErrorKind;

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
///
/// Messages are already safe for callers: the gateway has replaced internal
/// details with public wording.
#[derive(Debug)]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: message.into(),
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self.kind {
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ErrorKind::Embedding => (StatusCode::SERVICE_UNAVAILABLE, "EMBEDDING_UNAVAILABLE"),
            ErrorKind::Storage => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(e: GatewayError) -> Self {
        Self {
            kind: e.kind,
            message: e.message,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let request_id = uuid::Uuid::now_v7().to_string();
        if status.is_server_error() {
            tracing::warn!(%request_id, code, message = %self.message, "request failed");
        }
        let body = ApiResponse::error(code, &self.message, request_id, 0);
        (status, Json(body)).into_response()
    }
}
