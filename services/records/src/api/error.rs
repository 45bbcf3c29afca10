//! API error types and helpers.
//!
//! # Purpose and responsibility
//! Builds every error response the registry returns so the
//! `{code, message, request_id}` shape stays uniform, and maps workflow
//! failures onto HTTP status codes in one place.
//!
//! # Security considerations
//! - Storage failures are logged server-side and answered with a generic
//!   message.
use crate::api::types::ErrorResponse;
use crate::store::StoreError;
use crate::workflow::WorkflowError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Structured API error returned by handlers.
///
/// # Invariants
/// - `status` must match the semantics of `body.code`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn api_error(status: StatusCode, code: &str, message: &str) -> ApiError {
    ApiError {
        status,
        body: ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
            request_id: None,
        },
    }
}

pub fn api_not_found(message: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, "not_found", message)
}

/// Build a 409 Conflict error with a caller-provided code.
pub fn api_conflict(code: &str, message: &str) -> ApiError {
    api_error(StatusCode::CONFLICT, code, message)
}

/// Build a 500 from a store error.
///
/// # What it does
/// Logs the store error and returns a generic internal error response.
pub fn api_internal(message: &str, err: &StoreError) -> ApiError {
    tracing::error!(error = ?err, "records storage error");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

pub fn api_unauthorized(message: &str) -> ApiError {
    api_error(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

pub fn api_forbidden(message: &str) -> ApiError {
    api_error(StatusCode::FORBIDDEN, "forbidden", message)
}

/// Build a 400 for malformed bodies or rejected field values.
pub fn api_validation_error(message: &str) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, "validation_error", message)
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::NotFound(msg) => api_not_found(&msg),
            WorkflowError::Forbidden(msg) => api_forbidden(&msg),
            WorkflowError::Conflict(msg) => api_conflict("conflict", &msg),
            WorkflowError::InvalidState(msg) => api_conflict("invalid_state", &msg),
            WorkflowError::InvalidArgument(msg) => api_validation_error(&msg),
            WorkflowError::Store(err) => api_internal("storage operation failed", &err),
        }
    }
}
