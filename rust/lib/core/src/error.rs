use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

// ── Error codes ─────────────────────────────────────────────────────
//
// Stable, machine-readable identifiers. Clients match on these,
// never on the human-readable message string.

/// Stable error code constants.
///
/// Clients should match on `code` from `{"code": "NOT_FOUND", "message": "..."}`.
pub mod error_code {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const ALREADY_EXISTS: &str = "ALREADY_EXISTS";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    pub const UPSTREAM_ERROR: &str = "UPSTREAM_ERROR";
    pub const INTERNAL: &str = "INTERNAL";
}

// ── ServiceError ────────────────────────────────────────────────────

/// Unified service error type used across all crates.
///
/// Each variant maps to a stable error code (see [`error_code`]) and an
/// HTTP status code. The JSON response always includes both:
///
/// ```json
/// {"code": "NOT_FOUND", "message": "products/abc"}
/// ```
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Resource does not exist. HTTP 404.
    #[error("{0}")]
    NotFound(String),

    /// Duplicate key / resource already exists. HTTP 409.
    #[error("{0}")]
    Conflict(String),

    /// Input data is invalid. HTTP 400.
    #[error("{0}")]
    Validation(String),

    /// Missing or invalid authentication credentials. HTTP 401.
    #[error("{0}")]
    Unauthorized(String),

    /// Data store or asset storage failure. HTTP 500.
    #[error("{0}")]
    Storage(String),

    /// An external service answered with an error. HTTP 502.
    #[error("{0}")]
    Upstream(String),

    /// Unexpected internal error. HTTP 500.
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// HTTP status and stable code for this error.
    fn classify(&self) -> (StatusCode, &'static str) {
        use error_code::*;
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, NOT_FOUND),
            Self::Conflict(_) => (StatusCode::CONFLICT, ALREADY_EXISTS),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, VALIDATION_FAILED),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, UNAUTHENTICATED),
            Self::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, STORAGE_ERROR),
            Self::Upstream(_) => (StatusCode::BAD_GATEWAY, UPSTREAM_ERROR),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL),
        }
    }

    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        self.classify().1
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.classify().0
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, code) = self.classify();
        let body = serde_json::json!({
            "code": code,
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
