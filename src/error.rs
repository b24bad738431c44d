// src/error.rs

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Global Application Error Enum.
/// Centralizes the engine's error taxonomy and its mapping to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // 404 Not Found (referenced quiz does not exist)
    #[error("Not found: {0}")]
    NotFound(String),

    // 400 Bad Request (malformed identifiers or payloads)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // 503 Service Unavailable, caller may retry
    #[error("Timed out after {waited_ms}ms waiting for the ledger entry of student {student_id} on quiz {quiz_id}")]
    TransientLockTimeout {
        student_id: i64,
        quiz_id: i64,
        waited_ms: u64,
    },

    // 409 Conflict (e.g., rescheduling a quiz that already has attempts)
    #[error("Conflict: {0}")]
    Conflict(String),

    // 401 Unauthorized
    #[error("Unauthorized: {0}")]
    AuthError(String),

    // 500, underlying driver error kept as the source
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    // 500 Internal Server Error
    #[error("Internal error: {0}")]
    InternalServerError(String),
}

impl AppError {
    /// Returns `true` if the caller may retry the same request later.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::TransientLockTimeout { .. })
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::TransientLockTimeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Storage(_)
            | AppError::Migration(_)
            | AppError::Config(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = match &self {
            AppError::Storage(err) => {
                tracing::error!(error = ?err, "Storage failure");
                "Internal Server Error".to_string()
            }
            AppError::Migration(_) | AppError::Config(_) | AppError::InternalServerError(_) => {
                tracing::error!("Internal Server Error: {}", self);
                "Internal Server Error".to_string()
            }
            AppError::NotFound(msg)
            | AppError::InvalidInput(msg)
            | AppError::Conflict(msg)
            | AppError::AuthError(msg) => msg.clone(),
            AppError::TransientLockTimeout { .. } => self.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        let mut response = (status, body).into_response();
        if self.is_transient() {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

// Extractor rejections surface as the same JSON error body as everything else.

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}
