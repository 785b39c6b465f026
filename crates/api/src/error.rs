use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use naoty_core::error::CoreError;
use naoty_db::StoreError;
use serde_json::{json, Map, Value};

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `naoty_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Core(core) => AppError::Core(core),
            StoreError::Database(db) => AppError::Database(db),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut extra = Map::new();

        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => {
                let status = match core {
                    CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                    CoreError::PermissionDenied { note_id, .. } => {
                        if let Some(id) = note_id {
                            extra.insert("note_id".into(), json!(id));
                        }
                        StatusCode::FORBIDDEN
                    }
                    CoreError::InvalidState {
                        note_id, status, ..
                    } => {
                        extra.insert("note_id".into(), json!(note_id));
                        extra.insert("status".into(), json!(status));
                        StatusCode::CONFLICT
                    }
                    CoreError::ConcurrentModification {
                        note_id,
                        status,
                        version,
                    } => {
                        extra.insert("note_id".into(), json!(note_id));
                        extra.insert("status".into(), json!(status));
                        extra.insert("version".into(), json!(version));
                        StatusCode::CONFLICT
                    }
                    CoreError::InvalidAction(_) => StatusCode::BAD_REQUEST,
                    CoreError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                    CoreError::Internal(msg) => {
                        tracing::error!(error = %msg, "Internal core error");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                let message = match core {
                    CoreError::Internal(_) => "An internal error occurred".to_string(),
                    CoreError::Unauthorized(msg) => msg.clone(),
                    CoreError::PermissionDenied { message, .. } => message.clone(),
                    CoreError::InvalidAction(msg) => msg.clone(),
                    CoreError::ConcurrentModification { .. } => {
                        "The note was updated by someone else, please refresh".to_string()
                    }
                    other => other.to_string(),
                };
                (status, core.code(), message)
            }

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let mut body = Map::new();
        body.insert("error".into(), Value::String(message));
        body.insert("code".into(), Value::String(code.to_string()));
        body.extend(extra);

        (status, axum::Json(Value::Object(body))).into_response()
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
