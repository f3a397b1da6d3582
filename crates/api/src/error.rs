use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use muse_core::error::CoreError;
use muse_db::store::StoreError;
use muse_providers::bridge::{GenerationError, GenerationErrorKind};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors, [`StoreError`] for persistence
/// and [`GenerationError`] for image generation, and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce consistent JSON error
/// responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// HTTP status for a generation failure.
pub fn generation_status(kind: GenerationErrorKind) -> StatusCode {
    match kind {
        GenerationErrorKind::Validation => StatusCode::BAD_REQUEST,
        GenerationErrorKind::Timeout => StatusCode::REQUEST_TIMEOUT,
        GenerationErrorKind::Abandoned => StatusCode::SERVICE_UNAVAILABLE,
        GenerationErrorKind::Configuration
        | GenerationErrorKind::Submission
        | GenerationErrorKind::PollTransport
        | GenerationErrorKind::RemoteFailure
        | GenerationErrorKind::Canceled
        | GenerationErrorKind::MissingOutput => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- Store errors ---
            AppError::Store(err) => match err {
                StoreError::ConversationNotFound(id) => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("Conversation with id {id} not found"),
                ),
                StoreError::MessageNotFound(id) => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("Message with id {id} not found"),
                ),
                StoreError::Invalid(CoreError::Validation(msg)) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                StoreError::Invalid(other) => {
                    tracing::error!(error = %other, "Store input rejected");
                    internal()
                }
                StoreError::Database(db_err) => {
                    tracing::error!(error = %db_err, "Database error");
                    internal()
                }
            },

            // --- Generation errors ---
            AppError::Generation(err) => {
                let kind = err.kind();
                let status = generation_status(kind);
                if status.is_server_error() {
                    tracing::error!(
                        error_kind = kind.as_str(),
                        prediction_id = err.prediction_id(),
                        error = %err,
                        "Image generation failed",
                    );
                }
                (status, kind.as_str(), err.to_string())
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
