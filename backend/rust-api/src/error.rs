use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Error taxonomy for the attempt engine. Every variant is terminal for the
/// calling request; only `Conflict` on the record-answer path is retried, once,
/// with a fresh read.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// The operation is illegal for the attempt's current status, e.g.
    /// resuming a graded attempt.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A write arrived after `started_at + duration`. Rejected rather than
    /// silently accepted so the deadline sweep never races a mutating client.
    #[error("Deadline exceeded for attempt {0}")]
    DeadlineExceeded(String),

    #[error("Attempt limit reached: {0}")]
    LimitExceeded(String),

    /// Optimistic version check failed on update.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code so clients can branch without parsing
    /// messages (e.g. force-submit on `deadline_exceeded`, fresh start on
    /// `invalid_state`).
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::InvalidState(_) => "invalid_state",
            AppError::DeadlineExceeded(_) => "deadline_exceeded",
            AppError::LimitExceeded(_) => "limit_exceeded",
            AppError::Conflict(_) => "conflict",
            AppError::Validation(_) => "validation",
            AppError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidState(_) => StatusCode::CONFLICT,
            AppError::DeadlineExceeded(_) => StatusCode::GONE,
            AppError::LimitExceeded(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(ref err) = self {
            tracing::error!("Internal error: {:#}", err);
        }

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));

        (self.status(), body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(AppError::NotFound("x".into()).code(), "not_found");
        assert_eq!(
            AppError::DeadlineExceeded("a-1".into()).code(),
            "deadline_exceeded"
        );
        assert_eq!(AppError::Conflict("v".into()).code(), "conflict");
    }

    #[test]
    fn deadline_exceeded_maps_to_gone() {
        assert_eq!(
            AppError::DeadlineExceeded("a-1".into()).status(),
            StatusCode::GONE
        );
        assert_eq!(
            AppError::InvalidState("x".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::LimitExceeded("x".into()).status(),
            StatusCode::FORBIDDEN
        );
    }
}
