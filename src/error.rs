// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Errors raised by an `ExamStore` implementation.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("malformed stored data: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
            other => StoreError::Database(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Errors raised by the code execution sandbox.
#[derive(Debug, Clone, Error)]
pub enum ExecutionError {
    #[error("code execution is unavailable")]
    Unavailable,

    #[error("sandbox request failed: {0}")]
    Request(String),

    #[error("sandbox returned {got} outcomes for {expected} test cases")]
    OutcomeCount { expected: usize, got: usize },
}

/// Persisting a report failed. Never retried by the engine.
#[derive(Debug, Clone, Error)]
#[error("report submission failed: {0}")]
pub struct SubmissionError(#[from] pub StoreError);

/// A second timer was started on a session that already has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("countdown timer was already started")]
    AlreadyStarted,
}

/// Errors surfaced by a running exam session.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("failed to load exam: {0}")]
    Load(StoreError),

    #[error("action not allowed while the session shows {0}")]
    InvalidState(&'static str),

    #[error("submission is only possible from the last question")]
    NotOnLastQuestion,

    #[error("option '{0}' does not exist for this question")]
    UnknownOption(String),

    #[error("answers can only be selected on quiz exams")]
    NotQuizExam,

    #[error("code can only be run on coding exams")]
    NotCodingExam,

    #[error("time is up")]
    TimeUp,

    #[error("a submission is already in progress")]
    SubmissionInFlight,

    #[error("the exam was already submitted")]
    AlreadySubmitted,

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("session is closed")]
    Closed,
}

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    // 500 Internal Server Error
    #[error("internal server error: {0}")]
    InternalServerError(String),

    // 400 Bad Request
    #[error("bad request: {0}")]
    BadRequest(String),

    // 401 Unauthorized
    #[error("unauthorized: {0}")]
    AuthError(String),

    // 403 Forbidden
    #[error("forbidden: {0}")]
    Forbidden(String),

    // 404 Not Found
    #[error("not found: {0}")]
    NotFound(String),

    // 409 Conflict (session state or submission guard)
    #[error("conflict: {0}")]
    Conflict(String),

    // 502 Bad Gateway (store or sandbox failed)
    #[error("upstream failure: {0}")]
    Upstream(String),
}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Upstream(msg) => {
                tracing::warn!("Upstream failure: {}", msg);
                (StatusCode::BAD_GATEWAY, msg)
            }
        };
        let body = Json(json!({
            "success": false,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => AppError::NotFound(msg),
            other => AppError::Upstream(other.to_string()),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Load(store) => AppError::from(store),
            SessionError::UnknownOption(_) | SessionError::NotQuizExam | SessionError::NotCodingExam => {
                AppError::BadRequest(err.to_string())
            }
            SessionError::Submission(_) | SessionError::Execution(_) => {
                AppError::Upstream(err.to_string())
            }
            SessionError::Closed => AppError::NotFound(err.to_string()),
            SessionError::InvalidState(_)
            | SessionError::NotOnLastQuestion
            | SessionError::TimeUp
            | SessionError::SubmissionInFlight
            | SessionError::AlreadySubmitted => AppError::Conflict(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
