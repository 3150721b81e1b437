// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::services::QuizError;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., answering a completed attempt)
    Conflict(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

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
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Maps engine errors to HTTP errors.
/// An attempt owned by someone else is indistinguishable from a missing one.
impl From<QuizError> for AppError {
    fn from(err: QuizError) -> Self {
        match err {
            QuizError::QuizNotFound => AppError::NotFound("Quiz not found".to_string()),
            QuizError::QuestionNotFound => AppError::NotFound("Question not found".to_string()),
            QuizError::UserNotFound => AppError::NotFound("User not found".to_string()),
            QuizError::AttemptNotFound | QuizError::AccessDenied => {
                AppError::NotFound("Quiz attempt not found".to_string())
            }
            QuizError::AttemptAlreadyCompleted => {
                AppError::Conflict("Quiz attempt is already completed".to_string())
            }
            QuizError::AnswerAlreadySubmitted => {
                AppError::Conflict("Question already answered in this attempt".to_string())
            }
            QuizError::InvalidInput(msg) => AppError::BadRequest(msg),
            QuizError::Store(e) => AppError::InternalServerError(e.to_string()),
        }
    }
}
