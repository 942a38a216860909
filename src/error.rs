// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

use crate::models::question::Difficulty;

/// Failures raised by exam code generation and score bookkeeping.
///
/// Configuration and inventory errors are always raised before anything
/// is persisted, so a caller seeing one of these knows nothing was written.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExamError {
    #[error("question bank {bank_id} has no chapters")]
    BankHasNoChapters { bank_id: i64 },

    #[error("difficulty config sums to {configured} but the exam requires {total_questions} questions")]
    DifficultyMismatch {
        configured: usize,
        total_questions: usize,
    },

    #[error("exam must contain at least one question")]
    EmptyExam,

    #[error("variant count must be between 1 and {max}, got {requested}")]
    InvalidVariantCount { requested: usize, max: usize },

    #[error(
        "not enough {tier} questions: {available} available, {requested} requested (short by {})",
        shortfall(.available, .requested)
    )]
    InsufficientQuestions {
        tier: Difficulty,
        available: usize,
        requested: usize,
    },

    #[error("exam submission {submission_id} has no exam code")]
    ExamWithoutCode { submission_id: i64 },

    #[error("score {score} is outside the allowed range 0..={max}")]
    ScoreOutOfRange { score: f64, max: f64 },

    #[error("{0} not found")]
    NotFound(String),
}

fn shortfall(available: &usize, requested: &usize) -> usize {
    requested.saturating_sub(*available)
}

/// Per-answer grading failure. Never aborts the rest of a submission.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradingError {
    #[error("question {0} is not in the catalog")]
    UnknownQuestion(i64),

    #[error("question {0} has no correct answer configured")]
    MissingAnswerKey(i64),
}

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., grading a submission that is not ready)
    Conflict(String),

    // 422 Unprocessable Entity (the bank cannot satisfy the request)
    Unprocessable(String),
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
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<ExamError> for AppError {
    fn from(err: ExamError) -> Self {
        match err {
            ExamError::InsufficientQuestions { .. } | ExamError::ExamWithoutCode { .. } => {
                AppError::Unprocessable(err.to_string())
            }
            ExamError::NotFound(_) => AppError::NotFound(err.to_string()),
            _ => AppError::BadRequest(err.to_string()),
        }
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
