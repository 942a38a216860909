// src/handlers/grading.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    grading::SubmissionGrader,
    models::submission::{ManualAnswerScoreRequest, ManualTotalRequest},
    state::AppState,
};

fn grader(state: &AppState) -> SubmissionGrader<'_> {
    SubmissionGrader::new(
        state.catalog.as_ref(),
        state.exams.as_ref(),
        state.submissions.as_ref(),
    )
}

/// Auto-grades a submitted attempt.
/// Essays are left for a grader; the submission then awaits manual grading.
pub async fn auto_grade(
    State(state): State<AppState>,
    Path(submission_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let summary = grader(&state).auto_grade(submission_id).await?;
    Ok(Json(summary))
}

/// Sets the final total score of a submission.
pub async fn set_total_score(
    State(state): State<AppState>,
    Path(submission_id): Path<i64>,
    Json(payload): Json<ManualTotalRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let summary = grader(&state)
        .set_total_score(submission_id, payload.total_score)
        .await?;
    Ok(Json(summary))
}

/// Scores a single answer by hand.
pub async fn grade_answer(
    State(state): State<AppState>,
    Path((submission_id, question_id)): Path<(i64, i64)>,
    Json(payload): Json<ManualAnswerScoreRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let summary = grader(&state)
        .grade_answer(submission_id, question_id, payload.score)
        .await?;
    Ok(Json(summary))
}
