// src/handlers/exam_code.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    generation::{ExamCodeGenerator, render_paper},
    models::exam::{ExamCodesResponse, GenerateCodesRequest},
    state::AppState,
    utils::random::RngRandomizer,
};

/// Generates a batch of exam codes for an exam.
///
/// * Samples one question set per the exam's difficulty config.
/// * Shuffles question order and options independently per code.
/// * Replaces previously generated codes; numbering restarts at "001".
pub async fn generate_codes(
    State(state): State<AppState>,
    Path(exam_id): Path<i64>,
    Json(payload): Json<GenerateCodesRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let generator = ExamCodeGenerator::new(
        state.catalog.as_ref(),
        state.exams.as_ref(),
        state.config.max_variants_per_request,
    );
    let mut rng = RngRandomizer::from_os_rng();
    let codes = generator.generate(exam_id, payload.count, &mut rng).await?;

    Ok((StatusCode::CREATED, Json(ExamCodesResponse { exam_id, codes })))
}

/// Lists the generated codes of an exam in code order.
pub async fn list_codes(
    State(state): State<AppState>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if state.exams.find_exam(exam_id).await?.is_none() {
        return Err(AppError::NotFound(format!("exam {} not found", exam_id)));
    }
    let codes = state.exams.list_variants(exam_id).await?;

    Ok(Json(ExamCodesResponse { exam_id, codes }))
}

/// Renders one exam code for the learner, without answers.
pub async fn get_paper(
    State(state): State<AppState>,
    Path(code_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let variant = state
        .exams
        .find_variant(code_id)
        .await?
        .ok_or(AppError::NotFound(format!("exam code {} not found", code_id)))?;

    let questions = state
        .catalog
        .questions_by_ids(&variant.question_order)
        .await?;

    Ok(Json(render_paper(&variant, &questions)))
}
