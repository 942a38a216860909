// src/repository/mod.rs

//! Persistence seams used by generation and grading.
//!
//! The core only ever talks to these traits. `postgres` is the production
//! implementation, `memory` backs tests and local experiments.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        exam::{ExamDefinition, ExamVariant, NewExamVariant},
        question::{CatalogEntry, Difficulty},
        submission::Submission,
    },
};

/// Read-only view over stored questions.
#[async_trait]
pub trait QuestionCatalog: Send + Sync {
    /// Number of chapters defined for the bank.
    async fn chapter_count(&self, question_bank_id: i64) -> Result<usize, AppError>;

    /// Every non-deleted question of the bank in the given tier.
    async fn questions_by_difficulty(
        &self,
        question_bank_id: i64,
        tier: Difficulty,
    ) -> Result<Vec<CatalogEntry>, AppError>;

    /// Questions by id, including soft-deleted ones so old attempts stay gradable.
    async fn questions_by_ids(&self, ids: &[i64]) -> Result<Vec<CatalogEntry>, AppError>;
}

#[async_trait]
pub trait ExamStore: Send + Sync {
    async fn find_exam(&self, exam_id: i64) -> Result<Option<ExamDefinition>, AppError>;

    /// Atomically drops the exam's existing codes and inserts `variants`.
    /// Either the whole batch is stored or nothing changes.
    async fn replace_variants(
        &self,
        exam_id: i64,
        variants: Vec<NewExamVariant>,
    ) -> Result<Vec<ExamVariant>, AppError>;

    /// Codes of the exam, ordered by code.
    async fn list_variants(&self, exam_id: i64) -> Result<Vec<ExamVariant>, AppError>;

    async fn find_variant(&self, variant_id: i64) -> Result<Option<ExamVariant>, AppError>;
}

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn find_submission(&self, submission_id: i64) -> Result<Option<Submission>, AppError>;

    /// Atomically writes answer scores and submission totals.
    async fn save_grades(&self, submission: &Submission) -> Result<(), AppError>;
}
