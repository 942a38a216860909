// src/repository/postgres.rs

//! sqlx/Postgres implementation of the repository traits.
//!
//! Expected tables (owned by the surrounding application's migrations):
//! `chapters(id, question_bank_id)`,
//! `questions(id, chapter_id, difficulty, type, content, options JSONB,
//! correct_answer, points FLOAT8, deleted_at)`,
//! `exams(id, question_bank_id, total_questions, difficulty_config JSONB,
//! shuffle_questions, shuffle_answers, spread_across_chapters)`,
//! `exam_codes(id, exam_id, code, question_order JSONB, answer_shuffle JSONB,
//! created_at)`,
//! `exam_submissions(id, kind, exam_code_id, status, auto_score, manual_score,
//! total_score, manual_total, graded_at)`,
//! `submission_answers(id, submission_id, question_id, answer, is_correct,
//! score, manually_graded)`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};

use crate::{
    error::AppError,
    models::{
        exam::{AnswerShuffleMap, DifficultyConfig, ExamDefinition, ExamVariant, NewExamVariant},
        question::{AnswerOption, CatalogEntry, Difficulty},
        submission::{Submission, SubmissionAnswer},
    },
    repository::{ExamStore, QuestionCatalog, SubmissionStore},
};

const QUESTION_COLUMNS: &str = r#"
    q.id,
    c.question_bank_id,
    q.chapter_id,
    q.difficulty,
    q.type AS question_type,
    q.content,
    q.options,
    q.correct_answer,
    q.points
"#;

#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Helper struct for reading question rows.
#[derive(sqlx::FromRow)]
struct QuestionRow {
    id: i64,
    question_bank_id: i64,
    chapter_id: i64,
    difficulty: String,
    question_type: String,
    content: String,
    options: Json<Vec<AnswerOption>>,
    correct_answer: Option<String>,
    points: f64,
}

impl TryFrom<QuestionRow> for CatalogEntry {
    type Error = AppError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        Ok(CatalogEntry {
            id: row.id,
            question_bank_id: row.question_bank_id,
            chapter_id: row.chapter_id,
            difficulty: row.difficulty.parse().map_err(AppError::InternalServerError)?,
            question_type: row
                .question_type
                .parse()
                .map_err(AppError::InternalServerError)?,
            content: row.content,
            options: row.options.0,
            correct_answer: row.correct_answer,
            points: row.points,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ExamRow {
    id: i64,
    question_bank_id: i64,
    total_questions: i32,
    difficulty_config: Json<DifficultyConfig>,
    shuffle_questions: bool,
    shuffle_answers: bool,
    spread_across_chapters: bool,
}

impl From<ExamRow> for ExamDefinition {
    fn from(row: ExamRow) -> Self {
        ExamDefinition {
            id: row.id,
            question_bank_id: row.question_bank_id,
            total_questions: row.total_questions.max(0) as usize,
            difficulty: row.difficulty_config.0,
            shuffle_questions: row.shuffle_questions,
            shuffle_answers: row.shuffle_answers,
            spread_across_chapters: row.spread_across_chapters,
        }
    }
}

#[derive(sqlx::FromRow)]
struct VariantRow {
    id: i64,
    exam_id: i64,
    code: String,
    question_order: Json<Vec<i64>>,
    answer_shuffle: Option<Json<AnswerShuffleMap>>,
    created_at: Option<DateTime<Utc>>,
}

impl From<VariantRow> for ExamVariant {
    fn from(row: VariantRow) -> Self {
        ExamVariant {
            id: row.id,
            exam_id: row.exam_id,
            code: row.code,
            question_order: row.question_order.0,
            answer_shuffle: row.answer_shuffle.map(|j| j.0),
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SubmissionRow {
    id: i64,
    kind: String,
    exam_code_id: Option<i64>,
    status: String,
    auto_score: f64,
    manual_score: f64,
    total_score: Option<f64>,
    manual_total: Option<f64>,
    graded_at: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct AnswerRow {
    id: i64,
    question_id: i64,
    answer: Option<String>,
    is_correct: Option<bool>,
    score: Option<f64>,
    manually_graded: bool,
}

impl From<AnswerRow> for SubmissionAnswer {
    fn from(row: AnswerRow) -> Self {
        SubmissionAnswer {
            id: row.id,
            question_id: row.question_id,
            answer: row.answer,
            is_correct: row.is_correct,
            score: row.score,
            manually_graded: row.manually_graded,
        }
    }
}

const VARIANT_COLUMNS: &str =
    "id, exam_id, code, question_order, answer_shuffle, created_at";

#[async_trait]
impl QuestionCatalog for PgRepository {
    async fn chapter_count(&self, question_bank_id: i64) -> Result<usize, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM chapters WHERE question_bank_id = $1")
                .bind(question_bank_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to count chapters: {:?}", e);
                    AppError::InternalServerError(e.to_string())
                })?;
        Ok(count.max(0) as usize)
    }

    async fn questions_by_difficulty(
        &self,
        question_bank_id: i64,
        tier: Difficulty,
    ) -> Result<Vec<CatalogEntry>, AppError> {
        let sql = format!(
            "SELECT {} FROM questions q
             JOIN chapters c ON c.id = q.chapter_id
             WHERE c.question_bank_id = $1 AND q.difficulty = $2 AND q.deleted_at IS NULL
             ORDER BY q.id",
            QUESTION_COLUMNS
        );
        let rows: Vec<QuestionRow> = sqlx::query_as(&sql)
            .bind(question_bank_id)
            .bind(tier.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch {} questions: {:?}", tier, e);
                AppError::InternalServerError(e.to_string())
            })?;

        rows.into_iter().map(CatalogEntry::try_from).collect()
    }

    async fn questions_by_ids(&self, ids: &[i64]) -> Result<Vec<CatalogEntry>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // Use QueryBuilder for dynamic IN clause
        let mut query_builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM questions q JOIN chapters c ON c.id = q.chapter_id WHERE q.id IN (",
            QUESTION_COLUMNS
        ));
        let mut separated = query_builder.separated(",");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows: Vec<QuestionRow> = query_builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        rows.into_iter().map(CatalogEntry::try_from).collect()
    }
}

#[async_trait]
impl ExamStore for PgRepository {
    async fn find_exam(&self, exam_id: i64) -> Result<Option<ExamDefinition>, AppError> {
        let row: Option<ExamRow> = sqlx::query_as(
            r#"
            SELECT
                id,
                question_bank_id,
                total_questions,
                difficulty_config,
                shuffle_questions,
                shuffle_answers,
                spread_across_chapters
            FROM exams
            WHERE id = $1
            "#,
        )
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ExamDefinition::from))
    }

    async fn replace_variants(
        &self,
        exam_id: i64,
        variants: Vec<NewExamVariant>,
    ) -> Result<Vec<ExamVariant>, AppError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent generations for the same exam,
        // keeping code numbering gap-free.
        sqlx::query("SELECT id FROM exams WHERE id = $1 FOR UPDATE")
            .bind(exam_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("exam {} not found", exam_id)))?;

        sqlx::query("DELETE FROM exam_codes WHERE exam_id = $1")
            .bind(exam_id)
            .execute(&mut *tx)
            .await?;

        let insert = format!(
            "INSERT INTO exam_codes (exam_id, code, question_order, answer_shuffle)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            VARIANT_COLUMNS
        );

        let mut saved = Vec::with_capacity(variants.len());
        for variant in variants {
            let row: VariantRow = sqlx::query_as(&insert)
                .bind(exam_id)
                .bind(&variant.code)
                .bind(Json(&variant.question_order))
                .bind(variant.answer_shuffle.as_ref().map(Json))
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to insert exam code {}: {:?}", variant.code, e);
                    AppError::InternalServerError(e.to_string())
                })?;
            saved.push(ExamVariant::from(row));
        }

        tx.commit().await?;
        Ok(saved)
    }

    async fn list_variants(&self, exam_id: i64) -> Result<Vec<ExamVariant>, AppError> {
        let sql = format!(
            "SELECT {} FROM exam_codes WHERE exam_id = $1 ORDER BY code",
            VARIANT_COLUMNS
        );
        let rows: Vec<VariantRow> = sqlx::query_as(&sql)
            .bind(exam_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(ExamVariant::from).collect())
    }

    async fn find_variant(&self, variant_id: i64) -> Result<Option<ExamVariant>, AppError> {
        let sql = format!("SELECT {} FROM exam_codes WHERE id = $1", VARIANT_COLUMNS);
        let row: Option<VariantRow> = sqlx::query_as(&sql)
            .bind(variant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(ExamVariant::from))
    }
}

#[async_trait]
impl SubmissionStore for PgRepository {
    async fn find_submission(&self, submission_id: i64) -> Result<Option<Submission>, AppError> {
        let row: Option<SubmissionRow> = sqlx::query_as(
            r#"
            SELECT
                id,
                kind,
                exam_code_id,
                status,
                auto_score,
                manual_score,
                total_score,
                manual_total,
                graded_at
            FROM exam_submissions
            WHERE id = $1
            "#,
        )
        .bind(submission_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let answers: Vec<AnswerRow> = sqlx::query_as(
            r#"
            SELECT id, question_id, answer, is_correct, score, manually_graded
            FROM submission_answers
            WHERE submission_id = $1
            ORDER BY id
            "#,
        )
        .bind(submission_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(Submission {
            id: row.id,
            kind: row.kind.parse().map_err(AppError::InternalServerError)?,
            exam_code_id: row.exam_code_id,
            status: row.status.parse().map_err(AppError::InternalServerError)?,
            answers: answers.into_iter().map(SubmissionAnswer::from).collect(),
            auto_score: row.auto_score,
            manual_score: row.manual_score,
            total_score: row.total_score,
            manual_total: row.manual_total,
            graded_at: row.graded_at,
        }))
    }

    async fn save_grades(&self, submission: &Submission) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        for answer in &submission.answers {
            sqlx::query(
                r#"
                UPDATE submission_answers
                SET is_correct = $1, score = $2, manually_graded = $3
                WHERE id = $4 AND submission_id = $5
                "#,
            )
            .bind(answer.is_correct)
            .bind(answer.score)
            .bind(answer.manually_graded)
            .bind(answer.id)
            .bind(submission.id)
            .execute(&mut *tx)
            .await?;
        }

        let updated = sqlx::query(
            r#"
            UPDATE exam_submissions
            SET status = $1, auto_score = $2, manual_score = $3, total_score = $4,
                manual_total = $5, graded_at = $6
            WHERE id = $7
            "#,
        )
        .bind(submission.status.as_str())
        .bind(submission.auto_score)
        .bind(submission.manual_score)
        .bind(submission.total_score)
        .bind(submission.manual_total)
        .bind(submission.graded_at)
        .bind(submission.id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to save grades for submission {}: {:?}", submission.id, e);
            AppError::InternalServerError(e.to_string())
        })?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "submission {} not found",
                submission.id
            )));
        }

        tx.commit().await?;
        Ok(())
    }
}
