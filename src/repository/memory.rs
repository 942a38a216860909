// src/repository/memory.rs

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    error::AppError,
    models::{
        exam::{ExamDefinition, ExamVariant, NewExamVariant},
        question::{CatalogEntry, Difficulty},
        submission::Submission,
    },
    repository::{ExamStore, QuestionCatalog, SubmissionStore},
};

#[derive(Default)]
struct MemoryState {
    chapters: HashMap<i64, BTreeSet<i64>>,
    questions: BTreeMap<i64, (CatalogEntry, bool)>,
    exams: HashMap<i64, ExamDefinition>,
    variants: BTreeMap<i64, ExamVariant>,
    next_variant_id: i64,
    submissions: HashMap<i64, Submission>,
    fail_variant_write_at: Option<usize>,
}

/// In-process store implementing every repository trait.
#[derive(Default)]
pub struct MemoryRepository {
    state: RwLock<MemoryState>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a question and registers its chapter with the bank.
    pub async fn add_question(&self, entry: CatalogEntry) {
        let mut state = self.state.write().await;
        state
            .chapters
            .entry(entry.question_bank_id)
            .or_default()
            .insert(entry.chapter_id);
        state.questions.insert(entry.id, (entry, false));
    }

    pub async fn soft_delete_question(&self, question_id: i64) {
        let mut state = self.state.write().await;
        if let Some((_, deleted)) = state.questions.get_mut(&question_id) {
            *deleted = true;
        }
    }

    pub async fn add_exam(&self, exam: ExamDefinition) {
        self.state.write().await.exams.insert(exam.id, exam);
    }

    pub async fn add_submission(&self, submission: Submission) {
        self.state
            .write()
            .await
            .submissions
            .insert(submission.id, submission);
    }

    /// Makes the next batch write fail while inserting the variant at `index`.
    pub async fn fail_variant_write_at(&self, index: usize) {
        self.state.write().await.fail_variant_write_at = Some(index);
    }

    pub async fn variant_count(&self) -> usize {
        self.state.read().await.variants.len()
    }
}

#[async_trait]
impl QuestionCatalog for MemoryRepository {
    async fn chapter_count(&self, question_bank_id: i64) -> Result<usize, AppError> {
        let state = self.state.read().await;
        Ok(state.chapters.get(&question_bank_id).map_or(0, BTreeSet::len))
    }

    async fn questions_by_difficulty(
        &self,
        question_bank_id: i64,
        tier: Difficulty,
    ) -> Result<Vec<CatalogEntry>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .questions
            .values()
            .filter(|(q, deleted)| {
                !deleted && q.question_bank_id == question_bank_id && q.difficulty == tier
            })
            .map(|(q, _)| q.clone())
            .collect())
    }

    async fn questions_by_ids(&self, ids: &[i64]) -> Result<Vec<CatalogEntry>, AppError> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.questions.get(id))
            .map(|(q, _)| q.clone())
            .collect())
    }
}

#[async_trait]
impl ExamStore for MemoryRepository {
    async fn find_exam(&self, exam_id: i64) -> Result<Option<ExamDefinition>, AppError> {
        Ok(self.state.read().await.exams.get(&exam_id).cloned())
    }

    async fn replace_variants(
        &self,
        exam_id: i64,
        variants: Vec<NewExamVariant>,
    ) -> Result<Vec<ExamVariant>, AppError> {
        let mut state = self.state.write().await;
        if !state.exams.contains_key(&exam_id) {
            return Err(AppError::NotFound(format!("exam {} not found", exam_id)));
        }

        // Stage the whole batch first so a failure leaves the store untouched.
        let fail_at = state.fail_variant_write_at.take();
        let now = Utc::now();
        let mut staged = Vec::with_capacity(variants.len());
        for (i, variant) in variants.into_iter().enumerate() {
            if fail_at == Some(i) {
                return Err(AppError::InternalServerError(format!(
                    "simulated write failure at variant {}",
                    i
                )));
            }
            staged.push(ExamVariant {
                id: state.next_variant_id + 1 + i as i64,
                exam_id,
                code: variant.code,
                question_order: variant.question_order,
                answer_shuffle: variant.answer_shuffle,
                created_at: Some(now),
            });
        }

        state.variants.retain(|_, v| v.exam_id != exam_id);
        state.next_variant_id += staged.len() as i64;
        for variant in &staged {
            state.variants.insert(variant.id, variant.clone());
        }
        Ok(staged)
    }

    async fn list_variants(&self, exam_id: i64) -> Result<Vec<ExamVariant>, AppError> {
        let state = self.state.read().await;
        let mut variants: Vec<ExamVariant> = state
            .variants
            .values()
            .filter(|v| v.exam_id == exam_id)
            .cloned()
            .collect();
        variants.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(variants)
    }

    async fn find_variant(&self, variant_id: i64) -> Result<Option<ExamVariant>, AppError> {
        Ok(self.state.read().await.variants.get(&variant_id).cloned())
    }
}

#[async_trait]
impl SubmissionStore for MemoryRepository {
    async fn find_submission(&self, submission_id: i64) -> Result<Option<Submission>, AppError> {
        Ok(self
            .state
            .read()
            .await
            .submissions
            .get(&submission_id)
            .cloned())
    }

    async fn save_grades(&self, submission: &Submission) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        match state.submissions.get_mut(&submission.id) {
            Some(stored) => {
                *stored = submission.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!(
                "submission {} not found",
                submission.id
            ))),
        }
    }
}
