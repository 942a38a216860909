// src/generation/assembler.rs

use std::collections::HashMap;

use crate::{
    error::{AppError, ExamError},
    generation::{
        sampler::{TierPools, sample_questions},
        shuffle::{shuffle_all_options, shuffle_order},
    },
    models::{
        exam::{ExamDefinition, ExamVariant, NewExamVariant},
        question::CatalogEntry,
    },
    repository::{ExamStore, QuestionCatalog},
    utils::random::Randomizer,
};

/// Labels the `sequence`-th code of a batch: "001", "002", ... "1000".
pub fn format_code(sequence: usize) -> String {
    format!("{:03}", sequence)
}

/// Builds `count` variants over one shared sample of `pools`.
///
/// The question set is drawn once; every variant then gets its own order
/// and option shuffle.
pub fn assemble_variants(
    exam: &ExamDefinition,
    pools: &TierPools,
    count: usize,
    rng: &mut dyn Randomizer,
) -> Result<Vec<NewExamVariant>, ExamError> {
    exam.difficulty.validate_against(exam.total_questions)?;

    let selected = sample_questions(pools, &exam.difficulty, exam.spread_across_chapters, rng)?;

    let by_id: HashMap<i64, &CatalogEntry> = pools
        .values()
        .flatten()
        .map(|entry| (entry.id, entry))
        .collect();

    let variants = (1..=count)
        .map(|sequence| {
            let question_order = shuffle_order(selected.clone(), exam.shuffle_questions, rng);
            let answer_shuffle = shuffle_all_options(
                question_order.iter().filter_map(|id| by_id.get(id).copied()),
                exam.shuffle_answers,
                rng,
            );
            NewExamVariant {
                code: format_code(sequence),
                question_order,
                answer_shuffle,
            }
        })
        .collect();

    Ok(variants)
}

/// Orchestrates sampling, shuffling and persistence of exam codes.
pub struct ExamCodeGenerator<'a> {
    catalog: &'a dyn QuestionCatalog,
    store: &'a dyn ExamStore,
    max_variants: usize,
}

impl<'a> ExamCodeGenerator<'a> {
    pub fn new(catalog: &'a dyn QuestionCatalog, store: &'a dyn ExamStore, max_variants: usize) -> Self {
        Self {
            catalog,
            store,
            max_variants,
        }
    }

    /// Generates and stores `count` codes for the exam, replacing any
    /// codes generated earlier.
    ///
    /// Every configuration check runs before the catalog is sampled and
    /// the batch is written in one transaction, so on error nothing changes.
    pub async fn generate(
        &self,
        exam_id: i64,
        count: usize,
        rng: &mut dyn Randomizer,
    ) -> Result<Vec<ExamVariant>, AppError> {
        if count == 0 || count > self.max_variants {
            return Err(ExamError::InvalidVariantCount {
                requested: count,
                max: self.max_variants,
            }
            .into());
        }

        let exam = self
            .store
            .find_exam(exam_id)
            .await?
            .ok_or_else(|| ExamError::NotFound(format!("exam {}", exam_id)))?;

        exam.difficulty.validate_against(exam.total_questions)?;

        if self.catalog.chapter_count(exam.question_bank_id).await? == 0 {
            return Err(ExamError::BankHasNoChapters {
                bank_id: exam.question_bank_id,
            }
            .into());
        }

        let mut pools = TierPools::new();
        for (tier, _) in exam.difficulty.tiers() {
            let questions = self
                .catalog
                .questions_by_difficulty(exam.question_bank_id, tier)
                .await?;
            pools.insert(tier, questions);
        }

        let variants = assemble_variants(&exam, &pools, count, rng).map_err(|e| {
            tracing::warn!("Exam {} code generation rejected: {}", exam.id, e);
            e
        })?;

        let saved = self.store.replace_variants(exam.id, variants).await?;
        tracing::info!(
            "Generated {} exam codes for exam {} ({} questions each)",
            saved.len(),
            exam.id,
            exam.total_questions
        );
        Ok(saved)
    }
}
