// src/models/exam.rs

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{error::ExamError, models::question::Difficulty};

/// Required question count per difficulty tier for one exam variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DifficultyConfig(BTreeMap<Difficulty, usize>);

impl DifficultyConfig {
    pub fn new(counts: impl IntoIterator<Item = (Difficulty, usize)>) -> Self {
        Self(counts.into_iter().collect())
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    /// Tiers with a non-zero target, easiest first.
    pub fn tiers(&self) -> impl Iterator<Item = (Difficulty, usize)> + '_ {
        self.0.iter().filter(|(_, n)| **n > 0).map(|(t, n)| (*t, *n))
    }

    /// Checks that the tier counts add up to the exam's question total.
    pub fn validate_against(&self, total_questions: usize) -> Result<(), ExamError> {
        if total_questions == 0 {
            return Err(ExamError::EmptyExam);
        }
        let configured = self.total();
        if configured != total_questions {
            return Err(ExamError::DifficultyMismatch {
                configured,
                total_questions,
            });
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

/// Everything the generator needs to know about one exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamDefinition {
    pub id: i64,
    pub question_bank_id: i64,
    pub total_questions: usize,
    pub difficulty: DifficultyConfig,
    pub shuffle_questions: bool,
    pub shuffle_answers: bool,
    /// Spread each tier's draw across chapters.
    #[serde(default = "default_true")]
    pub spread_across_chapters: bool,
}

/// Bijective relabelling of a question's option keys.
///
/// Stored as `presented key -> original key`. Both directions are kept so
/// either translation is a single lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct OptionShuffle {
    presented_to_original: HashMap<String, String>,
    original_to_presented: HashMap<String, String>,
}

impl OptionShuffle {
    /// Pairs `keys[i]` (presented) with `permuted[i]` (original).
    /// Both slices must hold the same keys.
    pub fn from_permutation(keys: &[String], permuted: &[String]) -> Result<Self, String> {
        if keys.len() != permuted.len() {
            return Err(format!(
                "permutation has {} keys, expected {}",
                permuted.len(),
                keys.len()
            ));
        }
        let map: BTreeMap<String, String> = keys
            .iter()
            .cloned()
            .zip(permuted.iter().cloned())
            .collect();
        if map.len() != keys.len() {
            return Err("option keys are not distinct".to_string());
        }
        Self::try_from(map)
    }

    /// Presented key -> original key. Falls back to an upper-cased lookup.
    pub fn to_original(&self, presented: &str) -> Option<&str> {
        self.presented_to_original
            .get(presented)
            .or_else(|| self.presented_to_original.get(&presented.to_uppercase()))
            .map(String::as_str)
    }

    /// Original key -> presented key.
    pub fn to_presented(&self, original: &str) -> Option<&str> {
        self.original_to_presented
            .get(original)
            .or_else(|| self.original_to_presented.get(&original.to_uppercase()))
            .map(String::as_str)
    }

    pub fn as_map(&self) -> BTreeMap<String, String> {
        self.presented_to_original
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl TryFrom<BTreeMap<String, String>> for OptionShuffle {
    type Error = String;

    fn try_from(map: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        let keys: BTreeSet<&String> = map.keys().collect();
        let values: BTreeSet<&String> = map.values().collect();
        if values.len() != map.len() {
            return Err("option shuffle maps two keys onto the same option".to_string());
        }
        if keys != values {
            return Err("option shuffle is not a permutation of its own keys".to_string());
        }

        let original_to_presented = map.iter().map(|(k, v)| (v.clone(), k.clone())).collect();
        Ok(Self {
            presented_to_original: map.into_iter().collect(),
            original_to_presented,
        })
    }
}

impl From<OptionShuffle> for BTreeMap<String, String> {
    fn from(shuffle: OptionShuffle) -> Self {
        shuffle.presented_to_original.into_iter().collect()
    }
}

/// Per-question option shuffles of one variant, keyed by question id.
pub type AnswerShuffleMap = BTreeMap<i64, OptionShuffle>;

/// One generated exam code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamVariant {
    pub id: i64,
    pub exam_id: i64,
    /// Zero-padded sequence label, e.g. "001".
    pub code: String,
    pub question_order: Vec<i64>,
    pub answer_shuffle: Option<AnswerShuffleMap>,
    pub created_at: Option<DateTime<Utc>>,
}

impl ExamVariant {
    pub fn option_shuffle(&self, question_id: i64) -> Option<&OptionShuffle> {
        self.answer_shuffle.as_ref()?.get(&question_id)
    }
}

/// A variant that has been assembled but not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExamVariant {
    pub code: String,
    pub question_order: Vec<i64>,
    pub answer_shuffle: Option<AnswerShuffleMap>,
}

/// DTO for requesting a batch of exam codes.
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateCodesRequest {
    #[validate(range(min = 1, message = "At least one exam code must be requested."))]
    pub count: usize,
}

/// DTO for returning a generated batch.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExamCodesResponse {
    pub exam_id: i64,
    pub codes: Vec<ExamVariant>,
}
