// src/generation/shuffle.rs

use crate::{
    models::{
        exam::{AnswerShuffleMap, OptionShuffle},
        question::{CatalogEntry, QuestionType},
    },
    utils::random::{Randomizer, shuffled},
};

/// Randomizes presentation order. Identity when `enabled` is false.
pub fn shuffle_order(ids: Vec<i64>, enabled: bool, rng: &mut dyn Randomizer) -> Vec<i64> {
    if !enabled {
        return ids;
    }
    shuffled(rng, ids)
}

/// Permutes the option keys of one multiple-choice question.
///
/// Returns `None` for other question types, for questions with fewer than
/// two options, and for option lists whose keys are not distinct.
pub fn shuffle_options(question: &CatalogEntry, rng: &mut dyn Randomizer) -> Option<OptionShuffle> {
    if question.question_type != QuestionType::MultipleChoice || question.options.len() < 2 {
        return None;
    }

    let keys = question.option_keys();
    let permuted = shuffled(rng, keys.clone());
    match OptionShuffle::from_permutation(&keys, &permuted) {
        Ok(shuffle) => Some(shuffle),
        Err(e) => {
            tracing::warn!("Leaving options of question {} unshuffled: {}", question.id, e);
            None
        }
    }
}

/// Option shuffles for every eligible question, or `None` when disabled.
pub fn shuffle_all_options<'a>(
    questions: impl IntoIterator<Item = &'a CatalogEntry>,
    enabled: bool,
    rng: &mut dyn Randomizer,
) -> Option<AnswerShuffleMap> {
    if !enabled {
        return None;
    }
    let map = questions
        .into_iter()
        .filter_map(|q| shuffle_options(q, rng).map(|s| (q.id, s)))
        .collect();
    Some(map)
}
