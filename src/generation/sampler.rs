// src/generation/sampler.rs

use std::collections::BTreeMap;

use crate::{
    error::ExamError,
    models::{
        exam::DifficultyConfig,
        question::{CatalogEntry, Difficulty},
    },
    utils::random::{Randomizer, sample, shuffled},
};

/// Catalog questions of one bank, partitioned by difficulty tier.
pub type TierPools = BTreeMap<Difficulty, Vec<CatalogEntry>>;

/// Fails if any tier holds fewer questions than the config asks for.
///
/// Runs over every tier before anything is drawn, so a shortage is reported
/// without a partial selection ever existing.
pub fn check_inventory(pools: &TierPools, config: &DifficultyConfig) -> Result<(), ExamError> {
    for (tier, requested) in config.tiers() {
        let available = pools.get(&tier).map_or(0, Vec::len);
        if available < requested {
            return Err(ExamError::InsufficientQuestions {
                tier,
                available,
                requested,
            });
        }
    }
    Ok(())
}

/// Selects exactly the configured number of question ids per tier.
///
/// Output is grouped by tier, easiest first. With `spread_across_chapters`
/// each tier's draw rotates over that tier's chapters.
pub fn sample_questions(
    pools: &TierPools,
    config: &DifficultyConfig,
    spread_across_chapters: bool,
    rng: &mut dyn Randomizer,
) -> Result<Vec<i64>, ExamError> {
    check_inventory(pools, config)?;

    let mut selected = Vec::with_capacity(config.total());
    for (tier, wanted) in config.tiers() {
        let pool = pools.get(&tier).map(Vec::as_slice).unwrap_or_default();
        let drawn = sample_tier(pool, wanted, spread_across_chapters, rng);
        tracing::debug!("Sampled {} {} questions from {} candidates", drawn.len(), tier, pool.len());
        selected.extend(drawn);
    }
    Ok(selected)
}

fn sample_tier(
    pool: &[CatalogEntry],
    wanted: usize,
    spread_across_chapters: bool,
    rng: &mut dyn Randomizer,
) -> Vec<i64> {
    let mut by_chapter: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    for entry in pool {
        by_chapter.entry(entry.chapter_id).or_default().push(entry.id);
    }

    if !spread_across_chapters || by_chapter.len() <= 1 {
        let ids: Vec<i64> = pool.iter().map(|e| e.id).collect();
        return sample(rng, &ids, wanted);
    }

    draw_across_chapters(by_chapter.into_values().collect(), wanted, rng)
}

/// Round-robin draw: every chapter gets ⌊wanted / chapters⌋ questions and the
/// first `wanted % chapters` chapters of a random rotation get one more.
/// Chapters that run dry leave a gap that is topped up one question at a time
/// from the rest.
fn draw_across_chapters(
    chapters: Vec<Vec<i64>>,
    wanted: usize,
    rng: &mut dyn Randomizer,
) -> Vec<i64> {
    // Shuffling each bucket and taking a prefix is sampling without replacement.
    let mut buckets: Vec<Vec<i64>> = shuffled(rng, chapters)
        .into_iter()
        .map(|bucket| shuffled(rng, bucket))
        .collect();

    let base = wanted / buckets.len();
    let extra = wanted % buckets.len();
    let mut picked = Vec::with_capacity(wanted);

    for (i, bucket) in buckets.iter_mut().enumerate() {
        let quota = if i < extra { base + 1 } else { base };
        let take = quota.min(bucket.len());
        picked.extend(bucket.drain(..take));
    }

    while picked.len() < wanted {
        let before = picked.len();
        for bucket in buckets.iter_mut() {
            if picked.len() == wanted {
                break;
            }
            if let Some(id) = bucket.pop() {
                picked.push(id);
            }
        }
        if picked.len() == before {
            break;
        }
    }

    picked
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::{HashMap, HashSet};

    use super::*;
    use crate::{models::question::QuestionType, utils::random::RngRandomizer};

    pub(crate) fn entry(id: i64, chapter_id: i64, difficulty: Difficulty) -> CatalogEntry {
        CatalogEntry {
            id,
            question_bank_id: 1,
            chapter_id,
            difficulty,
            question_type: QuestionType::MultipleChoice,
            content: format!("Question {}", id),
            options: ["A", "B", "C", "D"]
                .iter()
                .map(|k| crate::models::question::AnswerOption {
                    key: k.to_string(),
                    text: format!("Option {} of {}", k, id),
                })
                .collect(),
            correct_answer: Some("A".to_string()),
            points: 1.0,
        }
    }

    /// `per_chapter` questions of each tier in each of `chapters` chapters.
    pub(crate) fn pools(chapters: i64, per_chapter: &[(Difficulty, usize)]) -> TierPools {
        let mut next_id = 1;
        let mut pools = TierPools::new();
        for &(tier, count) in per_chapter {
            for chapter in 1..=chapters {
                for _ in 0..count {
                    pools.entry(tier).or_default().push(entry(next_id, chapter, tier));
                    next_id += 1;
                }
            }
        }
        pools
    }

    fn standard_config() -> DifficultyConfig {
        DifficultyConfig::new([
            (Difficulty::Easy, 15),
            (Difficulty::Medium, 10),
            (Difficulty::Hard, 5),
        ])
    }

    #[test]
    fn yields_exact_counts_per_tier() {
        let pools = pools(
            1,
            &[(Difficulty::Easy, 20), (Difficulty::Medium, 15), (Difficulty::Hard, 10)],
        );
        let tier_of: HashMap<i64, Difficulty> = pools
            .values()
            .flatten()
            .map(|e| (e.id, e.difficulty))
            .collect();

        let mut rng = RngRandomizer::seeded(1);
        let picked = sample_questions(&pools, &standard_config(), true, &mut rng).unwrap();

        assert_eq!(picked.len(), 30);
        let unique: HashSet<_> = picked.iter().collect();
        assert_eq!(unique.len(), 30);

        let count = |t| picked.iter().filter(|id| tier_of[*id] == t).count();
        assert_eq!(count(Difficulty::Easy), 15);
        assert_eq!(count(Difficulty::Medium), 10);
        assert_eq!(count(Difficulty::Hard), 5);
    }

    #[test]
    fn spreads_across_every_chapter() {
        let pools = pools(3, &[(Difficulty::Easy, 10)]);
        let chapter_of: HashMap<i64, i64> = pools
            .values()
            .flatten()
            .map(|e| (e.id, e.chapter_id))
            .collect();
        let config = DifficultyConfig::new([(Difficulty::Easy, 7)]);

        let mut rng = RngRandomizer::seeded(9);
        let picked = sample_questions(&pools, &config, true, &mut rng).unwrap();

        assert_eq!(picked.len(), 7);
        let mut per_chapter: HashMap<i64, usize> = HashMap::new();
        for id in &picked {
            *per_chapter.entry(chapter_of[id]).or_default() += 1;
        }
        assert_eq!(per_chapter.len(), 3);
        let mut counts: Vec<usize> = per_chapter.into_values().collect();
        counts.sort();
        assert_eq!(counts, vec![2, 2, 3]);
    }

    #[test]
    fn uneven_split_still_reaches_every_chapter() {
        let pools = pools(3, &[(Difficulty::Hard, 5)]);
        let chapter_of: HashMap<i64, i64> = pools
            .values()
            .flatten()
            .map(|e| (e.id, e.chapter_id))
            .collect();
        let config = DifficultyConfig::new([(Difficulty::Hard, 4)]);

        for seed in 0..20 {
            let mut rng = RngRandomizer::seeded(seed);
            let picked = sample_questions(&pools, &config, true, &mut rng).unwrap();

            let mut per_chapter: HashMap<i64, usize> = HashMap::new();
            for id in &picked {
                *per_chapter.entry(chapter_of[id]).or_default() += 1;
            }
            assert_eq!(per_chapter.len(), 3, "seed {}: {:?}", seed, per_chapter);
            let mut counts: Vec<usize> = per_chapter.into_values().collect();
            counts.sort();
            assert_eq!(counts, vec![1, 1, 2]);
        }
    }

    #[test]
    fn fewer_questions_than_chapters_uses_distinct_chapters() {
        let pools = pools(4, &[(Difficulty::Medium, 3)]);
        let chapter_of: HashMap<i64, i64> = pools
            .values()
            .flatten()
            .map(|e| (e.id, e.chapter_id))
            .collect();
        let config = DifficultyConfig::new([(Difficulty::Medium, 3)]);

        let mut rng = RngRandomizer::seeded(5);
        let picked = sample_questions(&pools, &config, true, &mut rng).unwrap();
        let chapters: HashSet<i64> = picked.iter().map(|id| chapter_of[id]).collect();
        assert_eq!(chapters.len(), 3);
    }

    #[test]
    fn tops_up_when_a_chapter_runs_dry() {
        let mut pools = TierPools::new();
        let easy = pools.entry(Difficulty::Easy).or_default();
        easy.push(entry(1, 1, Difficulty::Easy));
        for id in 2..=10 {
            easy.push(entry(id, 2, Difficulty::Easy));
        }
        let config = DifficultyConfig::new([(Difficulty::Easy, 8)]);

        let mut rng = RngRandomizer::seeded(4);
        let picked = sample_questions(&pools, &config, true, &mut rng).unwrap();

        assert_eq!(picked.len(), 8);
        assert!(picked.contains(&1));
        let unique: HashSet<_> = picked.iter().collect();
        assert_eq!(unique.len(), 8);
    }

    #[test]
    fn shortage_fails_with_tier_and_counts() {
        let pools = pools(2, &[(Difficulty::Easy, 10), (Difficulty::Hard, 2)]);
        let config = DifficultyConfig::new([(Difficulty::Easy, 5), (Difficulty::Hard, 6)]);

        let mut rng = RngRandomizer::seeded(2);
        let err = sample_questions(&pools, &config, true, &mut rng).unwrap_err();
        assert_eq!(
            err,
            ExamError::InsufficientQuestions {
                tier: Difficulty::Hard,
                available: 4,
                requested: 6,
            }
        );
    }

    #[test]
    fn missing_tier_counts_as_empty() {
        let pools = pools(1, &[(Difficulty::Easy, 3)]);
        let config = DifficultyConfig::new([(Difficulty::Medium, 1)]);

        let mut rng = RngRandomizer::seeded(2);
        let err = sample_questions(&pools, &config, false, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            ExamError::InsufficientQuestions { tier: Difficulty::Medium, available: 0, .. }
        ));
    }

    #[test]
    fn without_spread_still_exact() {
        let pools = pools(4, &[(Difficulty::Medium, 5)]);
        let config = DifficultyConfig::new([(Difficulty::Medium, 12)]);

        let mut rng = RngRandomizer::seeded(8);
        let picked = sample_questions(&pools, &config, false, &mut rng).unwrap();
        let unique: HashSet<_> = picked.iter().collect();
        assert_eq!(unique.len(), 12);
    }
}
