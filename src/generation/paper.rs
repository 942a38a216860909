// src/generation/paper.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{
    exam::ExamVariant,
    question::{AnswerOption, CatalogEntry, PublicQuestion},
};

/// An exam code as the learner sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamPaper {
    pub exam_id: i64,
    pub code: String,
    pub questions: Vec<PublicQuestion>,
}

/// Lays out the variant's questions in order, relabelling options through
/// the variant's option shuffle. Correct answers are never included.
pub fn render_paper(variant: &ExamVariant, questions: &[CatalogEntry]) -> ExamPaper {
    let by_id: HashMap<i64, &CatalogEntry> = questions.iter().map(|q| (q.id, q)).collect();

    let rendered = variant
        .question_order
        .iter()
        .filter_map(|id| {
            let question = by_id.get(id);
            if question.is_none() {
                tracing::warn!("Exam code {} references missing question {}", variant.id, id);
            }
            question
        })
        .map(|question| PublicQuestion {
            id: question.id,
            question_type: question.question_type,
            content: question.content.clone(),
            options: presented_options(question, variant),
            points: question.points,
        })
        .collect();

    ExamPaper {
        exam_id: variant.exam_id,
        code: variant.code.clone(),
        questions: rendered,
    }
}

fn presented_options(question: &CatalogEntry, variant: &ExamVariant) -> Vec<AnswerOption> {
    let Some(shuffle) = variant.option_shuffle(question.id) else {
        return question.options.clone();
    };

    let text_of: HashMap<&str, &str> = question
        .options
        .iter()
        .map(|o| (o.key.as_str(), o.text.as_str()))
        .collect();

    question
        .options
        .iter()
        .map(|slot| {
            let original = shuffle.to_original(&slot.key).unwrap_or(&slot.key);
            AnswerOption {
                key: slot.key.clone(),
                text: text_of.get(original).copied().unwrap_or(&slot.text).to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{
        generation::sampler::tests::entry,
        models::{exam::OptionShuffle, question::Difficulty},
    };

    fn shuffle(pairs: &[(&str, &str)]) -> OptionShuffle {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        OptionShuffle::try_from(map).unwrap()
    }

    #[test]
    fn options_follow_the_shuffle_map() {
        let question = entry(5, 1, Difficulty::Easy);
        let mut answer_shuffle = BTreeMap::new();
        answer_shuffle.insert(5, shuffle(&[("A", "C"), ("B", "A"), ("C", "B"), ("D", "D")]));
        let variant = ExamVariant {
            id: 1,
            exam_id: 2,
            code: "001".to_string(),
            question_order: vec![5],
            answer_shuffle: Some(answer_shuffle),
            created_at: None,
        };

        let paper = render_paper(&variant, &[question]);
        let options = &paper.questions[0].options;
        assert_eq!(options[0].key, "A");
        assert_eq!(options[0].text, "Option C of 5");
        assert_eq!(options[1].text, "Option A of 5");
        assert_eq!(options[3].text, "Option D of 5");
    }

    #[test]
    fn order_follows_variant_and_skips_missing() {
        let variant = ExamVariant {
            id: 1,
            exam_id: 2,
            code: "002".to_string(),
            question_order: vec![3, 99, 1],
            answer_shuffle: None,
            created_at: None,
        };
        let questions = vec![entry(1, 1, Difficulty::Easy), entry(3, 1, Difficulty::Hard)];

        let paper = render_paper(&variant, &questions);
        let ids: Vec<_> = paper.questions.iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(paper.code, "002");
    }

    #[test]
    fn paper_hides_correct_answers() {
        let variant = ExamVariant {
            id: 1,
            exam_id: 2,
            code: "001".to_string(),
            question_order: vec![1],
            answer_shuffle: None,
            created_at: None,
        };
        let paper = render_paper(&variant, &[entry(1, 1, Difficulty::Easy)]);
        let json = serde_json::to_value(&paper).unwrap();
        assert!(json["questions"][0].get("correct_answer").is_none());
    }
}
