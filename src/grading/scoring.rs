// src/grading/scoring.rs

use crate::{
    error::ExamError,
    models::{
        exam::ExamVariant,
        question::CatalogEntry,
        submission::{Submission, SubmissionKind},
    },
};

/// Maximum score of an exam attempt.
pub const EXAM_SCALE: f64 = 10.0;

/// How auto-graded answers turn into a score.
///
/// Assignments and exams use different conventions and are kept apart on
/// purpose; pick the strategy from the submission kind, never guess.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoringStrategy {
    /// Sum of the point weights of correct answers.
    RawPoints,
    /// `correct_count * (10 / total_questions)`, rounded to two decimals.
    NormalizedTenPoint { total_questions: usize },
}

impl ScoringStrategy {
    /// Exams normalize over the question count of their exam code, so an
    /// exam attempt without one cannot be scored.
    pub fn for_submission(
        submission: &Submission,
        variant: Option<&ExamVariant>,
    ) -> Result<Self, ExamError> {
        match (submission.kind, variant) {
            (SubmissionKind::Exam, Some(v)) => Ok(ScoringStrategy::NormalizedTenPoint {
                total_questions: v.question_order.len(),
            }),
            (SubmissionKind::Exam, None) => Err(ExamError::ExamWithoutCode {
                submission_id: submission.id,
            }),
            (SubmissionKind::Assignment, _) => Ok(ScoringStrategy::RawPoints),
        }
    }

    /// Score recorded on a single correct answer.
    pub fn award(&self, question: &CatalogEntry) -> f64 {
        match self {
            ScoringStrategy::RawPoints => question.points,
            ScoringStrategy::NormalizedTenPoint { total_questions } => {
                per_question(*total_questions)
            }
        }
    }

    /// Submission-level auto score from the graded answers.
    pub fn auto_score(&self, correct_count: usize, awarded: &[f64]) -> f64 {
        match self {
            ScoringStrategy::RawPoints => awarded.iter().fold(0.0, |acc, p| acc + p),
            ScoringStrategy::NormalizedTenPoint { total_questions } => {
                round2(correct_count as f64 * per_question(*total_questions))
            }
        }
    }
}

fn per_question(total_questions: usize) -> f64 {
    if total_questions == 0 {
        return 0.0;
    }
    EXAM_SCALE / total_questions as f64
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        generation::sampler::tests::entry,
        models::{
            question::Difficulty,
            submission::{SubmissionAnswer, SubmissionStatus},
        },
    };

    #[test]
    fn exam_scale_is_ten_points() {
        let strategy = ScoringStrategy::NormalizedTenPoint { total_questions: 40 };
        assert_eq!(strategy.auto_score(30, &[]), 7.5);
        assert_eq!(strategy.auto_score(40, &[]), 10.0);
        assert_eq!(strategy.award(&entry(1, 1, Difficulty::Easy)), 0.25);
    }

    #[test]
    fn exam_scale_rounds_to_two_decimals() {
        let strategy = ScoringStrategy::NormalizedTenPoint { total_questions: 3 };
        assert_eq!(strategy.auto_score(1, &[]), 3.33);
        assert_eq!(strategy.auto_score(2, &[]), 6.67);
    }

    #[test]
    fn empty_exam_scores_zero() {
        let strategy = ScoringStrategy::NormalizedTenPoint { total_questions: 0 };
        assert_eq!(strategy.auto_score(0, &[]), 0.0);
    }

    #[test]
    fn raw_points_sum_weights() {
        let mut question = entry(1, 1, Difficulty::Easy);
        question.points = 2.5;
        let strategy = ScoringStrategy::RawPoints;
        assert_eq!(strategy.award(&question), 2.5);
        assert_eq!(strategy.auto_score(2, &[2.5, 2.5]), 5.0);
    }

    #[test]
    fn exam_without_code_has_no_strategy() {
        let mut submission = Submission {
            id: 12,
            kind: SubmissionKind::Exam,
            exam_code_id: None,
            status: SubmissionStatus::Submitted,
            answers: vec![SubmissionAnswer::new(1, 1, "A")],
            auto_score: 0.0,
            manual_score: 0.0,
            total_score: None,
            manual_total: None,
            graded_at: None,
        };
        assert_eq!(
            ScoringStrategy::for_submission(&submission, None),
            Err(ExamError::ExamWithoutCode { submission_id: 12 })
        );

        submission.kind = SubmissionKind::Assignment;
        assert_eq!(
            ScoringStrategy::for_submission(&submission, None),
            Ok(ScoringStrategy::RawPoints)
        );
    }
}
