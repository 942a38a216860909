// src/grading/service.rs

use std::collections::HashMap;

use chrono::Utc;

use crate::{
    error::{AppError, ExamError},
    grading::{
        grader::{apply_manual_total, auto_grade, grade_answer_manually},
        scoring::{EXAM_SCALE, ScoringStrategy},
    },
    models::{
        exam::ExamVariant,
        question::CatalogEntry,
        submission::{GradingSummary, Submission, SubmissionKind, SubmissionStatus},
    },
    repository::{ExamStore, QuestionCatalog, SubmissionStore},
};

/// Loads a submission with everything needed to score it, and writes the
/// result back in one transaction.
pub struct SubmissionGrader<'a> {
    catalog: &'a dyn QuestionCatalog,
    exams: &'a dyn ExamStore,
    submissions: &'a dyn SubmissionStore,
}

/// A submission together with its exam code and question catalog slice.
struct GradingContext {
    submission: Submission,
    variant: Option<ExamVariant>,
    strategy: ScoringStrategy,
    questions: HashMap<i64, CatalogEntry>,
}

impl GradingContext {
    /// Highest total a grader may award.
    fn max_total(&self) -> f64 {
        match self.strategy {
            ScoringStrategy::NormalizedTenPoint { .. } => EXAM_SCALE,
            ScoringStrategy::RawPoints => self
                .submission
                .answers
                .iter()
                .filter_map(|a| self.questions.get(&a.question_id))
                .map(|q| q.points)
                .sum(),
        }
    }
}

impl<'a> SubmissionGrader<'a> {
    pub fn new(
        catalog: &'a dyn QuestionCatalog,
        exams: &'a dyn ExamStore,
        submissions: &'a dyn SubmissionStore,
    ) -> Self {
        Self {
            catalog,
            exams,
            submissions,
        }
    }

    async fn load(&self, submission_id: i64) -> Result<GradingContext, AppError> {
        let submission = self
            .submissions
            .find_submission(submission_id)
            .await?
            .ok_or_else(|| ExamError::NotFound(format!("submission {}", submission_id)))?;

        if submission.status == SubmissionStatus::InProgress {
            return Err(AppError::Conflict(format!(
                "submission {} has not been submitted yet",
                submission_id
            )));
        }

        let variant = match (submission.kind, submission.exam_code_id) {
            (SubmissionKind::Exam, Some(code_id)) => Some(
                self.exams
                    .find_variant(code_id)
                    .await?
                    .ok_or_else(|| ExamError::NotFound(format!("exam code {}", code_id)))?,
            ),
            _ => None,
        };
        let strategy = ScoringStrategy::for_submission(&submission, variant.as_ref())?;

        let question_ids: Vec<i64> = submission.answers.iter().map(|a| a.question_id).collect();
        let questions = self
            .catalog
            .questions_by_ids(&question_ids)
            .await?
            .into_iter()
            .map(|q| (q.id, q))
            .collect();

        Ok(GradingContext {
            submission,
            variant,
            strategy,
            questions,
        })
    }

    /// Auto-grades every answer and stores the totals.
    pub async fn auto_grade(&self, submission_id: i64) -> Result<GradingSummary, AppError> {
        let mut ctx = self.load(submission_id).await?;

        let report = auto_grade(
            &mut ctx.submission,
            &ctx.questions,
            ctx.variant.as_ref(),
            ctx.strategy,
            Utc::now(),
        );
        self.submissions.save_grades(&ctx.submission).await?;

        tracing::info!(
            "Auto-graded submission {}: {} correct, auto score {}, status {}",
            submission_id,
            report.correct_count,
            ctx.submission.auto_score,
            ctx.submission.status
        );
        Ok(GradingSummary::of(
            &ctx.submission,
            report.correct_count,
            report.failed_answers,
        ))
    }

    /// Sets the submission's final total; the manual component absorbs the difference.
    pub async fn set_total_score(
        &self,
        submission_id: i64,
        total_score: f64,
    ) -> Result<GradingSummary, AppError> {
        let mut ctx = self.load(submission_id).await?;
        let max_total = ctx.max_total();

        apply_manual_total(&mut ctx.submission, total_score, max_total, Utc::now())?;
        self.submissions.save_grades(&ctx.submission).await?;

        tracing::info!(
            "Submission {} total set to {} (manual component {})",
            submission_id,
            total_score,
            ctx.submission.manual_score
        );
        Ok(GradingSummary::of(&ctx.submission, correct_count(&ctx.submission), Vec::new()))
    }

    /// Scores one answer by hand, bounded by the question's worth.
    pub async fn grade_answer(
        &self,
        submission_id: i64,
        question_id: i64,
        score: f64,
    ) -> Result<GradingSummary, AppError> {
        let mut ctx = self.load(submission_id).await?;
        let question = ctx
            .questions
            .get(&question_id)
            .ok_or_else(|| ExamError::NotFound(format!("question {}", question_id)))?;
        let max_points = ctx.strategy.award(question);

        grade_answer_manually(
            &mut ctx.submission,
            &ctx.questions,
            question_id,
            score,
            max_points,
            Utc::now(),
        )?;
        self.submissions.save_grades(&ctx.submission).await?;

        Ok(GradingSummary::of(&ctx.submission, correct_count(&ctx.submission), Vec::new()))
    }
}

fn correct_count(submission: &Submission) -> usize {
    submission
        .answers
        .iter()
        .filter(|a| a.is_correct == Some(true))
        .count()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{
        generation::sampler::tests::entry,
        models::{
            exam::{ExamDefinition, NewExamVariant, OptionShuffle},
            question::{Difficulty, QuestionType},
            submission::SubmissionAnswer,
        },
        repository::memory::MemoryRepository,
    };

    fn submission(
        id: i64,
        kind: SubmissionKind,
        exam_code_id: Option<i64>,
        answers: Vec<SubmissionAnswer>,
    ) -> Submission {
        Submission {
            id,
            kind,
            exam_code_id,
            status: SubmissionStatus::Submitted,
            answers,
            auto_score: 0.0,
            manual_score: 0.0,
            total_score: None,
            manual_total: None,
            graded_at: None,
        }
    }

    #[tokio::test]
    async fn grades_exam_through_stored_variant() {
        let repo = MemoryRepository::new();
        for id in 1..=4 {
            let mut q = entry(id, 1, Difficulty::Easy);
            q.correct_answer = Some("C".to_string());
            repo.add_question(q).await;
        }
        repo.add_exam(ExamDefinition {
            id: 1,
            question_bank_id: 1,
            total_questions: 4,
            difficulty: crate::models::exam::DifficultyConfig::new([(Difficulty::Easy, 4)]),
            shuffle_questions: true,
            shuffle_answers: true,
            spread_across_chapters: true,
        })
        .await;

        let map: BTreeMap<String, String> = [("A", "C"), ("B", "A"), ("C", "B"), ("D", "D")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let shuffle = OptionShuffle::try_from(map).unwrap();
        let answer_shuffle = (1..=4).map(|id| (id, shuffle.clone())).collect();
        let saved = repo
            .replace_variants(
                1,
                vec![NewExamVariant {
                    code: "001".to_string(),
                    question_order: vec![4, 2, 1, 3],
                    answer_shuffle: Some(answer_shuffle),
                }],
            )
            .await
            .unwrap();

        // "A" is presented in place of original "C".
        let answers = vec![
            SubmissionAnswer::new(1, 1, "A"),
            SubmissionAnswer::new(2, 2, "A"),
            SubmissionAnswer::new(3, 3, "A"),
            SubmissionAnswer::new(4, 4, "C"),
        ];
        repo.add_submission(submission(9, SubmissionKind::Exam, Some(saved[0].id), answers))
            .await;

        let grader = SubmissionGrader::new(&repo, &repo, &repo);
        let summary = grader.auto_grade(9).await.unwrap();

        assert_eq!(summary.correct_count, 3);
        assert_eq!(summary.auto_score, 7.5);
        assert_eq!(summary.status, SubmissionStatus::Graded);

        let stored = repo.find_submission(9).await.unwrap().unwrap();
        assert_eq!(stored.total_score, Some(7.5));
    }

    #[tokio::test]
    async fn assignment_override_and_essay_flow() {
        let repo = MemoryRepository::new();
        let mut mc1 = entry(1, 1, Difficulty::Easy);
        mc1.points = 2.5;
        let mut mc2 = entry(2, 1, Difficulty::Easy);
        mc2.points = 2.5;
        let mut essay = entry(3, 1, Difficulty::Hard);
        essay.question_type = QuestionType::Essay;
        essay.points = 5.0;
        for q in [mc1, mc2, essay] {
            repo.add_question(q).await;
        }
        let answers = vec![
            SubmissionAnswer::new(1, 1, "A"),
            SubmissionAnswer::new(2, 2, "A"),
            SubmissionAnswer::new(3, 3, "essay text"),
        ];
        repo.add_submission(submission(5, SubmissionKind::Assignment, None, answers))
            .await;

        let grader = SubmissionGrader::new(&repo, &repo, &repo);
        let summary = grader.auto_grade(5).await.unwrap();
        assert_eq!(summary.auto_score, 5.0);
        assert_eq!(summary.status, SubmissionStatus::AwaitingManualGrading);

        let err = grader.grade_answer(5, 3, 6.0).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let summary = grader.set_total_score(5, 9.0).await.unwrap();
        assert_eq!(summary.manual_score, 4.0);
        assert_eq!(summary.total_score, Some(9.0));
        assert_eq!(summary.status, SubmissionStatus::Graded);
    }

    #[tokio::test]
    async fn override_survives_auto_grading_again() {
        let repo = MemoryRepository::new();
        for id in 1..=2 {
            let mut q = entry(id, 1, Difficulty::Easy);
            q.points = 2.5;
            repo.add_question(q).await;
        }
        let answers = vec![SubmissionAnswer::new(1, 1, "A"), SubmissionAnswer::new(2, 2, "A")];
        repo.add_submission(submission(6, SubmissionKind::Assignment, None, answers))
            .await;

        let grader = SubmissionGrader::new(&repo, &repo, &repo);
        grader.auto_grade(6).await.unwrap();
        grader.set_total_score(6, 4.0).await.unwrap();

        let summary = grader.auto_grade(6).await.unwrap();
        assert_eq!(summary.auto_score, 5.0);
        assert_eq!(summary.manual_score, 0.0);
        assert_eq!(summary.total_score, Some(4.0));

        let stored = repo.find_submission(6).await.unwrap().unwrap();
        assert_eq!(stored.manual_total, Some(4.0));
        assert_eq!(stored.total_score, Some(4.0));
    }

    #[tokio::test]
    async fn exam_submission_without_code_is_rejected() {
        let repo = MemoryRepository::new();
        repo.add_question(entry(1, 1, Difficulty::Easy)).await;
        let answers = vec![SubmissionAnswer::new(1, 1, "A")];
        repo.add_submission(submission(8, SubmissionKind::Exam, None, answers))
            .await;

        let grader = SubmissionGrader::new(&repo, &repo, &repo);
        let err = grader.auto_grade(8).await.unwrap_err();
        assert!(matches!(err, AppError::Unprocessable(ref m) if m.contains("no exam code")));
    }

    #[tokio::test]
    async fn in_progress_submission_is_not_graded() {
        let repo = MemoryRepository::new();
        let mut sub = submission(2, SubmissionKind::Assignment, None, Vec::new());
        sub.status = SubmissionStatus::InProgress;
        repo.add_submission(sub).await;

        let grader = SubmissionGrader::new(&repo, &repo, &repo);
        assert!(matches!(grader.auto_grade(2).await, Err(AppError::Conflict(_))));
        assert!(matches!(grader.auto_grade(3).await, Err(AppError::NotFound(_))));
    }
}
