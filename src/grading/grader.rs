// src/grading/grader.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::{
    error::{ExamError, GradingError},
    grading::scoring::ScoringStrategy,
    models::{
        exam::{ExamVariant, OptionShuffle},
        question::{CatalogEntry, QuestionType},
        submission::{Submission, SubmissionStatus},
    },
};

/// Outcome of grading one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    Incorrect,
    /// Needs a human (essays).
    Deferred,
}

/// Grades one answer against the canonical key.
///
/// `shuffle` translates the presented option key back to the original one;
/// a key the map does not know is compared as given.
pub fn grade_answer(
    question: &CatalogEntry,
    answer: Option<&str>,
    shuffle: Option<&OptionShuffle>,
) -> Result<Verdict, GradingError> {
    match question.question_type {
        QuestionType::Essay => Ok(Verdict::Deferred),
        QuestionType::MultipleChoice => {
            let expected = question
                .correct_answer
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .ok_or(GradingError::MissingAnswerKey(question.id))?;

            let Some(given) = answer.map(str::trim).filter(|a| !a.is_empty()) else {
                return Ok(Verdict::Incorrect);
            };
            let original = shuffle.and_then(|s| s.to_original(given)).unwrap_or(given);

            Ok(verdict(original.eq_ignore_ascii_case(expected)))
        }
        QuestionType::ShortAnswer => {
            let keywords: Vec<String> = question
                .correct_answer
                .as_deref()
                .unwrap_or_default()
                .split('|')
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect();
            if keywords.is_empty() {
                return Err(GradingError::MissingAnswerKey(question.id));
            }

            let given = answer.unwrap_or_default().trim().to_lowercase();
            if given.is_empty() {
                return Ok(Verdict::Incorrect);
            }
            Ok(verdict(keywords.iter().any(|k| given.contains(k.as_str()))))
        }
    }
}

fn verdict(correct: bool) -> Verdict {
    if correct {
        Verdict::Correct
    } else {
        Verdict::Incorrect
    }
}

/// Tally of an auto-grading pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradeReport {
    pub correct_count: usize,
    /// Answers left unscored because grading them failed.
    pub failed_answers: Vec<i64>,
    pub pending_essays: usize,
}

/// Auto-grades every answer of `submission` in place and updates its totals.
///
/// A failure on one answer is logged and leaves that answer unscored; the
/// rest of the submission is still graded. Manually graded answers keep
/// their scores.
pub fn auto_grade(
    submission: &mut Submission,
    questions: &HashMap<i64, CatalogEntry>,
    variant: Option<&ExamVariant>,
    strategy: ScoringStrategy,
    now: DateTime<Utc>,
) -> GradeReport {
    let mut report = GradeReport::default();
    let mut awarded = Vec::new();

    for answer in submission.answers.iter_mut() {
        if answer.manually_graded {
            continue;
        }

        let graded = questions
            .get(&answer.question_id)
            .ok_or(GradingError::UnknownQuestion(answer.question_id))
            .and_then(|question| {
                let shuffle = option_shuffle_for(question, variant);
                grade_answer(question, answer.answer.as_deref(), shuffle)
                    .map(|verdict| (question, verdict))
            });

        match graded {
            Ok((question, Verdict::Correct)) => {
                let score = strategy.award(question);
                answer.is_correct = Some(true);
                answer.score = Some(score);
                awarded.push(score);
                report.correct_count += 1;
            }
            Ok((_, Verdict::Incorrect)) => {
                answer.is_correct = Some(false);
                answer.score = Some(0.0);
            }
            Ok((_, Verdict::Deferred)) => {
                answer.is_correct = None;
                answer.score = None;
                report.pending_essays += 1;
            }
            Err(e) => {
                tracing::warn!(
                    "Skipping answer {} of submission {}: {}",
                    answer.id,
                    submission.id,
                    e
                );
                answer.is_correct = None;
                answer.score = None;
                report.failed_answers.push(answer.id);
            }
        }
    }

    submission.auto_score = strategy.auto_score(report.correct_count, &awarded);
    submission.manual_score = manual_component(submission);
    settle_status(submission, report.pending_essays, now);
    report
}

/// Looks up the option shuffle of a multiple-choice question.
///
/// A shuffled variant without an entry for the question is inconsistent;
/// the raw answer is then treated as canonical.
fn option_shuffle_for<'a>(
    question: &CatalogEntry,
    variant: Option<&'a ExamVariant>,
) -> Option<&'a OptionShuffle> {
    if question.question_type != QuestionType::MultipleChoice {
        return None;
    }
    let map = variant?.answer_shuffle.as_ref()?;
    let shuffle = map.get(&question.id);
    if shuffle.is_none() {
        tracing::warn!(
            "Question {} has no option shuffle in a shuffled exam code; grading raw answer",
            question.id
        );
    }
    shuffle
}

fn manual_component(submission: &Submission) -> f64 {
    submission
        .answers
        .iter()
        .filter(|a| a.manually_graded)
        .filter_map(|a| a.score)
        .fold(0.0, |acc, score| acc + score)
}

fn settle_status(submission: &mut Submission, pending_essays: usize, now: DateTime<Utc>) {
    if let Some(total) = submission.manual_total {
        submission.manual_score = (total - submission.auto_score).max(0.0);
        submission.status = SubmissionStatus::Graded;
        submission.total_score = Some(total);
        submission.graded_at = Some(now);
    } else if pending_essays > 0 {
        submission.status = SubmissionStatus::AwaitingManualGrading;
        submission.total_score = None;
        submission.graded_at = None;
    } else {
        submission.status = SubmissionStatus::Graded;
        submission.total_score = Some(submission.auto_score + submission.manual_score);
        submission.graded_at = Some(now);
    }
}

/// Grader fixes the final total. The manual component is whatever the auto
/// score leaves to reach it, never negative. The total sticks through later
/// auto or per-answer grading until a grader sets a new one.
pub fn apply_manual_total(
    submission: &mut Submission,
    desired_total: f64,
    max_total: f64,
    now: DateTime<Utc>,
) -> Result<(), ExamError> {
    if !(0.0..=max_total).contains(&desired_total) {
        return Err(ExamError::ScoreOutOfRange {
            score: desired_total,
            max: max_total,
        });
    }

    submission.manual_total = Some(desired_total);
    settle_status(submission, 0, now);
    Ok(())
}

/// Grader scores one answer, usually an essay. The submission becomes
/// graded once no essay is left without a manual score.
pub fn grade_answer_manually(
    submission: &mut Submission,
    questions: &HashMap<i64, CatalogEntry>,
    question_id: i64,
    score: f64,
    max_points: f64,
    now: DateTime<Utc>,
) -> Result<(), ExamError> {
    if !(0.0..=max_points).contains(&score) {
        return Err(ExamError::ScoreOutOfRange {
            score,
            max: max_points,
        });
    }

    let submission_id = submission.id;
    let answer = submission.answer_mut(question_id).ok_or_else(|| {
        ExamError::NotFound(format!(
            "answer to question {} in submission {}",
            question_id, submission_id
        ))
    })?;
    answer.score = Some(score);
    answer.is_correct = Some(score > 0.0);
    answer.manually_graded = true;

    let pending_essays = submission
        .answers
        .iter()
        .filter(|a| !a.manually_graded)
        .filter(|a| {
            questions
                .get(&a.question_id)
                .is_some_and(|q| q.question_type == QuestionType::Essay)
        })
        .count();

    submission.manual_score = manual_component(submission);
    settle_status(submission, pending_essays, now);
    Ok(())
}
