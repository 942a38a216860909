// src/models/submission.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// What a submission answers. Decides which scoring convention applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    /// Taken against a generated exam code, scored on the ten-point scale.
    Exam,
    /// Scored by summing raw point weights.
    Assignment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    InProgress,
    Submitted,
    AwaitingManualGrading,
    Graded,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::InProgress => "in_progress",
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::AwaitingManualGrading => "awaiting_manual_grading",
            SubmissionStatus::Graded => "graded",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(SubmissionStatus::InProgress),
            "submitted" => Ok(SubmissionStatus::Submitted),
            "awaiting_manual_grading" => Ok(SubmissionStatus::AwaitingManualGrading),
            "graded" => Ok(SubmissionStatus::Graded),
            other => Err(format!("unknown submission status '{}'", other)),
        }
    }
}

impl FromStr for SubmissionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exam" => Ok(SubmissionKind::Exam),
            "assignment" => Ok(SubmissionKind::Assignment),
            other => Err(format!("unknown submission kind '{}'", other)),
        }
    }
}

/// A learner's answer to one question within one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionAnswer {
    pub id: i64,
    pub question_id: i64,
    /// Option key as presented to the learner, or free text.
    pub answer: Option<String>,
    pub is_correct: Option<bool>,
    pub score: Option<f64>,
    #[serde(default)]
    pub manually_graded: bool,
}

impl SubmissionAnswer {
    pub fn new(id: i64, question_id: i64, answer: impl Into<String>) -> Self {
        Self {
            id,
            question_id,
            answer: Some(answer.into()),
            is_correct: None,
            score: None,
            manually_graded: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub kind: SubmissionKind,
    /// Generated exam code the attempt was taken against. `None` for assignments.
    pub exam_code_id: Option<i64>,
    pub status: SubmissionStatus,
    pub answers: Vec<SubmissionAnswer>,
    pub auto_score: f64,
    pub manual_score: f64,
    pub total_score: Option<f64>,
    /// Total fixed by a grader. Later grading passes keep it.
    #[serde(default)]
    pub manual_total: Option<f64>,
    pub graded_at: Option<DateTime<Utc>>,
}

impl Submission {
    pub fn answer_mut(&mut self, question_id: i64) -> Option<&mut SubmissionAnswer> {
        self.answers.iter_mut().find(|a| a.question_id == question_id)
    }
}

/// DTO for a grader fixing the submission's total score.
#[derive(Debug, Deserialize, Validate)]
pub struct ManualTotalRequest {
    #[validate(range(min = 0.0, message = "Total score cannot be negative."))]
    pub total_score: f64,
}

/// DTO for a grader scoring one answer.
#[derive(Debug, Deserialize, Validate)]
pub struct ManualAnswerScoreRequest {
    #[validate(range(min = 0.0, message = "Score cannot be negative."))]
    pub score: f64,
}

/// Result of an auto-grading pass, returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingSummary {
    pub submission_id: i64,
    pub status: SubmissionStatus,
    pub correct_count: usize,
    pub auto_score: f64,
    pub manual_score: f64,
    pub total_score: Option<f64>,
    /// Answers that could not be graded and were left unscored.
    pub failed_answers: Vec<i64>,
}

impl GradingSummary {
    pub fn of(submission: &Submission, correct_count: usize, failed_answers: Vec<i64>) -> Self {
        Self {
            submission_id: submission.id,
            status: submission.status,
            correct_count,
            auto_score: submission.auto_score,
            manual_score: submission.manual_score,
            total_score: submission.total_score,
            failed_answers,
        }
    }
}
