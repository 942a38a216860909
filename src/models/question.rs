// src/models/question.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Difficulty tier of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

/// Question type. Essays are never auto-graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    ShortAnswer,
    Essay,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::ShortAnswer => "short_answer",
            QuestionType::Essay => "essay",
        }
    }

    pub fn is_auto_gradable(&self) -> bool {
        !matches!(self, QuestionType::Essay)
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multiple_choice" => Ok(QuestionType::MultipleChoice),
            "short_answer" => Ok(QuestionType::ShortAnswer),
            "essay" => Ok(QuestionType::Essay),
            other => Err(format!("unknown question type '{}'", other)),
        }
    }
}

/// One labelled option of a multiple-choice question (e.g. `{"key": "A", "text": "Paris"}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub key: String,
    pub text: String,
}

/// Read-only view of a stored question, as supplied by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: i64,
    pub question_bank_id: i64,
    pub chapter_id: i64,

    pub difficulty: Difficulty,

    #[serde(rename = "type")]
    pub question_type: QuestionType,

    /// The text content of the question.
    pub content: String,

    /// Ordered option list. Empty for short-answer and essay questions.
    pub options: Vec<AnswerOption>,

    /// Option key for multiple choice, pipe-delimited keywords for short answer.
    pub correct_answer: Option<String>,

    pub points: f64,
}

impl CatalogEntry {
    pub fn option_keys(&self) -> Vec<String> {
        self.options.iter().map(|o| o.key.clone()).collect()
    }
}

/// DTO for sending a question to the learner (excludes the correct answer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: i64,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub content: String,
    pub options: Vec<AnswerOption>,
    pub points: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_parses_and_displays() {
        for tier in Difficulty::ALL {
            assert_eq!(tier.to_string().parse::<Difficulty>(), Ok(tier));
        }
        assert!("extreme".parse::<Difficulty>().is_err());
    }

    #[test]
    fn essay_is_not_auto_gradable() {
        assert!(QuestionType::MultipleChoice.is_auto_gradable());
        assert!(QuestionType::ShortAnswer.is_auto_gradable());
        assert!(!QuestionType::Essay.is_auto_gradable());
    }

    #[test]
    fn question_type_serializes_snake_case() {
        let json = serde_json::to_string(&QuestionType::MultipleChoice).unwrap();
        assert_eq!(json, "\"multiple_choice\"");
    }
}
