// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Number of options every question carries.
pub const OPTION_COUNT: usize = 4;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,

    #[serde(default)]
    pub quiz_id: i64,

    /// The prompt shown to the student.
    pub text: String,

    /// Exactly four option strings, in display order.
    pub options: Vec<String>,

    /// Must equal one of `options`. Checked on write, trusted on read.
    pub correct_answer: String,

    /// Shown after the student answers.
    pub explanation: String,

    /// Position within the quiz. Stored as `position` because `order` is reserved in SQL.
    #[serde(rename = "order", default)]
    pub position: i32,

    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Question {
    /// Exact string comparison. No trimming, no case folding.
    pub fn is_correct(&self, answer: &str) -> bool {
        self.correct_answer == answer
    }
}

/// DTO for creating or replacing a question.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRequest {
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(length(min = 1, max = 500))]
    pub correct_answer: String,
    #[validate(length(min = 1, max = 4000))]
    pub explanation: String,
}

impl QuestionRequest {
    /// Field validation plus the cross-field rule that the answer is one of the options.
    pub fn check(&self) -> Result<(), String> {
        self.validate().map_err(|e| e.to_string())?;
        if !self.options.iter().any(|opt| opt == &self.correct_answer) {
            return Err("correctAnswer must match one of the options".to_string());
        }
        Ok(())
    }
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() != OPTION_COUNT {
        return Err(validator::ValidationError::new("options_must_have_four_entries"));
    }
    for opt in options {
        if opt.is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_empty"));
        }
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

/// Direction for moving a question within its quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReorderDirection {
    Up,
    Down,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub direction: ReorderDirection,
}
