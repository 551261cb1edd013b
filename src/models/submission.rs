// src/models/submission.rs

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// How an attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionType {
    /// Every question answered and advanced deliberately.
    Manual,
    /// The countdown ran out.
    Timeout,
    /// A timeout while the quiz tab was hidden.
    Blur,
}

impl SubmissionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionType::Manual => "manual",
            SubmissionType::Timeout => "timeout",
            SubmissionType::Blur => "blur",
        }
    }
}

impl fmt::Display for SubmissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column limits shared by the entry form and the stored record.
pub const NAME_MAX_LEN: u64 = 200;
pub const EMAIL_MAX_LEN: u64 = 200;
pub const ROLL_NUMBER_MAX_LEN: u64 = 50;
pub const FACULTY_MAX_LEN: u64 = 50;
pub const YEAR_MAX_LEN: u64 = 20;

/// The terminal record of one attempt, as sent to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewSubmission {
    #[validate(range(min = 1))]
    pub quiz_id: i64,
    #[validate(length(min = 1, max = NAME_MAX_LEN))]
    pub student_name: String,
    /// Optional at the entry gate, so it may be empty.
    #[serde(default)]
    #[validate(length(max = EMAIL_MAX_LEN))]
    pub student_email: String,
    #[validate(length(min = 1, max = ROLL_NUMBER_MAX_LEN))]
    pub roll_number: String,
    #[validate(length(min = 1, max = FACULTY_MAX_LEN))]
    pub faculty: String,
    #[validate(length(min = 1, max = YEAR_MAX_LEN))]
    pub year: String,
    #[validate(range(min = 0))]
    pub score: i32,
    #[validate(range(min = 0))]
    pub total_questions: i32,
    #[serde(default)]
    pub is_cheated: bool,
    pub submission_type: SubmissionType,
}

impl NewSubmission {
    pub fn check(&self) -> Result<(), String> {
        self.validate().map_err(|e| e.to_string())?;
        if self.score > self.total_questions {
            return Err("score cannot exceed totalQuestions".to_string());
        }
        Ok(())
    }
}

/// Represents the 'submissions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: i64,
    pub quiz_id: i64,
    pub student_name: String,
    pub student_email: String,
    pub roll_number: String,
    pub faculty: String,
    pub year: String,
    pub score: i32,
    pub total_questions: i32,
    pub is_cheated: bool,
    pub submission_type: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Submission row joined with the quiz title, for the instructor review table.
#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionEntry {
    pub id: i64,
    pub student_name: String,
    pub student_email: String,
    pub roll_number: String,
    pub faculty: String,
    pub year: String,
    pub score: i32,
    pub total_questions: i32,
    pub is_cheated: bool,
    pub submission_type: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub quiz_title: Option<String>,
}

/// Filters for the review table. `"all"` behaves like an absent filter.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionListParams {
    pub quiz_id: Option<i64>,
    pub faculty: Option<String>,
    pub year: Option<String>,
}

impl SubmissionListParams {
    pub fn faculty_filter(&self) -> Option<&str> {
        active_filter(self.faculty.as_deref())
    }

    pub fn year_filter(&self) -> Option<&str> {
        active_filter(self.year.as_deref())
    }
}

fn active_filter(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty() && *v != "all")
}
