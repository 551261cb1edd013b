// src/models/quiz.rs

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::question::Question;

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub subject_id: Option<i64>,
    pub user_id: Option<i64>,

    /// Time limit in minutes. `None` means unlimited.
    pub time_limit: Option<i32>,

    /// Students can only start a quiz while it is active.
    pub is_active: bool,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Row for the quiz listing, with subject name and question count joined in.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuizSummary {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub subject_id: Option<i64>,
    pub subject_name: Option<String>,
    pub time_limit: Option<i32>,
    pub is_active: bool,
    pub question_count: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A quiz together with its questions in display order.
///
/// This is the snapshot a quiz-taking session loads; it never changes while
/// the session runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDetail {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub time_limit: Option<i32>,
    #[serde(default)]
    pub is_active: bool,
}

impl QuizDetail {
    pub fn from_parts(quiz: Quiz, questions: Vec<Question>) -> Self {
        Self {
            id: quiz.id,
            title: quiz.title,
            description: quiz.description.unwrap_or_default(),
            questions,
            time_limit: quiz.time_limit,
            is_active: quiz.is_active,
        }
    }

    /// Countdown length in seconds, or `None` when the quiz is untimed.
    /// Saturates at `u32::MAX` for absurd limits.
    pub fn time_limit_seconds(&self) -> Option<u32> {
        match self.time_limit {
            Some(minutes) if minutes > 0 => Some((minutes as u32).saturating_mul(60)),
            _ => None,
        }
    }
}

/// DTO for creating a quiz.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub subject_id: Option<i64>,
    #[validate(range(min = 0, max = 600))]
    pub time_limit: Option<i32>,
}

/// DTO for updating quiz settings. Absent fields are left untouched.
///
/// `subjectId` distinguishes "absent" from an explicit `null`, which
/// un-categorizes the quiz.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub subject_id: Option<Option<i64>>,
    pub is_active: Option<bool>,
    #[validate(range(min = 0, max = 600))]
    pub time_limit: Option<i32>,
}

/// Query parameters for listing quizzes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizListParams {
    pub subject_id: Option<i64>,
}

/// Stores a zero limit as "no limit".
pub fn normalize_time_limit(minutes: Option<i32>) -> Option<i32> {
    minutes.filter(|m| *m > 0)
}

fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
