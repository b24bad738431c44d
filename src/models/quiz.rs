// src/models/quiz.rs

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// One (question, correct answer) pair of a quiz's answer key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerKeyEntry {
    pub question_id: String,
    pub correct_answer: String,
}

impl AnswerKeyEntry {
    pub fn new(question_id: impl Into<String>, correct_answer: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            correct_answer: correct_answer.into(),
        }
    }
}

/// Represents the 'quizzes' table in the database.
/// Owned by course authoring; the engine only reads it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizDefinition {
    pub id: i64,

    pub name: String,

    /// Cohort the quiz is assigned to, or `"all"` for every cohort.
    pub target_class: String,

    pub duration_minutes: i32,

    /// Opens the attempt window.
    pub start_time: DateTime<Utc>,

    pub retake_allowed: bool,

    /// Ordered answer key.
    /// Stored as a JSON array in the database.
    pub answer_key: Json<Vec<AnswerKeyEntry>>,

    pub thumbnail: Option<String>,
}

impl QuizDefinition {
    /// Scoring denominator.
    pub fn question_count(&self) -> i32 {
        self.answer_key.len() as i32
    }

    pub fn summary(&self) -> QuizSummary {
        QuizSummary {
            id: self.id,
            name: self.name.clone(),
            target_class: self.target_class.clone(),
            duration_minutes: self.duration_minutes,
            start_time: self.start_time,
            retake_allowed: self.retake_allowed,
            question_count: self.question_count(),
            thumbnail: self.thumbnail.clone(),
        }
    }
}

/// DTO for listing quizzes (excludes the answer key).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSummary {
    pub id: i64,
    pub name: String,
    pub target_class: String,
    pub duration_minutes: i32,
    pub start_time: DateTime<Utc>,
    pub retake_allowed: bool,
    pub question_count: i32,
    pub thumbnail: Option<String>,
}

/// Live status of a single quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizStatus {
    /// Non-retake quiz inside its window.
    Active,
    /// Non-retake quiz outside its window.
    Expired,
    /// Retake-enabled quiz; always open.
    RetakeOpen,
}

impl QuizStatus {
    pub fn is_open(self) -> bool {
        matches!(self, QuizStatus::Active | QuizStatus::RetakeOpen)
    }
}

/// DTO returned by the status lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizStatusView {
    pub id: i64,
    pub name: String,
    pub status: QuizStatus,

    /// Raw signed seconds; callers clamp negatives to zero.
    /// Full duration for retake-enabled quizzes.
    pub time_left_secs: i64,

    /// Present while a non-retake quiz has not opened yet.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub starts_in_secs: Option<i64>,

    pub question_count: i32,
    pub duration_minutes: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub retake_allowed: bool,
    pub thumbnail: Option<String>,
}

/// DTO for publishing a new quiz.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PublishQuizRequest {
    #[validate(length(min = 1, max = 200, message = "Quiz name must be 1-200 characters."))]
    pub name: String,
    #[validate(length(min = 1, max = 50), custom(function = validate_not_blank))]
    pub target_class: String,
    #[validate(range(min = 1, max = 1440, message = "Duration must be between 1 and 1440 minutes."))]
    pub duration_minutes: i32,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub retake_allowed: bool,
    #[validate(custom(function = validate_answer_key))]
    pub answer_key: Vec<AnswerKeyEntry>,
    #[validate(length(max = 500))]
    pub thumbnail: Option<String>,
}

/// DTO for moving a quiz's window.
#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleRequest {
    pub start_time: DateTime<Utc>,
}

fn validate_not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank"));
    }
    Ok(())
}

/// Answer keys must be non-empty with unique, non-blank question ids.
fn validate_answer_key(key: &[AnswerKeyEntry]) -> Result<(), validator::ValidationError> {
    if key.is_empty() {
        return Err(validator::ValidationError::new("answer_key_cannot_be_empty"));
    }
    let mut seen = HashSet::new();
    for entry in key {
        if entry.question_id.trim().is_empty() {
            return Err(validator::ValidationError::new("blank_question_id"));
        }
        if !seen.insert(entry.question_id.as_str()) {
            return Err(validator::ValidationError::new("duplicate_question_id"));
        }
    }
    Ok(())
}
