// src/models/ledger.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// Represents the 'attempt_ledger' table in the database.
/// At most one row per (student, quiz); every accepted submission appends a score.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct AttemptLedgerEntry {
    pub student_id: i64,
    pub quiz_id: i64,

    /// One score per accepted submission, oldest first.
    pub scores: Vec<i32>,

    /// Snapshot of the quiz's question count at first submission.
    pub question_count: i32,

    /// Snapshot of the quiz name at creation.
    pub quiz_name: String,

    pub updated_at: DateTime<Utc>,
}

impl AttemptLedgerEntry {
    /// Entry as it looks right after its first submission.
    pub fn first(attempt: &ScoredAttempt) -> Self {
        Self {
            student_id: attempt.student_id,
            quiz_id: attempt.quiz_id,
            scores: vec![attempt.score],
            question_count: attempt.question_count,
            quiz_name: attempt.quiz_name.clone(),
            updated_at: attempt.recorded_at,
        }
    }

    pub fn best_score(&self) -> Option<i32> {
        self.scores.iter().copied().max()
    }

    pub fn latest_score(&self) -> Option<i32> {
        self.scores.last().copied()
    }

    pub fn attempts(&self) -> usize {
        self.scores.len()
    }
}

/// One graded submission on its way into the ledger.
/// The snapshots are only used when it creates the entry.
#[derive(Debug, Clone)]
pub struct ScoredAttempt {
    pub student_id: i64,
    pub quiz_id: i64,
    pub score: i32,
    pub question_count: i32,
    pub quiz_name: String,
    pub recorded_at: DateTime<Utc>,
}

/// Student's answers keyed by question id.
///
/// Built leniently from whatever the client sent: only string, number and
/// boolean values are kept, everything else is dropped and scores as wrong.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Answers(HashMap<String, String>);

impl Answers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };
        let map = object
            .iter()
            .filter_map(|(question_id, answer)| {
                let answer = match answer {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => return None,
                };
                Some((question_id.clone(), answer))
            })
            .collect();
        Self(map)
    }

    pub fn get(&self, question_id: &str) -> Option<&str> {
        self.0.get(question_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Answers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitAttemptRequest {
    /// Key: question id. Value: the student's chosen answer.
    /// Kept raw so malformed payloads grade as incorrect instead of failing.
    #[serde(default)]
    pub answers: Value,
}

impl SubmitAttemptRequest {
    /// Parses a raw request body. Anything that is not a JSON object with an
    /// `answers` field yields empty answers.
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }
}

/// DTO returned after a graded submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub quiz_id: i64,
    pub score: i32,
    pub question_count: i32,
    /// 1-based position of this submission in the ledger entry.
    pub attempt_number: usize,
}

/// A ledger entry as shown on result dashboards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultView {
    pub student_id: i64,
    pub quiz_id: i64,
    pub quiz_name: String,
    pub scores: Vec<i32>,
    pub best_score: i32,
    pub latest_score: i32,
    pub question_count: i32,
    pub attempts: usize,
    pub updated_at: DateTime<Utc>,
}

impl From<AttemptLedgerEntry> for ResultView {
    fn from(entry: AttemptLedgerEntry) -> Self {
        Self {
            student_id: entry.student_id,
            quiz_id: entry.quiz_id,
            best_score: entry.best_score().unwrap_or(0),
            latest_score: entry.latest_score().unwrap_or(0),
            attempts: entry.attempts(),
            quiz_name: entry.quiz_name,
            scores: entry.scores,
            question_count: entry.question_count,
            updated_at: entry.updated_at,
        }
    }
}
