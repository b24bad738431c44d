// src/store/mod.rs

//! Storage seams consumed by the engine.
//!
//! The catalog is read-only to the resolver and recorder. The recorder
//! appends to the ledger under a per-key lock; stores that can append
//! atomically also stay consistent across processes.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        ledger::{AttemptLedgerEntry, ScoredAttempt},
        quiz::{PublishQuizRequest, QuizDefinition},
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Read access to quiz definitions.
#[async_trait]
pub trait QuizCatalog: Send + Sync {
    async fn get_quiz_by_id(&self, quiz_id: i64) -> Result<Option<QuizDefinition>, AppError>;

    /// Quizzes targeting `class`, plus those targeting the all-cohorts
    /// sentinel when `include_global` is set.
    async fn list_quizzes_by_class_or_global(
        &self,
        class: &str,
        include_global: bool,
    ) -> Result<Vec<QuizDefinition>, AppError>;
}

/// Per-(student, quiz) score history.
#[async_trait]
pub trait AttemptLedger: Send + Sync {
    async fn get_ledger_entry(
        &self,
        student_id: i64,
        quiz_id: i64,
    ) -> Result<Option<AttemptLedgerEntry>, AppError>;

    /// Inserts the entry or replaces the one stored for the same pair.
    async fn upsert_ledger_entry(&self, entry: &AttemptLedgerEntry) -> Result<(), AppError>;

    async fn list_entries_for_student(
        &self,
        student_id: i64,
    ) -> Result<Vec<AttemptLedgerEntry>, AppError>;

    async fn list_entries_for_quiz(&self, quiz_id: i64)
    -> Result<Vec<AttemptLedgerEntry>, AppError>;

    async fn count_entries_for_quiz(&self, quiz_id: i64) -> Result<i64, AppError>;

    /// Appends the score to the pair's entry, creating the entry if absent,
    /// and returns the entry as stored.
    ///
    /// The default is a plain read-modify-write and is only safe while the
    /// caller serializes writers of the pair. Stores that can append in one
    /// step should override it.
    async fn append_score(&self, attempt: &ScoredAttempt) -> Result<AttemptLedgerEntry, AppError> {
        let entry = match self
            .get_ledger_entry(attempt.student_id, attempt.quiz_id)
            .await?
        {
            Some(mut entry) => {
                entry.scores.push(attempt.score);
                entry.updated_at = attempt.recorded_at;
                entry
            }
            None => AttemptLedgerEntry::first(attempt),
        };
        self.upsert_ledger_entry(&entry).await?;
        Ok(entry)
    }
}

/// Write access to the catalog, used by staff tooling only.
#[async_trait]
pub trait QuizAuthoring: Send + Sync {
    async fn publish_quiz(&self, req: &PublishQuizRequest) -> Result<QuizDefinition, AppError>;

    /// Moves the start time only while no ledger entry references the quiz,
    /// checked in the same step as the write. Returns `None` if the quiz does
    /// not exist or already has entries.
    async fn reschedule_quiz(
        &self,
        quiz_id: i64,
        start_time: DateTime<Utc>,
    ) -> Result<Option<QuizDefinition>, AppError>;
}
