// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, types::Json};

use super::{AttemptLedger, QuizAuthoring, QuizCatalog};
use crate::{
    config::ALL_COHORTS,
    error::AppError,
    models::{
        ledger::{AttemptLedgerEntry, ScoredAttempt},
        quiz::{PublishQuizRequest, QuizDefinition},
    },
};

const QUIZ_COLUMNS: &str =
    "id, name, target_class, duration_minutes, start_time, retake_allowed, answer_key, thumbnail";

const LEDGER_COLUMNS: &str = "student_id, quiz_id, scores, question_count, quiz_name, updated_at";

/// Postgres-backed catalog and ledger.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuizCatalog for PgStore {
    async fn get_quiz_by_id(&self, quiz_id: i64) -> Result<Option<QuizDefinition>, AppError> {
        let quiz = sqlx::query_as::<_, QuizDefinition>(&format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = $1"
        ))
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch quiz {}: {:?}", quiz_id, e);
            AppError::from(e)
        })?;

        Ok(quiz)
    }

    async fn list_quizzes_by_class_or_global(
        &self,
        class: &str,
        include_global: bool,
    ) -> Result<Vec<QuizDefinition>, AppError> {
        let quizzes = sqlx::query_as::<_, QuizDefinition>(&format!(
            r#"
            SELECT {QUIZ_COLUMNS}
            FROM quizzes
            WHERE target_class = $1
               OR ($2 AND target_class = $3)
            "#
        ))
        .bind(class)
        .bind(include_global)
        .bind(ALL_COHORTS)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list quizzes for class {}: {:?}", class, e);
            AppError::from(e)
        })?;

        Ok(quizzes)
    }
}

#[async_trait]
impl AttemptLedger for PgStore {
    async fn get_ledger_entry(
        &self,
        student_id: i64,
        quiz_id: i64,
    ) -> Result<Option<AttemptLedgerEntry>, AppError> {
        let entry = sqlx::query_as::<_, AttemptLedgerEntry>(&format!(
            "SELECT {LEDGER_COLUMNS} FROM attempt_ledger WHERE student_id = $1 AND quiz_id = $2"
        ))
        .bind(student_id)
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    async fn upsert_ledger_entry(&self, entry: &AttemptLedgerEntry) -> Result<(), AppError> {
        // Snapshots are written on insert only
        sqlx::query(
            r#"
            INSERT INTO attempt_ledger (student_id, quiz_id, scores, question_count, quiz_name, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (student_id, quiz_id) DO UPDATE SET
                scores = EXCLUDED.scores,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(entry.student_id)
        .bind(entry.quiz_id)
        .bind(&entry.scores)
        .bind(entry.question_count)
        .bind(&entry.quiz_name)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to upsert ledger entry: {:?}", e);
            AppError::from(e)
        })?;

        Ok(())
    }

    async fn list_entries_for_student(
        &self,
        student_id: i64,
    ) -> Result<Vec<AttemptLedgerEntry>, AppError> {
        let entries = sqlx::query_as::<_, AttemptLedgerEntry>(&format!(
            "SELECT {LEDGER_COLUMNS} FROM attempt_ledger WHERE student_id = $1 ORDER BY updated_at DESC, quiz_id"
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn list_entries_for_quiz(
        &self,
        quiz_id: i64,
    ) -> Result<Vec<AttemptLedgerEntry>, AppError> {
        let entries = sqlx::query_as::<_, AttemptLedgerEntry>(&format!(
            "SELECT {LEDGER_COLUMNS} FROM attempt_ledger WHERE quiz_id = $1"
        ))
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn count_entries_for_quiz(&self, quiz_id: i64) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attempt_ledger WHERE quiz_id = $1")
            .bind(quiz_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn append_score(&self, attempt: &ScoredAttempt) -> Result<AttemptLedgerEntry, AppError> {
        // The append happens inside the row update, so concurrent writers
        // from any process each keep their score
        let entry = sqlx::query_as::<_, AttemptLedgerEntry>(&format!(
            r#"
            INSERT INTO attempt_ledger (student_id, quiz_id, scores, question_count, quiz_name, updated_at)
            VALUES ($1, $2, ARRAY[$3]::INTEGER[], $4, $5, $6)
            ON CONFLICT (student_id, quiz_id) DO UPDATE SET
                scores = array_append(attempt_ledger.scores, $3),
                updated_at = EXCLUDED.updated_at
            RETURNING {LEDGER_COLUMNS}
            "#
        ))
        .bind(attempt.student_id)
        .bind(attempt.quiz_id)
        .bind(attempt.score)
        .bind(attempt.question_count)
        .bind(&attempt.quiz_name)
        .bind(attempt.recorded_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(
                "Failed to append score for student {} on quiz {}: {:?}",
                attempt.student_id,
                attempt.quiz_id,
                e
            );
            AppError::from(e)
        })?;

        Ok(entry)
    }
}

#[async_trait]
impl QuizAuthoring for PgStore {
    async fn publish_quiz(&self, req: &PublishQuizRequest) -> Result<QuizDefinition, AppError> {
        let quiz = sqlx::query_as::<_, QuizDefinition>(&format!(
            r#"
            INSERT INTO quizzes (name, target_class, duration_minutes, start_time, retake_allowed, answer_key, thumbnail)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {QUIZ_COLUMNS}
            "#
        ))
        .bind(&req.name)
        .bind(&req.target_class)
        .bind(req.duration_minutes)
        .bind(req.start_time)
        .bind(req.retake_allowed)
        .bind(Json(&req.answer_key))
        .bind(&req.thumbnail)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to publish quiz: {:?}", e);
            AppError::from(e)
        })?;

        Ok(quiz)
    }

    async fn reschedule_quiz(
        &self,
        quiz_id: i64,
        start_time: DateTime<Utc>,
    ) -> Result<Option<QuizDefinition>, AppError> {
        let quiz = sqlx::query_as::<_, QuizDefinition>(&format!(
            r#"
            UPDATE quizzes SET start_time = $1
            WHERE id = $2
              AND NOT EXISTS (SELECT 1 FROM attempt_ledger WHERE quiz_id = $2)
            RETURNING {QUIZ_COLUMNS}
            "#
        ))
        .bind(start_time)
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(quiz)
    }
}
