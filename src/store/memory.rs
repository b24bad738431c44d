// src/store/memory.rs

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use tokio::sync::RwLock;

use super::{AttemptLedger, QuizAuthoring, QuizCatalog};
use crate::{
    config::ALL_COHORTS,
    error::AppError,
    models::{
        ledger::{AttemptLedgerEntry, ScoredAttempt},
        quiz::{PublishQuizRequest, QuizDefinition},
    },
};

/// Process-local store implementing every storage trait.
#[derive(Debug)]
pub struct MemoryStore {
    quizzes: RwLock<HashMap<i64, QuizDefinition>>,
    ledger: RwLock<HashMap<(i64, i64), AttemptLedgerEntry>>,
    next_quiz_id: AtomicI64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            quizzes: RwLock::new(HashMap::new()),
            ledger: RwLock::new(HashMap::new()),
            next_quiz_id: AtomicI64::new(1),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a definition under its own id, replacing any previous one.
    pub async fn insert_quiz(&self, quiz: QuizDefinition) {
        self.next_quiz_id.fetch_max(quiz.id + 1, Ordering::SeqCst);
        self.quizzes.write().await.insert(quiz.id, quiz);
    }
}

#[async_trait]
impl QuizCatalog for MemoryStore {
    async fn get_quiz_by_id(&self, quiz_id: i64) -> Result<Option<QuizDefinition>, AppError> {
        Ok(self.quizzes.read().await.get(&quiz_id).cloned())
    }

    async fn list_quizzes_by_class_or_global(
        &self,
        class: &str,
        include_global: bool,
    ) -> Result<Vec<QuizDefinition>, AppError> {
        let quizzes = self.quizzes.read().await;
        Ok(quizzes
            .values()
            .filter(|q| q.target_class == class || (include_global && q.target_class == ALL_COHORTS))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AttemptLedger for MemoryStore {
    async fn get_ledger_entry(
        &self,
        student_id: i64,
        quiz_id: i64,
    ) -> Result<Option<AttemptLedgerEntry>, AppError> {
        Ok(self.ledger.read().await.get(&(student_id, quiz_id)).cloned())
    }

    async fn upsert_ledger_entry(&self, entry: &AttemptLedgerEntry) -> Result<(), AppError> {
        self.ledger
            .write()
            .await
            .insert((entry.student_id, entry.quiz_id), entry.clone());
        Ok(())
    }

    async fn list_entries_for_student(
        &self,
        student_id: i64,
    ) -> Result<Vec<AttemptLedgerEntry>, AppError> {
        let ledger = self.ledger.read().await;
        let mut entries: Vec<_> = ledger
            .values()
            .filter(|e| e.student_id == student_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.quiz_id.cmp(&b.quiz_id)));
        Ok(entries)
    }

    async fn list_entries_for_quiz(
        &self,
        quiz_id: i64,
    ) -> Result<Vec<AttemptLedgerEntry>, AppError> {
        let ledger = self.ledger.read().await;
        Ok(ledger
            .values()
            .filter(|e| e.quiz_id == quiz_id)
            .cloned()
            .collect())
    }

    async fn count_entries_for_quiz(&self, quiz_id: i64) -> Result<i64, AppError> {
        let ledger = self.ledger.read().await;
        Ok(ledger.keys().filter(|(_, q)| *q == quiz_id).count() as i64)
    }

    async fn append_score(&self, attempt: &ScoredAttempt) -> Result<AttemptLedgerEntry, AppError> {
        let mut ledger = self.ledger.write().await;
        let entry = ledger
            .entry((attempt.student_id, attempt.quiz_id))
            .and_modify(|entry| {
                entry.scores.push(attempt.score);
                entry.updated_at = attempt.recorded_at;
            })
            .or_insert_with(|| AttemptLedgerEntry::first(attempt));
        Ok(entry.clone())
    }
}

#[async_trait]
impl QuizAuthoring for MemoryStore {
    async fn publish_quiz(&self, req: &PublishQuizRequest) -> Result<QuizDefinition, AppError> {
        let quiz = QuizDefinition {
            id: self.next_quiz_id.fetch_add(1, Ordering::SeqCst),
            name: req.name.clone(),
            target_class: req.target_class.clone(),
            duration_minutes: req.duration_minutes,
            start_time: req.start_time,
            retake_allowed: req.retake_allowed,
            answer_key: Json(req.answer_key.clone()),
            thumbnail: req.thumbnail.clone(),
        };
        self.quizzes.write().await.insert(quiz.id, quiz.clone());
        Ok(quiz)
    }

    async fn reschedule_quiz(
        &self,
        quiz_id: i64,
        start_time: DateTime<Utc>,
    ) -> Result<Option<QuizDefinition>, AppError> {
        let mut quizzes = self.quizzes.write().await;
        // Held across the update so no append lands in between
        let ledger = self.ledger.read().await;
        if ledger.keys().any(|(_, q)| *q == quiz_id) {
            return Ok(None);
        }
        Ok(quizzes.get_mut(&quiz_id).map(|quiz| {
            quiz.start_time = start_time;
            quiz.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz::AnswerKeyEntry;

    fn quiz(id: i64, class: &str) -> QuizDefinition {
        QuizDefinition {
            id,
            name: format!("Quiz {}", id),
            target_class: class.to_string(),
            duration_minutes: 30,
            start_time: Utc::now(),
            retake_allowed: false,
            answer_key: Json(vec![AnswerKeyEntry::new("q1", "A")]),
            thumbnail: None,
        }
    }

    #[tokio::test]
    async fn test_list_by_class_respects_global_flag() {
        let store = MemoryStore::new();
        store.insert_quiz(quiz(1, "Class7")).await;
        store.insert_quiz(quiz(2, ALL_COHORTS)).await;
        store.insert_quiz(quiz(3, "Class8")).await;

        let mut with_global: Vec<i64> = store
            .list_quizzes_by_class_or_global("Class7", true)
            .await
            .unwrap()
            .into_iter()
            .map(|q| q.id)
            .collect();
        with_global.sort();
        assert_eq!(with_global, vec![1, 2]);

        let exact = store
            .list_quizzes_by_class_or_global("Class7", false)
            .await
            .unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].id, 1);
    }

    #[tokio::test]
    async fn test_upsert_keeps_one_entry_per_pair() {
        let store = MemoryStore::new();
        let mut entry = AttemptLedgerEntry {
            student_id: 10,
            quiz_id: 1,
            scores: vec![1],
            question_count: 3,
            quiz_name: "Quiz 1".to_string(),
            updated_at: Utc::now(),
        };
        store.upsert_ledger_entry(&entry).await.unwrap();
        entry.scores.push(3);
        store.upsert_ledger_entry(&entry).await.unwrap();

        let stored = store.get_ledger_entry(10, 1).await.unwrap().unwrap();
        assert_eq!(stored.scores, vec![1, 3]);
        assert_eq!(store.count_entries_for_quiz(1).await.unwrap(), 1);
    }

    fn attempt(student_id: i64, score: i32) -> ScoredAttempt {
        ScoredAttempt {
            student_id,
            quiz_id: 1,
            score,
            question_count: 3,
            quiz_name: "Quiz 1".to_string(),
            recorded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_append_creates_then_extends_entry() {
        let store = MemoryStore::new();

        let first = store.append_score(&attempt(10, 2)).await.unwrap();
        assert_eq!(first.scores, vec![2]);
        assert_eq!(first.quiz_name, "Quiz 1");

        let mut renamed = attempt(10, 3);
        renamed.quiz_name = "Renamed".to_string();
        let second = store.append_score(&renamed).await.unwrap();
        assert_eq!(second.scores, vec![2, 3]);
        // Snapshots stay as written on creation
        assert_eq!(second.quiz_name, "Quiz 1");
        assert_eq!(store.count_entries_for_quiz(1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reschedule_refused_once_entries_exist() {
        let store = MemoryStore::new();
        let original = quiz(1, "Class7");
        let start = original.start_time;
        store.insert_quiz(original).await;

        let moved = store
            .reschedule_quiz(1, start + chrono::Duration::hours(1))
            .await
            .unwrap();
        assert!(moved.is_some());

        store.append_score(&attempt(10, 1)).await.unwrap();
        let refused = store
            .reschedule_quiz(1, start + chrono::Duration::hours(2))
            .await
            .unwrap();
        assert!(refused.is_none());

        let stored = store.get_quiz_by_id(1).await.unwrap().unwrap();
        assert_eq!(stored.start_time, start + chrono::Duration::hours(1));
    }

    #[tokio::test]
    async fn test_insert_quiz_advances_id_sequence() {
        let store = MemoryStore::new();
        store.insert_quiz(quiz(41, "Class7")).await;

        let req = PublishQuizRequest {
            name: "Next".to_string(),
            target_class: "Class7".to_string(),
            duration_minutes: 10,
            start_time: Utc::now(),
            retake_allowed: true,
            answer_key: vec![AnswerKeyEntry::new("q1", "A")],
            thumbnail: None,
        };
        let published = store.publish_quiz(&req).await.unwrap();
        assert_eq!(published.id, 42);
    }
}
