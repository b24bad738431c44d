// src/services/recorder.rs

use std::sync::Arc;
use std::time::Duration;

use super::{grading::grade, locks::KeyedLocks, require_positive_id};
use crate::{
    error::AppError,
    models::ledger::{Answers, ResultView, ScoredAttempt, SubmissionResult},
    store::{AttemptLedger, QuizCatalog},
    utils::clock::Clock,
};

/// Grades submissions and accumulates scores in the attempt ledger.
///
/// Ledger writes are serialized per (student, quiz) key within the process.
/// Different keys proceed in parallel.
#[derive(Clone)]
pub struct AttemptRecorder {
    catalog: Arc<dyn QuizCatalog>,
    ledger: Arc<dyn AttemptLedger>,
    clock: Arc<dyn Clock>,
    locks: Arc<KeyedLocks<(i64, i64)>>,
    lock_timeout: Duration,
}

impl AttemptRecorder {
    pub fn new(
        catalog: Arc<dyn QuizCatalog>,
        ledger: Arc<dyn AttemptLedger>,
        clock: Arc<dyn Clock>,
        lock_timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            ledger,
            clock,
            locks: Arc::new(KeyedLocks::new()),
            lock_timeout,
        }
    }

    /// Grades `answers` against the quiz's key and appends the score.
    ///
    /// * First submission for the pair creates the entry and snapshots the
    ///   question count and quiz name.
    /// * Later submissions append, whatever the retake policy says.
    ///
    /// Never retries: a lock wait past the bound fails with
    /// `TransientLockTimeout` and leaves the ledger untouched.
    pub async fn submit_attempt(
        &self,
        student_id: i64,
        quiz_id: i64,
        answers: &Answers,
    ) -> Result<SubmissionResult, AppError> {
        require_positive_id("student id", student_id)?;
        require_positive_id("quiz id", quiz_id)?;

        let quiz = self
            .catalog
            .get_quiz_by_id(quiz_id)
            .await?
            .ok_or(AppError::NotFound(format!("Quiz {} not found", quiz_id)))?;

        let score = grade(&quiz.answer_key, answers);

        let key = (student_id, quiz_id);
        let _guard = self
            .locks
            .acquire(&key, self.lock_timeout)
            .await
            .map_err(|_| {
                tracing::warn!(
                    student_id,
                    quiz_id,
                    "Timed out waiting for ledger lock"
                );
                AppError::TransientLockTimeout {
                    student_id,
                    quiz_id,
                    waited_ms: self.lock_timeout.as_millis() as u64,
                }
            })?;

        let attempt = ScoredAttempt {
            student_id,
            quiz_id,
            score,
            question_count: quiz.question_count(),
            quiz_name: quiz.name.clone(),
            recorded_at: self.clock.now(),
        };
        let entry = self.ledger.append_score(&attempt).await?;

        if entry.attempts() > 1 && !quiz.retake_allowed {
            tracing::warn!(
                student_id,
                quiz_id,
                previous_attempts = entry.attempts() - 1,
                "Repeat submission on a quiz without retakes"
            );
        }
        tracing::info!(
            student_id,
            quiz_id,
            score,
            attempt = entry.attempts(),
            "Recorded quiz attempt"
        );

        Ok(SubmissionResult {
            quiz_id,
            score,
            question_count: quiz.question_count(),
            attempt_number: entry.attempts(),
        })
    }

    /// Every ledger entry of one student, most recently updated first.
    pub async fn list_student_results(&self, student_id: i64) -> Result<Vec<ResultView>, AppError> {
        require_positive_id("student id", student_id)?;

        let entries = self.ledger.list_entries_for_student(student_id).await?;
        Ok(entries.into_iter().map(ResultView::from).collect())
    }

    /// Every ledger entry of one quiz, best score first.
    pub async fn list_quiz_results(&self, quiz_id: i64) -> Result<Vec<ResultView>, AppError> {
        require_positive_id("quiz id", quiz_id)?;

        if self.catalog.get_quiz_by_id(quiz_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Quiz {} not found", quiz_id)));
        }

        let mut results: Vec<ResultView> = self
            .ledger
            .list_entries_for_quiz(quiz_id)
            .await?
            .into_iter()
            .map(ResultView::from)
            .collect();
        results.sort_by(|a, b| {
            b.best_score
                .cmp(&a.best_score)
                .then(a.student_id.cmp(&b.student_id))
        });

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::quiz::{AnswerKeyEntry, QuizDefinition},
        store::MemoryStore,
        utils::clock::ManualClock,
    };
    use chrono::{TimeZone, Utc};
    use sqlx::types::Json;

    fn quiz(id: i64, retake: bool) -> QuizDefinition {
        QuizDefinition {
            id,
            name: format!("Quiz {}", id),
            target_class: "Class7".to_string(),
            duration_minutes: 30,
            start_time: Utc.with_ymd_and_hms(2024, 9, 2, 10, 0, 0).unwrap(),
            retake_allowed: retake,
            answer_key: Json(
                (1..=5)
                    .map(|i| AnswerKeyEntry::new(format!("q{}", i), "A"))
                    .collect(),
            ),
            thumbnail: None,
        }
    }

    async fn recorder_with(quizzes: Vec<QuizDefinition>) -> (AttemptRecorder, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        for q in quizzes {
            store.insert_quiz(q).await;
        }
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 9, 2, 10, 5, 0).unwrap()));
        let recorder = AttemptRecorder::new(
            store.clone(),
            store.clone(),
            clock,
            Duration::from_millis(200),
        );
        (recorder, store)
    }

    fn three_correct() -> Answers {
        [("q1", "A"), ("q2", "A"), ("q3", "A"), ("q4", "D")]
            .into_iter()
            .collect()
    }

    #[tokio::test]
    async fn test_first_submission_creates_entry_with_snapshots() {
        let (recorder, store) = recorder_with(vec![quiz(1, false)]).await;

        let result = recorder.submit_attempt(9, 1, &three_correct()).await.unwrap();
        assert_eq!(result.score, 3);
        assert_eq!(result.question_count, 5);
        assert_eq!(result.attempt_number, 1);

        let entry = store.get_ledger_entry(9, 1).await.unwrap().unwrap();
        assert_eq!(entry.scores, vec![3]);
        assert_eq!(entry.question_count, 5);
        assert_eq!(entry.quiz_name, "Quiz 1");
    }

    #[tokio::test]
    async fn test_repeat_submission_appends_and_grades_identically() {
        let (recorder, store) = recorder_with(vec![quiz(1, false)]).await;

        let first = recorder.submit_attempt(9, 1, &three_correct()).await.unwrap();
        let second = recorder.submit_attempt(9, 1, &three_correct()).await.unwrap();
        assert_eq!(first.score, second.score);
        assert_eq!(second.attempt_number, 2);

        let entry = store.get_ledger_entry(9, 1).await.unwrap().unwrap();
        assert_eq!(entry.scores, vec![3, 3]);
    }

    #[tokio::test]
    async fn test_submission_errors() {
        let (recorder, _) = recorder_with(vec![quiz(1, true)]).await;

        assert!(matches!(
            recorder.submit_attempt(9, 77, &Answers::new()).await.unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            recorder.submit_attempt(0, 1, &Answers::new()).await.unwrap_err(),
            AppError::InvalidInput(_)
        ));
        assert!(matches!(
            recorder.submit_attempt(9, -3, &Answers::new()).await.unwrap_err(),
            AppError::InvalidInput(_)
        ));
    }

    #[tokio::test]
    async fn test_empty_answers_score_zero() {
        let (recorder, _) = recorder_with(vec![quiz(1, true)]).await;
        let result = recorder.submit_attempt(9, 1, &Answers::new()).await.unwrap();
        assert_eq!(result.score, 0);
    }

    #[tokio::test]
    async fn test_lock_timeout_leaves_ledger_untouched() {
        let (recorder, store) = recorder_with(vec![quiz(1, true)]).await;

        let _held = recorder
            .locks
            .acquire(&(9, 1), Duration::from_millis(50))
            .await
            .unwrap();

        let err = recorder
            .submit_attempt(9, 1, &three_correct())
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert!(store.get_ledger_entry(9, 1).await.unwrap().is_none());

        // Other keys are unaffected
        assert!(recorder.submit_attempt(10, 1, &three_correct()).await.is_ok());
    }

    #[tokio::test]
    async fn test_quiz_results_sorted_by_best_score() {
        let (recorder, _) = recorder_with(vec![quiz(1, true)]).await;
        let perfect: Answers = (1..=5).map(|i| (format!("q{}", i), "A")).collect();

        recorder.submit_attempt(20, 1, &Answers::new()).await.unwrap();
        recorder.submit_attempt(21, 1, &three_correct()).await.unwrap();
        recorder.submit_attempt(20, 1, &perfect).await.unwrap();

        let results = recorder.list_quiz_results(1).await.unwrap();
        let order: Vec<(i64, i32)> = results.iter().map(|r| (r.student_id, r.best_score)).collect();
        assert_eq!(order, vec![(20, 5), (21, 3)]);

        assert!(matches!(
            recorder.list_quiz_results(2).await.unwrap_err(),
            AppError::NotFound(_)
        ));

        let mine = recorder.list_student_results(20).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].scores, vec![0, 5]);
    }
}
