// src/services/scheduling.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use validator::Validate;

use super::require_positive_id;
use crate::{
    error::AppError,
    models::quiz::{PublishQuizRequest, QuizDefinition},
    store::{AttemptLedger, QuizAuthoring},
};

/// Staff-side writes to the catalog.
#[derive(Clone)]
pub struct QuizScheduler {
    authoring: Arc<dyn QuizAuthoring>,
    ledger: Arc<dyn AttemptLedger>,
}

impl QuizScheduler {
    pub fn new(authoring: Arc<dyn QuizAuthoring>, ledger: Arc<dyn AttemptLedger>) -> Self {
        Self { authoring, ledger }
    }

    pub async fn publish_quiz(&self, req: &PublishQuizRequest) -> Result<QuizDefinition, AppError> {
        req.validate()?;

        let quiz = self.authoring.publish_quiz(req).await?;
        tracing::info!(
            quiz_id = quiz.id,
            target_class = %quiz.target_class,
            "Published quiz"
        );
        Ok(quiz)
    }

    /// Moves the quiz window. Refused once anyone has submitted an attempt,
    /// since recorded scores were earned against the old window.
    pub async fn reschedule_quiz(
        &self,
        quiz_id: i64,
        start_time: DateTime<Utc>,
    ) -> Result<QuizDefinition, AppError> {
        require_positive_id("quiz id", quiz_id)?;

        let Some(quiz) = self.authoring.reschedule_quiz(quiz_id, start_time).await? else {
            // Nothing written: either no such quiz or attempts already exist
            let attempts = self.ledger.count_entries_for_quiz(quiz_id).await?;
            if attempts > 0 {
                return Err(AppError::Conflict(format!(
                    "Quiz {} already has {} recorded attempt(s); its start time can no longer change",
                    quiz_id, attempts
                )));
            }
            return Err(AppError::NotFound(format!("Quiz {} not found", quiz_id)));
        };

        tracing::info!(quiz_id, %start_time, "Rescheduled quiz");
        Ok(quiz)
    }
}
