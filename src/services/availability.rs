// src/services/availability.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::require_positive_id;
use crate::{
    config::CohortPolicy,
    error::AppError,
    models::quiz::{QuizDefinition, QuizStatus, QuizStatusView, QuizSummary},
    store::QuizCatalog,
    utils::{clock::Clock, window},
};

/// Decides which quizzes a class may see and the live status of one quiz.
/// Never writes anything.
#[derive(Clone)]
pub struct AvailabilityResolver {
    catalog: Arc<dyn QuizCatalog>,
    cohorts: Arc<CohortPolicy>,
    clock: Arc<dyn Clock>,
}

impl AvailabilityResolver {
    pub fn new(catalog: Arc<dyn QuizCatalog>, cohorts: CohortPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            catalog,
            cohorts: Arc::new(cohorts),
            clock,
        }
    }

    /// Lists the quizzes `requesting_class` may currently see.
    ///
    /// * Restricted cohorts only get quizzes targeted at them exactly.
    /// * Other cohorts also get quizzes targeted at every cohort.
    /// * Non-retake quizzes outside their window are left out.
    ///
    /// An unrecognized class yields an empty list.
    pub async fn list_eligible_quizzes(
        &self,
        requesting_class: &str,
    ) -> Result<Vec<QuizSummary>, AppError> {
        let class = requesting_class.trim();
        if class.is_empty() {
            return Err(AppError::InvalidInput(
                "Class identifier must not be blank".to_string(),
            ));
        }
        if !self.cohorts.is_known(class) {
            tracing::debug!("Unrecognized class {:?}, returning no quizzes", class);
            return Ok(Vec::new());
        }

        let include_global = !self.cohorts.is_restricted(class);
        let candidates = self
            .catalog
            .list_quizzes_by_class_or_global(class, include_global)
            .await?;

        let now = self.clock.now();
        let mut eligible: Vec<QuizSummary> = candidates
            .iter()
            .filter(|quiz| is_eligible(quiz, now))
            .map(QuizDefinition::summary)
            .collect();
        eligible.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(a.id.cmp(&b.id)));

        Ok(eligible)
    }

    /// Live status and remaining time budget of one quiz.
    pub async fn get_quiz_status(&self, quiz_id: i64) -> Result<QuizStatusView, AppError> {
        require_positive_id("quiz id", quiz_id)?;

        let quiz = self
            .catalog
            .get_quiz_by_id(quiz_id)
            .await?
            .ok_or(AppError::NotFound(format!("Quiz {} not found", quiz_id)))?;

        Ok(resolve_status(&quiz, self.clock.now()))
    }
}

/// Retake-enabled quizzes are always listed; others only inside their window.
pub fn is_eligible(quiz: &QuizDefinition, now: DateTime<Utc>) -> bool {
    quiz.retake_allowed || window::is_within_window(quiz.start_time, quiz.duration_minutes, now)
}

pub fn resolve_status(quiz: &QuizDefinition, now: DateTime<Utc>) -> QuizStatusView {
    let end_time = window::end_time(quiz.start_time, quiz.duration_minutes);

    let (status, time_left_secs, starts_in_secs) = if quiz.retake_allowed {
        // Each attempt gets a fresh clock on the client
        (
            QuizStatus::RetakeOpen,
            i64::from(quiz.duration_minutes) * 60,
            None,
        )
    } else {
        let status = if window::is_within_window(quiz.start_time, quiz.duration_minutes, now) {
            QuizStatus::Active
        } else {
            QuizStatus::Expired
        };
        (
            status,
            window::seconds_until_end(quiz.start_time, quiz.duration_minutes, now),
            window::seconds_until_start(quiz.start_time, now),
        )
    };

    QuizStatusView {
        id: quiz.id,
        name: quiz.name.clone(),
        status,
        time_left_secs,
        starts_in_secs,
        question_count: quiz.question_count(),
        duration_minutes: quiz.duration_minutes,
        start_time: quiz.start_time,
        end_time,
        retake_allowed: quiz.retake_allowed,
        thumbnail: quiz.thumbnail.clone(),
    }
}
