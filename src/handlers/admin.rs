// src/handlers/admin.rs

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::quiz::{PublishQuizRequest, RescheduleRequest},
    services::{AttemptRecorder, QuizScheduler},
};

/// Publishes a new quiz.
/// Staff only.
pub async fn publish_quiz(
    State(scheduler): State<QuizScheduler>,
    payload: Result<Json<PublishQuizRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let quiz = scheduler.publish_quiz(&payload).await?;

    Ok((StatusCode::CREATED, Json(quiz.summary())))
}

/// Moves a quiz's start time. Refused once attempts exist.
/// Staff only.
pub async fn reschedule_quiz(
    State(scheduler): State<QuizScheduler>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<RescheduleRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let quiz = scheduler.reschedule_quiz(id, payload.start_time).await?;

    Ok(Json(quiz.summary()))
}

/// All students' results on one quiz, best score first.
/// Staff only.
pub async fn list_quiz_results(
    State(recorder): State<AttemptRecorder>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let results = recorder.list_quiz_results(id).await?;

    Ok(Json(results))
}
