// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    error::AppError,
    models::ledger::{Answers, SubmitAttemptRequest},
    services::{AttemptRecorder, AvailabilityResolver},
    utils::jwt::Claims,
};

/// Query parameters for listing quizzes.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub class: Option<String>,
}

/// Lists the quizzes the requesting class may currently see.
/// Answer keys are never included.
pub async fn list_quizzes(
    State(resolver): State<AvailabilityResolver>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = params?;
    let class = params
        .class
        .ok_or(AppError::InvalidInput("Missing 'class' query parameter".to_string()))?;

    let quizzes = resolver.list_eligible_quizzes(&class).await?;

    Ok(Json(quizzes))
}

/// Live status and remaining time of one quiz.
pub async fn get_quiz_status(
    State(resolver): State<AvailabilityResolver>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let status = resolver.get_quiz_status(id).await?;

    Ok(Json(status))
}

/// Submits a student's answers for grading.
///
/// * The student is identified by the token subject.
/// * The body is read raw: whatever it holds, malformed answers are graded
///   as incorrect, never rejected.
/// * Returns the score of this submission only.
pub async fn submit_attempt(
    State(recorder): State<AttemptRecorder>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<i64>, PathRejection>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let student_id = claims.user_id()?;
    let req = SubmitAttemptRequest::from_body(&body);
    let answers = Answers::from_value(&req.answers);

    let result = recorder.submit_attempt(student_id, id, &answers).await?;

    Ok(Json(result))
}

/// Score history of the current user.
pub async fn list_my_results(
    State(recorder): State<AttemptRecorder>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;

    let results = recorder.list_student_results(student_id).await?;

    Ok(Json(results))
}
