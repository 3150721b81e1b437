// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    extractors::AppJson,
    models::{
        attempt::{StartAttemptRequest, SubmitAnswerRequest},
        quiz::{ListQuizzesParams, QuizResponse},
    },
    services::QuizEngine,
    utils::jwt::Claims,
};

/// Lists active quizzes of one difficulty level.
///
/// Query: `level` (1-3, required), `page` (default 1), `limit` (default 10, max 100).
/// Questions are returned without their correct answers.
pub async fn list_quizzes(
    State(engine): State<QuizEngine>,
    params: Result<Query<ListQuizzesParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = params.map_err(|e| AppError::BadRequest(e.body_text()))?;
    if let Err(validation_errors) = params.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let quizzes: Vec<QuizResponse> = engine
        .list_by_level(params.level, params.page(), params.limit())
        .await?
        .into_iter()
        .map(QuizResponse::from)
        .collect();

    Ok(Json(quizzes))
}

/// Retrieves a single quiz with its questions.
pub async fn get_quiz(
    State(engine): State<QuizEngine>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = path_id(id)?;
    let quiz = engine.get_quiz(id).await?;
    Ok(Json(QuizResponse::from(quiz)))
}

/// Starts a new attempt for the caller.
pub async fn start_attempt(
    State(engine): State<QuizEngine>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<StartAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = req.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id()?;
    let started = engine.start(req.quiz_id, user_id).await?;

    Ok((StatusCode::CREATED, Json(started)))
}

/// Records the caller's answer to one question and returns immediate feedback.
pub async fn submit_answer(
    State(engine): State<QuizEngine>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = req.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id()?;
    let feedback = engine
        .submit_answer(req.attempt_id, req.question_id, req.selected_answer, user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(feedback)))
}

/// Completes the caller's attempt and returns the scored result.
pub async fn complete_attempt(
    State(engine): State<QuizEngine>,
    Extension(claims): Extension<Claims>,
    attempt_id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let attempt_id = path_id(attempt_id)?;
    let user_id = claims.user_id()?;
    let result = engine.complete(attempt_id, user_id).await?;
    Ok(Json(result))
}

/// Returns the last persisted result of the caller's attempt.
pub async fn get_attempt_result(
    State(engine): State<QuizEngine>,
    Extension(claims): Extension<Claims>,
    attempt_id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let attempt_id = path_id(attempt_id)?;
    let user_id = claims.user_id()?;
    let result = engine.get_result(attempt_id, Some(user_id)).await?;
    Ok(Json(result))
}

fn path_id(id: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    let Path(id) = id.map_err(|e| AppError::BadRequest(e.body_text()))?;
    Ok(id)
}
