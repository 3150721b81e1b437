// src/services/quiz_engine.rs

//! Quiz catalog reads and the attempt lifecycle: start, answer, complete, result.

use std::sync::Arc;

use chrono::Utc;

use crate::{
    models::{
        attempt::{
            AnswerResult, Attempt, AttemptResult, NewAnswer, StartAttemptResponse,
            SubmitAnswerResponse,
        },
        quiz::Quiz,
    },
    services::scoring::calculate_score,
    store::{AnswerOutcome, AttemptStore, CompletionOutcome, QuizCatalog, StoreError},
};

#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    #[error("quiz not found")]
    QuizNotFound,

    #[error("question not found")]
    QuestionNotFound,

    #[error("quiz attempt not found")]
    AttemptNotFound,

    #[error("user not found")]
    UserNotFound,

    /// The attempt exists but belongs to someone else.
    #[error("access to attempt denied")]
    AccessDenied,

    #[error("quiz attempt is already completed")]
    AttemptAlreadyCompleted,

    #[error("question was already answered in this attempt")]
    AnswerAlreadySubmitted,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct QuizEngine {
    catalog: Arc<dyn QuizCatalog>,
    attempts: Arc<dyn AttemptStore>,
}

impl QuizEngine {
    pub fn new(catalog: Arc<dyn QuizCatalog>, attempts: Arc<dyn AttemptStore>) -> Self {
        Self { catalog, attempts }
    }

    /// Active quizzes of one level, paged. An empty page is not an error.
    pub async fn list_by_level(
        &self,
        level: i32,
        page: i64,
        limit: i64,
    ) -> Result<Vec<Quiz>, QuizError> {
        if !(1..=3).contains(&level) {
            return Err(QuizError::InvalidInput(
                "level must be between 1 and 3".to_string(),
            ));
        }
        if page < 1 || limit < 1 {
            return Err(QuizError::InvalidInput(
                "page and limit must be positive".to_string(),
            ));
        }

        let offset = (page - 1).saturating_mul(limit);
        Ok(self.catalog.list_by_level(level, offset, limit).await?)
    }

    pub async fn get_quiz(&self, quiz_id: i64) -> Result<Quiz, QuizError> {
        self.catalog
            .find_quiz(quiz_id)
            .await?
            .ok_or(QuizError::QuizNotFound)
    }

    /// Creates a new attempt. The question count is captured now and never
    /// re-derived from the catalog.
    pub async fn start(
        &self,
        quiz_id: i64,
        user_id: i64,
    ) -> Result<StartAttemptResponse, QuizError> {
        let quiz = self.get_quiz(quiz_id).await?;

        self.attempts
            .find_user(user_id)
            .await?
            .ok_or(QuizError::UserNotFound)?;

        let total_questions = i32::try_from(quiz.questions.len())
            .map_err(|_| QuizError::InvalidInput("quiz has too many questions".to_string()))?;

        let attempt = self
            .attempts
            .create_attempt(user_id, quiz.id, total_questions)
            .await?;

        tracing::info!(
            attempt_id = attempt.id,
            quiz_id = quiz.id,
            user_id,
            total_questions,
            "Quiz attempt started"
        );

        Ok(StartAttemptResponse {
            attempt_id: attempt.id,
            quiz_id: quiz.id,
            total_questions,
            title: quiz.title,
        })
    }

    /// Records one answer and returns immediate feedback.
    pub async fn submit_answer(
        &self,
        attempt_id: i64,
        question_id: i64,
        selected_answer: i32,
        user_id: i64,
    ) -> Result<SubmitAnswerResponse, QuizError> {
        if selected_answer < 0 {
            return Err(QuizError::InvalidInput(
                "selected answer cannot be negative".to_string(),
            ));
        }

        let attempt = self.owned_attempt(attempt_id, Some(user_id)).await?;
        if attempt.is_completed() {
            tracing::warn!(attempt_id, user_id, "Answer submitted to a completed attempt");
            return Err(QuizError::AttemptAlreadyCompleted);
        }

        let question = self
            .catalog
            .find_question(question_id)
            .await?
            .filter(|q| q.quiz_id == attempt.quiz_id)
            .ok_or(QuizError::QuestionNotFound)?;

        let outcome = self
            .attempts
            .record_answer(NewAnswer {
                attempt_id,
                question_id,
                selected_answer,
                is_correct: question.is_correct(selected_answer),
            })
            .await?;

        let answer = match outcome {
            AnswerOutcome::Recorded(answer) => answer,
            AnswerOutcome::Duplicate => {
                tracing::warn!(attempt_id, question_id, "Question answered twice");
                return Err(QuizError::AnswerAlreadySubmitted);
            }
            AnswerOutcome::AttemptClosed => return Err(QuizError::AttemptAlreadyCompleted),
            AnswerOutcome::AttemptMissing => return Err(QuizError::AttemptNotFound),
        };

        tracing::info!(
            attempt_id,
            question_id,
            answer_id = answer.id,
            is_correct = answer.is_correct,
            "Answer recorded"
        );

        Ok(SubmitAnswerResponse {
            question_id: answer.question_id,
            is_correct: answer.is_correct,
            correct_answer: question.correct_answer,
            explanation: question.explanation,
        })
    }

    /// Finalizes the attempt. Completion is one-way: a second call fails with
    /// `AttemptAlreadyCompleted` and leaves the stored score untouched.
    pub async fn complete(&self, attempt_id: i64, user_id: i64) -> Result<AttemptResult, QuizError> {
        self.owned_attempt(attempt_id, Some(user_id)).await?;

        let outcome = self
            .attempts
            .complete_attempt(attempt_id, calculate_score, Utc::now())
            .await?;

        let attempt = match outcome {
            CompletionOutcome::Completed(attempt) => attempt,
            CompletionOutcome::AlreadyCompleted => {
                tracing::warn!(attempt_id, user_id, "Attempt completed twice");
                return Err(QuizError::AttemptAlreadyCompleted);
            }
            CompletionOutcome::AttemptMissing => return Err(QuizError::AttemptNotFound),
        };

        tracing::info!(
            attempt_id,
            score = ?attempt.score,
            correct_answers = attempt.correct_answers,
            total_questions = attempt.total_questions,
            "Quiz attempt completed"
        );

        self.assemble_result(attempt).await
    }

    /// Reads the last persisted state of an attempt. Passing `None` skips the
    /// ownership check and is reserved for trusted internal callers.
    pub async fn get_result(
        &self,
        attempt_id: i64,
        user_id: Option<i64>,
    ) -> Result<AttemptResult, QuizError> {
        let attempt = self.owned_attempt(attempt_id, user_id).await?;
        self.assemble_result(attempt).await
    }

    async fn owned_attempt(
        &self,
        attempt_id: i64,
        user_id: Option<i64>,
    ) -> Result<Attempt, QuizError> {
        let attempt = self
            .attempts
            .find_attempt(attempt_id)
            .await?
            .ok_or(QuizError::AttemptNotFound)?;

        if let Some(user_id) = user_id {
            if !attempt.is_owned_by(user_id) {
                tracing::warn!(attempt_id, user_id, "Attempt access denied");
                return Err(QuizError::AccessDenied);
            }
        }

        Ok(attempt)
    }

    async fn assemble_result(&self, attempt: Attempt) -> Result<AttemptResult, QuizError> {
        let answers: Vec<AnswerResult> = self
            .attempts
            .answered_questions(attempt.id)
            .await?
            .into_iter()
            .map(AnswerResult::from)
            .collect();

        Ok(AttemptResult {
            id: attempt.id,
            quiz_id: attempt.quiz_id,
            user_id: attempt.user_id,
            status: attempt.status(answers.len()),
            total_questions: attempt.total_questions,
            correct_answers: attempt.correct_answers,
            score: attempt.score,
            completed_at: attempt.completed_at,
            answers,
        })
    }
}
