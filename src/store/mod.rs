// src/store/mod.rs

//! Persistence seams for the quiz engine.
//!
//! The catalog is read-only at runtime; [`CatalogWriter`] exists for seeding.
//! [`AttemptStore`] owns the attempt lifecycle writes and must apply an answer
//! and its counter increment as one atomic step.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    attempt::{AnsweredQuestion, Answer, Attempt, NewAnswer},
    quiz::{NewQuiz, Question, Quiz},
    user::User,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("integrity violation: {0}")]
    Integrity(String),
}

/// Maps `(total_questions, correct_answers)` to a stored score.
pub type ScoreFn = fn(i32, i32) -> f64;

/// Outcome of [`AttemptStore::record_answer`].
#[derive(Debug)]
pub enum AnswerOutcome {
    Recorded(Answer),
    /// The (attempt, question) pair already has an answer.
    Duplicate,
    /// The attempt has a completion timestamp.
    AttemptClosed,
    AttemptMissing,
}

/// Outcome of [`AttemptStore::complete_attempt`].
#[derive(Debug)]
pub enum CompletionOutcome {
    Completed(Attempt),
    AlreadyCompleted,
    AttemptMissing,
}

#[async_trait]
pub trait QuizCatalog: Send + Sync {
    /// Active quizzes of `level`, ordered by `sort_order`, with their questions.
    async fn list_by_level(
        &self,
        level: i32,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Quiz>, StoreError>;

    /// Any quiz by id, active or not, with its questions.
    async fn find_quiz(&self, quiz_id: i64) -> Result<Option<Quiz>, StoreError>;

    async fn find_question(&self, question_id: i64) -> Result<Option<Question>, StoreError>;
}

#[async_trait]
pub trait CatalogWriter: Send + Sync {
    async fn count_quizzes(&self) -> Result<i64, StoreError>;

    /// Inserts a quiz and all of its questions together.
    async fn insert_quiz(&self, quiz: &NewQuiz) -> Result<Quiz, StoreError>;

    /// Inserts every quiz in one atomic step: either the whole batch is
    /// written or none of it is.
    async fn insert_catalog(&self, quizzes: &[NewQuiz]) -> Result<Vec<Quiz>, StoreError>;
}

#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn find_user(&self, user_id: i64) -> Result<Option<User>, StoreError>;

    async fn create_attempt(
        &self,
        user_id: i64,
        quiz_id: i64,
        total_questions: i32,
    ) -> Result<Attempt, StoreError>;

    async fn find_attempt(&self, attempt_id: i64) -> Result<Option<Attempt>, StoreError>;

    /// Persists the answer and, when it is correct, increments
    /// `correct_answers` in the same atomic step.
    async fn record_answer(&self, answer: NewAnswer) -> Result<AnswerOutcome, StoreError>;

    /// Computes the score from the counters under lock and sets the completion
    /// timestamp. Never overwrites an already completed attempt.
    async fn complete_attempt(
        &self,
        attempt_id: i64,
        score: ScoreFn,
        completed_at: DateTime<Utc>,
    ) -> Result<CompletionOutcome, StoreError>;

    /// Answers of an attempt joined with their questions, in submission order.
    async fn answered_questions(
        &self,
        attempt_id: i64,
    ) -> Result<Vec<AnsweredQuestion>, StoreError>;
}
