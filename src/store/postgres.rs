// src/store/postgres.rs

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, postgres::PgPoolOptions};

use super::{
    AnswerOutcome, AttemptStore, CatalogWriter, CompletionOutcome, QuizCatalog, ScoreFn,
    StoreError,
};
use crate::models::{
    attempt::{AnsweredQuestion, Answer, Attempt, NewAnswer},
    quiz::{NewQuiz, Question, Quiz},
    user::User,
};

const CONNECT_RETRIES: u32 = 5;

const QUIZ_COLUMNS: &str = "id, title, description, level, sort_order, is_active, created_at";
const QUESTION_COLUMNS: &str =
    "id, quiz_id, question, options, correct_answer, explanation, sort_order";
const ATTEMPT_COLUMNS: &str =
    "id, user_id, quiz_id, total_questions, correct_answers, score, completed_at, created_at";

/// Postgres-backed catalog and attempt store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database, retrying while it is not ready yet.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        let mut retry_count = 0;
        loop {
            match PgPoolOptions::new()
                .max_connections(max_connections)
                .acquire_timeout(Duration::from_secs(3))
                .connect(database_url)
                .await
            {
                Ok(pool) => return Ok(pool),
                Err(e) => {
                    retry_count += 1;
                    if retry_count > CONNECT_RETRIES {
                        return Err(e);
                    }
                    tracing::warn!(
                        "Database not ready, retrying in 2s... (Attempt {})",
                        retry_count
                    );
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn questions_for(&self, quiz_ids: &[i64]) -> Result<Vec<Question>, StoreError> {
        let questions = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM quiz_questions
             WHERE quiz_id = ANY($1)
             ORDER BY quiz_id, sort_order, id"
        ))
        .bind(quiz_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(questions)
    }
}

/// Maps foreign key violations to `StoreError::Integrity`.
fn integrity_or_database(e: sqlx::Error) -> StoreError {
    let is_fk = e
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == "23503");
    if is_fk {
        StoreError::Integrity(e.to_string())
    } else {
        StoreError::Database(e)
    }
}

#[async_trait]
impl QuizCatalog for PgStore {
    async fn list_by_level(
        &self,
        level: i32,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Quiz>, StoreError> {
        let mut quizzes = sqlx::query_as::<_, Quiz>(&format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes
             WHERE level = $1 AND is_active
             ORDER BY sort_order, id
             LIMIT $2 OFFSET $3"
        ))
        .bind(level)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        if quizzes.is_empty() {
            return Ok(quizzes);
        }

        let ids: Vec<i64> = quizzes.iter().map(|q| q.id).collect();
        let mut by_quiz: HashMap<i64, Vec<Question>> = HashMap::new();
        for question in self.questions_for(&ids).await? {
            by_quiz.entry(question.quiz_id).or_default().push(question);
        }
        for quiz in &mut quizzes {
            quiz.questions = by_quiz.remove(&quiz.id).unwrap_or_default();
        }

        Ok(quizzes)
    }

    async fn find_quiz(&self, quiz_id: i64) -> Result<Option<Quiz>, StoreError> {
        let quiz = sqlx::query_as::<_, Quiz>(&format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = $1"
        ))
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(mut quiz) = quiz else {
            return Ok(None);
        };
        quiz.questions = self.questions_for(&[quiz.id]).await?;

        Ok(Some(quiz))
    }

    async fn find_question(&self, question_id: i64) -> Result<Option<Question>, StoreError> {
        let question = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM quiz_questions WHERE id = $1"
        ))
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(question)
    }
}

#[async_trait]
impl CatalogWriter for PgStore {
    async fn count_quizzes(&self) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM quizzes")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert_quiz(&self, new_quiz: &NewQuiz) -> Result<Quiz, StoreError> {
        let mut tx = self.pool.begin().await?;
        let quiz = insert_quiz_in(&mut *tx, new_quiz).await?;
        tx.commit().await?;
        Ok(quiz)
    }

    async fn insert_catalog(&self, quizzes: &[NewQuiz]) -> Result<Vec<Quiz>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let mut created = Vec::with_capacity(quizzes.len());
        for new_quiz in quizzes {
            created.push(insert_quiz_in(&mut *tx, new_quiz).await?);
        }

        tx.commit().await?;
        Ok(created)
    }
}

#[async_trait]
impl AttemptStore for PgStore {
    async fn find_user(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, role, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_attempt(
        &self,
        user_id: i64,
        quiz_id: i64,
        total_questions: i32,
    ) -> Result<Attempt, StoreError> {
        sqlx::query_as::<_, Attempt>(&format!(
            "INSERT INTO quiz_attempts (user_id, quiz_id, total_questions)
             VALUES ($1, $2, $3)
             RETURNING {ATTEMPT_COLUMNS}"
        ))
        .bind(user_id)
        .bind(quiz_id)
        .bind(total_questions)
        .fetch_one(&self.pool)
        .await
        .map_err(integrity_or_database)
    }

    async fn find_attempt(&self, attempt_id: i64) -> Result<Option<Attempt>, StoreError> {
        let attempt = sqlx::query_as::<_, Attempt>(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts WHERE id = $1"
        ))
        .bind(attempt_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(attempt)
    }

    async fn record_answer(&self, answer: NewAnswer) -> Result<AnswerOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes answers against completion of the same attempt.
        let state: Option<(Option<DateTime<Utc>>,)> =
            sqlx::query_as("SELECT completed_at FROM quiz_attempts WHERE id = $1 FOR UPDATE")
                .bind(answer.attempt_id)
                .fetch_optional(&mut *tx)
                .await?;

        match state {
            None => return Ok(AnswerOutcome::AttemptMissing),
            Some((Some(_),)) => return Ok(AnswerOutcome::AttemptClosed),
            Some((None,)) => {}
        }

        let inserted = sqlx::query_as::<_, Answer>(
            r#"
            INSERT INTO quiz_answers (attempt_id, question_id, selected_answer, is_correct)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (attempt_id, question_id) DO NOTHING
            RETURNING id, attempt_id, question_id, selected_answer, is_correct, created_at
            "#,
        )
        .bind(answer.attempt_id)
        .bind(answer.question_id)
        .bind(answer.selected_answer)
        .bind(answer.is_correct)
        .fetch_optional(&mut *tx)
        .await
        .map_err(integrity_or_database)?;

        let Some(inserted) = inserted else {
            tx.rollback().await?;
            return Ok(AnswerOutcome::Duplicate);
        };

        if inserted.is_correct {
            sqlx::query(
                "UPDATE quiz_attempts SET correct_answers = correct_answers + 1 WHERE id = $1",
            )
            .bind(answer.attempt_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(AnswerOutcome::Recorded(inserted))
    }

    async fn complete_attempt(
        &self,
        attempt_id: i64,
        score: ScoreFn,
        completed_at: DateTime<Utc>,
    ) -> Result<CompletionOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let attempt = sqlx::query_as::<_, Attempt>(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts WHERE id = $1 FOR UPDATE"
        ))
        .bind(attempt_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(attempt) = attempt else {
            return Ok(CompletionOutcome::AttemptMissing);
        };
        if attempt.is_completed() {
            tx.rollback().await?;
            return Ok(CompletionOutcome::AlreadyCompleted);
        }

        let final_score = score(attempt.total_questions, attempt.correct_answers);

        let updated = sqlx::query_as::<_, Attempt>(&format!(
            "UPDATE quiz_attempts SET score = $2, completed_at = $3
             WHERE id = $1
             RETURNING {ATTEMPT_COLUMNS}"
        ))
        .bind(attempt_id)
        .bind(final_score)
        .bind(completed_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(CompletionOutcome::Completed(updated))
    }

    async fn answered_questions(
        &self,
        attempt_id: i64,
    ) -> Result<Vec<AnsweredQuestion>, StoreError> {
        let rows = sqlx::query_as::<_, AnsweredQuestion>(
            r#"
            SELECT
                a.question_id,
                q.question,
                a.selected_answer,
                a.is_correct,
                q.correct_answer,
                q.options,
                q.explanation
            FROM quiz_answers a
            JOIN quiz_questions q ON q.id = a.question_id
            WHERE a.attempt_id = $1
            ORDER BY a.id
            "#,
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

/// Inserts one quiz and its questions on an open connection or transaction.
async fn insert_quiz_in(conn: &mut PgConnection, new_quiz: &NewQuiz) -> Result<Quiz, StoreError> {
    let mut quiz = sqlx::query_as::<_, Quiz>(&format!(
        "INSERT INTO quizzes (title, description, level, sort_order, is_active)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {QUIZ_COLUMNS}"
    ))
    .bind(&new_quiz.title)
    .bind(&new_quiz.description)
    .bind(new_quiz.level)
    .bind(new_quiz.sort_order)
    .bind(new_quiz.is_active)
    .fetch_one(&mut *conn)
    .await?;

    for q in &new_quiz.questions {
        let question = sqlx::query_as::<_, Question>(&format!(
            "INSERT INTO quiz_questions
                (quiz_id, question, options, correct_answer, explanation, sort_order)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {QUESTION_COLUMNS}"
        ))
        .bind(quiz.id)
        .bind(&q.question)
        .bind(&q.options)
        .bind(q.correct_answer)
        .bind(&q.explanation)
        .bind(q.sort_order)
        .fetch_one(&mut *conn)
        .await?;
        quiz.questions.push(question);
    }

    quiz.questions.sort_by_key(|q| (q.sort_order, q.id));
    Ok(quiz)
}
