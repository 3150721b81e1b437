// src/models/attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'quiz_attempts' table in the database.
/// One user's run through a quiz, from start to completion.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,

    /// Question count captured when the attempt started. Never recomputed.
    pub total_questions: i32,

    /// Only grows, one step per correct answer.
    pub correct_answers: i32,

    /// Percentage score, set by completion.
    pub score: Option<f64>,

    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Attempt {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user_id == user_id
    }

    pub fn status(&self, answers_recorded: usize) -> AttemptStatus {
        if self.is_completed() {
            AttemptStatus::Completed
        } else if answers_recorded == 0 {
            AttemptStatus::Created
        } else {
            AttemptStatus::InProgress
        }
    }
}

/// Lifecycle of an attempt. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Created,
    InProgress,
    Completed,
}

/// Represents the 'quiz_answers' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Answer {
    pub id: i64,
    pub attempt_id: i64,
    pub question_id: i64,
    pub selected_answer: i32,

    /// Correctness decided at submission time.
    pub is_correct: bool,

    pub created_at: Option<DateTime<Utc>>,
}

/// An answer ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewAnswer {
    pub attempt_id: i64,
    pub question_id: i64,
    pub selected_answer: i32,
    pub is_correct: bool,
}

/// An answer joined with its question, for result assembly.
#[derive(Debug, Clone, FromRow)]
pub struct AnsweredQuestion {
    pub question_id: i64,
    pub question: String,
    pub selected_answer: i32,
    pub is_correct: bool,
    pub correct_answer: i32,
    pub options: Vec<String>,
    pub explanation: Option<String>,
}

/// DTO for starting an attempt.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartAttemptRequest {
    #[validate(range(min = 1, message = "quizId must be a positive id."))]
    pub quiz_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAttemptResponse {
    pub attempt_id: i64,
    pub quiz_id: i64,
    pub total_questions: i32,
    pub title: String,
}

/// DTO for answering one question of an attempt.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    #[validate(range(min = 1, message = "attemptId must be a positive id."))]
    pub attempt_id: i64,
    #[validate(range(min = 1, message = "questionId must be a positive id."))]
    pub question_id: i64,
    #[validate(range(min = 0, message = "selectedAnswer cannot be negative."))]
    pub selected_answer: i32,
}

/// Immediate per-question feedback.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerResponse {
    pub question_id: i64,
    pub is_correct: bool,
    pub correct_answer: i32,
    pub explanation: Option<String>,
}

/// Full result of an attempt, including every recorded answer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResult {
    pub id: i64,
    pub quiz_id: i64,
    pub user_id: i64,
    pub status: AttemptStatus,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub score: Option<f64>,
    pub completed_at: Option<DateTime<Utc>>,
    pub answers: Vec<AnswerResult>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    pub question_id: i64,
    pub question: String,
    pub selected_answer: i32,
    pub is_correct: bool,
    pub correct_answer: i32,
    pub options: Vec<String>,
    pub explanation: String,
}

impl From<AnsweredQuestion> for AnswerResult {
    fn from(a: AnsweredQuestion) -> Self {
        Self {
            question_id: a.question_id,
            question: a.question,
            selected_answer: a.selected_answer,
            is_correct: a.is_correct,
            correct_answer: a.correct_answer,
            options: a.options,
            explanation: a.explanation.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(completed: bool) -> Attempt {
        Attempt {
            id: 1,
            user_id: 10,
            quiz_id: 3,
            total_questions: 4,
            correct_answers: 0,
            score: None,
            completed_at: completed.then(Utc::now),
            created_at: None,
        }
    }

    #[test]
    fn status_follows_answers_and_completion() {
        assert_eq!(attempt(false).status(0), AttemptStatus::Created);
        assert_eq!(attempt(false).status(2), AttemptStatus::InProgress);
        assert_eq!(attempt(true).status(0), AttemptStatus::Completed);
    }

    #[test]
    fn submit_request_rejects_negative_selection() {
        let req = SubmitAnswerRequest {
            attempt_id: 1,
            question_id: 1,
            selected_answer: -1,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn submit_request_uses_camel_case() {
        let req: SubmitAnswerRequest =
            serde_json::from_str(r#"{"attemptId": 4, "questionId": 9, "selectedAnswer": 2}"#)
                .unwrap();
        assert_eq!(req.attempt_id, 4);
        assert_eq!(req.question_id, 9);
        assert_eq!(req.selected_answer, 2);
    }

    #[test]
    fn missing_explanation_renders_empty() {
        let answer = AnswerResult::from(AnsweredQuestion {
            question_id: 1,
            question: "Q".to_string(),
            selected_answer: 0,
            is_correct: true,
            correct_answer: 0,
            options: vec!["A".to_string(), "B".to_string()],
            explanation: None,
        });
        assert_eq!(answer.explanation, "");
    }
}
