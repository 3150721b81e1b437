// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

use crate::config::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,

    /// Difficulty level, 1 (easy) to 3 (hard).
    pub level: i32,

    pub sort_order: i32,

    /// Inactive quizzes are hidden from level listings but can still be fetched by id.
    pub is_active: bool,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,

    /// Questions ordered by `sort_order`. Loaded separately from `quiz_questions`.
    #[sqlx(skip)]
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// Represents the 'quiz_questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,

    /// The prompt shown to the user.
    pub question: String,

    /// Ordered option labels. Stored as `TEXT[]`.
    pub options: Vec<String>,

    /// Zero-based index into `options`.
    pub correct_answer: i32,

    pub explanation: Option<String>,
    pub sort_order: i32,
}

impl Question {
    pub fn is_correct(&self, selected_answer: i32) -> bool {
        self.correct_answer == selected_answer
    }
}

/// DTO for sending a quiz to the client.
#[derive(Debug, Serialize)]
pub struct QuizResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub level: i32,
    pub questions: Vec<PublicQuestion>,
}

/// DTO for sending question to client (excludes the correct answer).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub question: String,
    pub options: Vec<String>,
    pub explanation: Option<String>,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            question: q.question,
            options: q.options,
            explanation: q.explanation,
        }
    }
}

impl From<Quiz> for QuizResponse {
    fn from(quiz: Quiz) -> Self {
        Self {
            id: quiz.id,
            title: quiz.title,
            description: quiz.description,
            level: quiz.level,
            questions: quiz.questions.into_iter().map(PublicQuestion::from).collect(),
        }
    }
}

/// Query parameters for listing quizzes of one level.
#[derive(Debug, Deserialize, Validate)]
pub struct ListQuizzesParams {
    #[validate(range(min = 1, max = 3, message = "Level must be between 1 and 3."))]
    pub level: i32,

    #[validate(range(min = 1, message = "Page must be at least 1."))]
    pub page: Option<i64>,

    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100."))]
    pub limit: Option<i64>,
}

impl ListQuizzesParams {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE)
    }
}

/// A quiz definition as read from a seed file.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewQuiz {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 3))]
    pub level: i32,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[validate(nested)]
    pub questions: Vec<NewQuestion>,
}

fn default_active() -> bool {
    true
}

/// A question definition as read from a seed file.
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = validate_correct_answer))]
pub struct NewQuestion {
    #[validate(length(min = 1, max = 1000))]
    pub question: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    pub correct_answer: i32,
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() < 2 {
        return Err(validator::ValidationError::new("at_least_two_options"));
    }
    for opt in options {
        if opt.is_empty() || opt.len() > 500 {
            return Err(validator::ValidationError::new("option_length"));
        }
    }
    Ok(())
}

fn validate_correct_answer(q: &NewQuestion) -> Result<(), validator::ValidationError> {
    let in_range = usize::try_from(q.correct_answer)
        .map(|idx| idx < q.options.len())
        .unwrap_or(false);
    if !in_range {
        return Err(validator::ValidationError::new("correct_answer_out_of_range"));
    }
    Ok(())
}
