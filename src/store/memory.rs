// src/store/memory.rs

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{
    AnswerOutcome, AttemptStore, CatalogWriter, CompletionOutcome, QuizCatalog, ScoreFn,
    StoreError,
};
use crate::models::{
    attempt::{AnsweredQuestion, Answer, Attempt, NewAnswer},
    quiz::{NewQuestion, NewQuiz, Question, Quiz},
    user::User,
};

/// In-process store with the same atomicity as the Postgres adapter:
/// every operation runs under one lock.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    users: HashMap<i64, User>,
    quizzes: BTreeMap<i64, Quiz>,
    questions: BTreeMap<i64, Question>,
    attempts: HashMap<i64, Attempt>,
    answers: Vec<Answer>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn with_questions(&self, quiz: &Quiz) -> Quiz {
        let mut questions: Vec<Question> = self
            .questions
            .values()
            .filter(|q| q.quiz_id == quiz.id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| (q.sort_order, q.id));
        Quiz {
            questions,
            ..quiz.clone()
        }
    }

    fn push_quiz(&mut self, new_quiz: &NewQuiz) -> Quiz {
        let quiz = Quiz {
            id: self.next_id(),
            title: new_quiz.title.clone(),
            description: new_quiz.description.clone(),
            level: new_quiz.level,
            sort_order: new_quiz.sort_order,
            is_active: new_quiz.is_active,
            created_at: Some(Utc::now()),
            questions: Vec::new(),
        };
        self.quizzes.insert(quiz.id, quiz.clone());
        for q in &new_quiz.questions {
            self.push_question(quiz.id, q);
        }
        self.with_questions(&quiz)
    }

    fn push_question(&mut self, quiz_id: i64, q: &NewQuestion) -> Question {
        let question = Question {
            id: self.next_id(),
            quiz_id,
            question: q.question.clone(),
            options: q.options.clone(),
            correct_answer: q.correct_answer,
            explanation: q.explanation.clone(),
            sort_order: q.sort_order,
        };
        self.questions.insert(question.id, question.clone());
        question
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user, standing in for the external identity service.
    pub async fn add_user(&self, username: &str, role: &str) -> User {
        let mut inner = self.inner.lock().await;
        let user = User {
            id: inner.next_id(),
            username: username.to_string(),
            role: role.to_string(),
            created_at: Some(Utc::now()),
        };
        inner.users.insert(user.id, user.clone());
        user
    }

    /// Appends a question to an existing quiz. Returns `None` for an unknown quiz.
    pub async fn add_question(&self, quiz_id: i64, question: &NewQuestion) -> Option<Question> {
        let mut inner = self.inner.lock().await;
        if !inner.quizzes.contains_key(&quiz_id) {
            return None;
        }
        Some(inner.push_question(quiz_id, question))
    }
}

#[async_trait]
impl QuizCatalog for MemoryStore {
    async fn list_by_level(
        &self,
        level: i32,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Quiz>, StoreError> {
        let inner = self.inner.lock().await;
        let mut matching: Vec<&Quiz> = inner
            .quizzes
            .values()
            .filter(|q| q.level == level && q.is_active)
            .collect();
        matching.sort_by_key(|q| (q.sort_order, q.id));

        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(0);

        Ok(matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|q| inner.with_questions(q))
            .collect())
    }

    async fn find_quiz(&self, quiz_id: i64) -> Result<Option<Quiz>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.quizzes.get(&quiz_id).map(|q| inner.with_questions(q)))
    }

    async fn find_question(&self, question_id: i64) -> Result<Option<Question>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.questions.get(&question_id).cloned())
    }
}

#[async_trait]
impl CatalogWriter for MemoryStore {
    async fn count_quizzes(&self) -> Result<i64, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.quizzes.len() as i64)
    }

    async fn insert_quiz(&self, new_quiz: &NewQuiz) -> Result<Quiz, StoreError> {
        let mut inner = self.inner.lock().await;
        Ok(inner.push_quiz(new_quiz))
    }

    async fn insert_catalog(&self, quizzes: &[NewQuiz]) -> Result<Vec<Quiz>, StoreError> {
        let mut inner = self.inner.lock().await;
        Ok(quizzes.iter().map(|quiz| inner.push_quiz(quiz)).collect())
    }
}

#[async_trait]
impl AttemptStore for MemoryStore {
    async fn find_user(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.users.get(&user_id).cloned())
    }

    async fn create_attempt(
        &self,
        user_id: i64,
        quiz_id: i64,
        total_questions: i32,
    ) -> Result<Attempt, StoreError> {
        let mut inner = self.inner.lock().await;
        if !inner.users.contains_key(&user_id) {
            return Err(StoreError::Integrity(format!("user {user_id} does not exist")));
        }
        if !inner.quizzes.contains_key(&quiz_id) {
            return Err(StoreError::Integrity(format!("quiz {quiz_id} does not exist")));
        }

        let attempt = Attempt {
            id: inner.next_id(),
            user_id,
            quiz_id,
            total_questions,
            correct_answers: 0,
            score: None,
            completed_at: None,
            created_at: Some(Utc::now()),
        };
        inner.attempts.insert(attempt.id, attempt.clone());
        Ok(attempt)
    }

    async fn find_attempt(&self, attempt_id: i64) -> Result<Option<Attempt>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.attempts.get(&attempt_id).cloned())
    }

    async fn record_answer(&self, answer: NewAnswer) -> Result<AnswerOutcome, StoreError> {
        let mut inner = self.inner.lock().await;

        match inner.attempts.get(&answer.attempt_id) {
            None => return Ok(AnswerOutcome::AttemptMissing),
            Some(a) if a.is_completed() => return Ok(AnswerOutcome::AttemptClosed),
            Some(_) => {}
        }
        if !inner.questions.contains_key(&answer.question_id) {
            return Err(StoreError::Integrity(format!(
                "question {} does not exist",
                answer.question_id
            )));
        }
        let duplicate = inner
            .answers
            .iter()
            .any(|a| a.attempt_id == answer.attempt_id && a.question_id == answer.question_id);
        if duplicate {
            return Ok(AnswerOutcome::Duplicate);
        }

        let recorded = Answer {
            id: inner.next_id(),
            attempt_id: answer.attempt_id,
            question_id: answer.question_id,
            selected_answer: answer.selected_answer,
            is_correct: answer.is_correct,
            created_at: Some(Utc::now()),
        };
        inner.answers.push(recorded.clone());

        if recorded.is_correct {
            if let Some(attempt) = inner.attempts.get_mut(&answer.attempt_id) {
                attempt.correct_answers += 1;
            }
        }

        Ok(AnswerOutcome::Recorded(recorded))
    }

    async fn complete_attempt(
        &self,
        attempt_id: i64,
        score: ScoreFn,
        completed_at: DateTime<Utc>,
    ) -> Result<CompletionOutcome, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(attempt) = inner.attempts.get_mut(&attempt_id) else {
            return Ok(CompletionOutcome::AttemptMissing);
        };
        if attempt.is_completed() {
            return Ok(CompletionOutcome::AlreadyCompleted);
        }

        attempt.score = Some(score(attempt.total_questions, attempt.correct_answers));
        attempt.completed_at = Some(completed_at);

        Ok(CompletionOutcome::Completed(attempt.clone()))
    }

    async fn answered_questions(
        &self,
        attempt_id: i64,
    ) -> Result<Vec<AnsweredQuestion>, StoreError> {
        let inner = self.inner.lock().await;
        let rows = inner
            .answers
            .iter()
            .filter(|a| a.attempt_id == attempt_id)
            .filter_map(|a| {
                let q = inner.questions.get(&a.question_id)?;
                Some(AnsweredQuestion {
                    question_id: a.question_id,
                    question: q.question.clone(),
                    selected_answer: a.selected_answer,
                    is_correct: a.is_correct,
                    correct_answer: q.correct_answer,
                    options: q.options.clone(),
                    explanation: q.explanation.clone(),
                })
            })
            .collect();
        Ok(rows)
    }
}
