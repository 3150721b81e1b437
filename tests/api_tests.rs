// tests/api_tests.rs

use std::sync::Arc;

use quiz_engine::{
    config::Config,
    models::quiz::{NewQuestion, NewQuiz, Quiz},
    routes,
    services::QuizEngine,
    state::AppState,
    store::{CatalogWriter, MemoryStore},
    utils::jwt::sign_jwt,
};
use serde_json::{Value, json};

const SECRET: &str = "test_secret_for_integration_tests";

struct TestApp {
    address: String,
    store: Arc<MemoryStore>,
    client: reqwest::Client,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    async fn token_for_new_user(&self, username: &str) -> String {
        let user = self.store.add_user(username, "user").await;
        sign_jwt(user.id, &user.role, SECRET, 600).unwrap()
    }

    async fn seed_quiz(&self, title: &str, level: i32, answers: &[i32]) -> Quiz {
        let quiz = NewQuiz {
            title: title.to_string(),
            description: Some(format!("{title} description")),
            level,
            sort_order: 0,
            is_active: true,
            questions: answers
                .iter()
                .enumerate()
                .map(|(i, &correct_answer)| NewQuestion {
                    question: format!("{title} question {i}"),
                    options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                    correct_answer,
                    explanation: Some(format!("Because {i}")),
                    sort_order: i as i32,
                })
                .collect(),
        };
        self.store.insert_quiz(&quiz).await.unwrap()
    }
}

/// Helper function to spawn the app on a random port for testing.
async fn spawn_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let engine = QuizEngine::new(store.clone(), store.clone());

    let config = Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: SECRET.to_string(),
        rust_log: "error".to_string(),
        bind_addr: ([127, 0, 0, 1], 0).into(),
        db_max_connections: 1,
        log_dir: "logs".to_string(),
        seed_file: "data/quizzes.json".to_string(),
        cors_origins: vec!["http://localhost:3000".to_string()],
    };

    let state = AppState { engine, config };
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        store,
        client: reqwest::Client::new(),
    }
}

#[tokio::test]
async fn requests_without_token_are_unauthorized() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/api/quiz?level=1"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn unknown_role_is_forbidden() {
    let app = spawn_app().await;
    let user = app.store.add_user("guest", "guest").await;
    let token = sign_jwt(user.id, "guest", SECRET, 600).unwrap();

    let response = app
        .client
        .get(app.url("/api/quiz?level=1"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn list_quizzes_validates_level() {
    let app = spawn_app().await;
    let token = app.token_for_new_user("reader").await;

    for query in ["level=4", "level=0", "", "level=1&limit=500", "level=abc"] {
        let response = app
            .client
            .get(app.url(&format!("/api/quiz?{query}")))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400, "query `{query}`");
    }
}

#[tokio::test]
async fn list_and_get_quizzes_hide_correct_answers() {
    let app = spawn_app().await;
    let token = app.token_for_new_user("reader").await;
    let quiz = app.seed_quiz("Psalms", 2, &[0, 1]).await;
    app.seed_quiz("Proverbs", 3, &[2]).await;

    let listed: Vec<Value> = app
        .client
        .get(app.url("/api/quiz?level=2&page=1&limit=5"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["title"], "Psalms");
    assert_eq!(listed[0]["questions"].as_array().unwrap().len(), 2);
    assert!(listed[0]["questions"][0].get("correct_answer").is_none());
    assert_eq!(listed[0]["questions"][0]["options"][3], "D");

    let response = app
        .client
        .get(app.url(&format!("/api/quiz/{}", quiz.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let fetched: Value = response.json().await.unwrap();
    assert_eq!(fetched["id"], quiz.id);

    let missing = app
        .client
        .get(app.url("/api/quiz/999999"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}

#[tokio::test]
async fn full_attempt_flow() {
    let app = spawn_app().await;
    let token = app.token_for_new_user("player").await;
    let quiz = app.seed_quiz("Gospels", 1, &[2, 0, 3]).await;

    // 1. Start
    let response = app
        .client
        .post(app.url("/api/quiz/attempt/start"))
        .bearer_auth(&token)
        .json(&json!({ "quizId": quiz.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let started: Value = response.json().await.unwrap();
    assert_eq!(started["totalQuestions"], 3);
    assert_eq!(started["title"], "Gospels");
    let attempt_id = started["attemptId"].as_i64().unwrap();

    // 2. Answer: two correct, one wrong
    let picks = [2, 1, 3];
    for (question, pick) in quiz.questions.iter().zip(picks) {
        let response = app
            .client
            .post(app.url("/api/quiz/attempt/answer"))
            .bearer_auth(&token)
            .json(&json!({
                "attemptId": attempt_id,
                "questionId": question.id,
                "selectedAnswer": pick
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 201);
        let feedback: Value = response.json().await.unwrap();
        assert_eq!(feedback["isCorrect"], pick == question.correct_answer);
        assert_eq!(feedback["correctAnswer"], question.correct_answer);
    }

    // 3. Complete
    let response = app
        .client
        .post(app.url(&format!("/api/quiz/attempt/{attempt_id}/complete")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let result: Value = response.json().await.unwrap();
    assert_eq!(result["totalQuestions"], 3);
    assert_eq!(result["correctAnswers"], 2);
    assert!((result["score"].as_f64().unwrap() - 66.67).abs() < 0.01);
    assert!(result["completedAt"].is_string());
    assert_eq!(result["status"], "completed");
    let answers = result["answers"].as_array().unwrap();
    assert_eq!(answers.len(), 3);
    assert_eq!(answers[1]["isCorrect"], false);
    assert_eq!(answers[1]["options"], json!(["A", "B", "C", "D"]));
    assert_eq!(answers[1]["explanation"], "Because 1");

    // 4. Completing again is rejected; the stored result is unchanged
    let again = app
        .client
        .post(app.url(&format!("/api/quiz/attempt/{attempt_id}/complete")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(again.status().as_u16(), 409);

    let stored: Value = app
        .client
        .get(app.url(&format!("/api/quiz/attempt/{attempt_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stored["score"], result["score"]);
    assert_eq!(stored["completedAt"], result["completedAt"]);
}

#[tokio::test]
async fn other_users_get_not_found() {
    let app = spawn_app().await;
    let owner = app.token_for_new_user("owner").await;
    let intruder = app.token_for_new_user("intruder").await;
    let quiz = app.seed_quiz("Acts", 3, &[1]).await;

    let started: Value = app
        .client
        .post(app.url("/api/quiz/attempt/start"))
        .bearer_auth(&owner)
        .json(&json!({ "quizId": quiz.id }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let attempt_id = started["attemptId"].as_i64().unwrap();

    let foreign = app
        .client
        .get(app.url(&format!("/api/quiz/attempt/{attempt_id}")))
        .bearer_auth(&intruder)
        .send()
        .await
        .unwrap();
    assert_eq!(foreign.status().as_u16(), 404);
    let foreign_body: Value = foreign.json().await.unwrap();

    let absent = app
        .client
        .get(app.url("/api/quiz/attempt/987654"))
        .bearer_auth(&intruder)
        .send()
        .await
        .unwrap();
    assert_eq!(absent.status().as_u16(), 404);
    let absent_body: Value = absent.json().await.unwrap();

    assert_eq!(foreign_body, absent_body);

    let answer = app
        .client
        .post(app.url("/api/quiz/attempt/answer"))
        .bearer_auth(&intruder)
        .json(&json!({
            "attemptId": attempt_id,
            "questionId": quiz.questions[0].id,
            "selectedAnswer": 1
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(answer.status().as_u16(), 404);

    let complete = app
        .client
        .post(app.url(&format!("/api/quiz/attempt/{attempt_id}/complete")))
        .bearer_auth(&intruder)
        .send()
        .await
        .unwrap();
    assert_eq!(complete.status().as_u16(), 404);
}

#[tokio::test]
async fn malformed_answer_bodies_are_bad_requests() {
    let app = spawn_app().await;
    let token = app.token_for_new_user("sloppy").await;

    let bodies = [
        json!({ "questionId": 1, "selectedAnswer": 0 }),
        json!({ "attemptId": 1, "questionId": 1, "selectedAnswer": -1 }),
        json!({ "attemptId": "one", "questionId": 1, "selectedAnswer": 0 }),
    ];
    for body in bodies {
        let response = app
            .client
            .post(app.url("/api/quiz/attempt/answer"))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400, "body {body}");
        let error: Value = response.json().await.unwrap();
        assert!(error["error"].is_string());
    }
}

#[tokio::test]
async fn duplicate_answer_conflicts() {
    let app = spawn_app().await;
    let token = app.token_for_new_user("eager").await;
    let quiz = app.seed_quiz("Ruth", 1, &[0, 0]).await;

    let started: Value = app
        .client
        .post(app.url("/api/quiz/attempt/start"))
        .bearer_auth(&token)
        .json(&json!({ "quizId": quiz.id }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let body = json!({
        "attemptId": started["attemptId"],
        "questionId": quiz.questions[0].id,
        "selectedAnswer": 0
    });
    let statuses = [201, 409];
    for expected in statuses {
        let response = app
            .client
            .post(app.url("/api/quiz/attempt/answer"))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), expected);
    }
}

#[tokio::test]
async fn start_unknown_quiz_is_not_found() {
    let app = spawn_app().await;
    let token = app.token_for_new_user("lost").await;

    let response = app
        .client
        .post(app.url("/api/quiz/attempt/start"))
        .bearer_auth(&token)
        .json(&json!({ "quizId": 31337 }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn start_without_quiz_id_is_bad_request() {
    let app = spawn_app().await;
    let token = app.token_for_new_user("forgetful").await;

    for body in [json!({}), json!({ "quizId": 0 }), json!({ "quizId": "first" })] {
        let response = app
            .client
            .post(app.url("/api/quiz/attempt/start"))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400, "body {body}");
        let error: Value = response.json().await.unwrap();
        assert!(error["error"].is_string());
    }
}

#[tokio::test]
async fn completed_attempt_rejects_further_transitions() {
    let app = spawn_app().await;
    let token = app.token_for_new_user("finisher").await;
    let quiz = app.seed_quiz("Judges", 2, &[1, 2]).await;

    let started: Value = app
        .client
        .post(app.url("/api/quiz/attempt/start"))
        .bearer_auth(&token)
        .json(&json!({ "quizId": quiz.id }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let attempt_id = started["attemptId"].as_i64().unwrap();
    let complete_url = app.url(&format!("/api/quiz/attempt/{attempt_id}/complete"));

    let first = app
        .client
        .post(&complete_url)
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 200);
    let first: Value = first.json().await.unwrap();
    assert_eq!(first["score"], 0.0);

    let second = app
        .client
        .post(&complete_url)
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status().as_u16(), 409);
    let error: Value = second.json().await.unwrap();
    assert_eq!(error["error"], "Quiz attempt is already completed");

    let late_answer = app
        .client
        .post(app.url("/api/quiz/attempt/answer"))
        .bearer_auth(&token)
        .json(&json!({
            "attemptId": attempt_id,
            "questionId": quiz.questions[0].id,
            "selectedAnswer": 1
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(late_answer.status().as_u16(), 409);

    let stored: Value = app
        .client
        .get(app.url(&format!("/api/quiz/attempt/{attempt_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stored["correctAnswers"], 0);
    assert_eq!(stored["completedAt"], first["completedAt"]);
}
