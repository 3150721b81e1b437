// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::quiz,
    state::AppState,
    utils::jwt::{auth_middleware, role_middleware},
};

/// Assembles the main application router.
///
/// * Every quiz route requires a bearer token and a quiz role.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let quiz_routes = Router::new()
        .route("/", get(quiz::list_quizzes))
        .route("/{id}", get(quiz::get_quiz))
        .route("/attempt/start", post(quiz::start_attempt))
        .route("/attempt/answer", post(quiz::submit_answer))
        .route("/attempt/{attempt_id}", get(quiz::get_attempt_result))
        .route("/attempt/{attempt_id}/complete", post(quiz::complete_attempt))
        // Auth first, then role check
        .layer(middleware::from_fn(role_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/quiz", quiz_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
