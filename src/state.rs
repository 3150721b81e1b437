// src/state.rs

use crate::config::Config;
use crate::services::QuizEngine;
use axum::extract::FromRef;

#[derive(Clone)]
pub struct AppState {
    pub engine: QuizEngine,
    pub config: Config,
}

impl FromRef<AppState> for QuizEngine {
    fn from_ref(state: &AppState) -> Self {
        state.engine.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
