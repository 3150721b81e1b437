// src/services/mod.rs

pub mod quiz_engine;
pub mod scoring;
pub mod seed;

pub use quiz_engine::{QuizEngine, QuizError};
