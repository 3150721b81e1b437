// src/services/seed.rs

//! Explicit catalog seeding, run by deployment tooling rather than at server start.

use std::path::Path;

use serde::Deserialize;
use validator::Validate;

use crate::{
    models::quiz::NewQuiz,
    store::{CatalogWriter, StoreError},
};

/// Seed file shape: `{ "quizzes": [ ... ] }`.
#[derive(Debug, Deserialize, Validate)]
pub struct SeedCatalog {
    #[validate(nested)]
    pub quizzes: Vec<NewQuiz>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SeedReport {
    /// The catalog already had quizzes; nothing was written.
    Skipped { existing: i64 },
    Seeded { quizzes: usize, questions: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse seed file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid seed data: {0}")]
    Invalid(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub async fn load_catalog(path: impl AsRef<Path>) -> Result<SeedCatalog, SeedError> {
    let raw = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&raw)?)
}

/// Writes the catalog only when no quiz exists yet. The whole catalog is
/// validated first and then written as a single batch.
pub async fn ensure_seeded(
    writer: &dyn CatalogWriter,
    catalog: &SeedCatalog,
) -> Result<SeedReport, SeedError> {
    let existing = writer.count_quizzes().await?;
    if existing > 0 {
        tracing::info!("Catalog already has {} quizzes, skipping seed.", existing);
        return Ok(SeedReport::Skipped { existing });
    }

    catalog.validate()?;

    if catalog.quizzes.is_empty() {
        tracing::warn!("Seed catalog has no quizzes. Skipping.");
        return Ok(SeedReport::Seeded {
            quizzes: 0,
            questions: 0,
        });
    }

    // One batch, so a failed run leaves the catalog empty and the next run retries.
    let created = writer.insert_catalog(&catalog.quizzes).await?;

    let mut questions = 0;
    for quiz in &created {
        questions += quiz.questions.len();
        tracing::debug!("Seeded quiz {} ({})", quiz.id, quiz.title);
    }

    tracing::info!(
        "Created {} quizzes with {} questions.",
        catalog.quizzes.len(),
        questions
    );

    Ok(SeedReport::Seeded {
        quizzes: catalog.quizzes.len(),
        questions,
    })
}
