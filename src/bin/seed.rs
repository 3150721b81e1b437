// src/bin/seed.rs

//! Seeds the quiz catalog. Safe to run on every deploy: it writes nothing
//! once any quiz exists.
//!
//! Usage: `seed [path/to/quizzes.json]` (defaults to `SEED_FILE`).

use dotenvy::dotenv;
use quiz_engine::config::Config;
use quiz_engine::services::seed::{SeedReport, ensure_seeded, load_catalog};
use quiz_engine::store::PgStore;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::new(&config.rust_log))
        .with(fmt::layer().with_target(false))
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.seed_file.clone());

    let pool = PgStore::connect(&config.database_url, config.db_max_connections).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let catalog = load_catalog(&path).await?;
    let store = PgStore::new(pool);

    match ensure_seeded(&store, &catalog).await? {
        SeedReport::Skipped { existing } => {
            tracing::info!("Nothing to do, {} quizzes already present.", existing)
        }
        SeedReport::Seeded { quizzes, questions } => {
            tracing::info!("Seeded {} quizzes ({} questions) from {}", quizzes, questions, path)
        }
    }

    Ok(())
}
