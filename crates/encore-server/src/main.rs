//! Encore auction server binary.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from the environment
//! 3. Select the ledger backend (`PostgreSQL` when `DATABASE_URL` is
//!    set, in-memory otherwise) and run migrations if needed
//! 4. Assemble the engine and serve until terminated

use std::sync::Arc;

use encore_db::{PgLedger, PostgresPool};
use encore_engine::MemoryCatalog;
use encore_ledger::Ledger;
use encore_server::{AppState, ServerConfig, start_server};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application entry point for the auction server.
///
/// # Errors
///
/// Returns an error if configuration, backend setup, or serving fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("encore-server starting");

    let config = ServerConfig::from_env()?;

    let state = match &config.database_url {
        Some(url) => {
            let pool = PostgresPool::connect_url(url).await?;
            pool.run_migrations().await?;
            info!("using PostgreSQL ledger backend");
            AppState::new(
                Arc::new(PgLedger::new(&pool)) as Arc<dyn Ledger>,
                Arc::new(MemoryCatalog::new()),
            )
        }
        None => {
            info!("DATABASE_URL not set, using in-memory ledger backend");
            AppState::in_memory()
        }
    };

    start_server(&config, state).await?;
    Ok(())
}
