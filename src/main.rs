use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cats_social::cli::{Cli, Commands};
use cats_social::config::AppConfig;
use cats_social::database::{DatabaseManager, MemoryStore, PgStore, Store};
use cats_social::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cats_social=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!("Starting Cats Social API in {:?} mode", config.environment);

    match cli.command() {
        Commands::Migrate => {
            let pool = DatabaseManager::connect(&config)
                .await
                .context("failed to connect to database")?;
            DatabaseManager::migrate(&pool).await.context("failed to apply migrations")?;
            DatabaseManager::close(pool).await;
        }
        Commands::Serve { memory } => {
            let store: Arc<dyn Store> = if memory {
                tracing::warn!("Using in-memory store; data is lost on exit");
                Arc::new(MemoryStore::new())
            } else {
                let pool = DatabaseManager::connect(&config)
                    .await
                    .context("failed to connect to database")?;
                if config.database.auto_migrate {
                    DatabaseManager::migrate(&pool).await.context("failed to apply migrations")?;
                }
                Arc::new(PgStore::new(pool))
            };

            server::serve(AppState::new(config, store)).await?;
        }
    }

    Ok(())
}
