use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::AppConfig;

/// Errors from the storage layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Map a unique-constraint failure to `UniqueViolation`, anything else to `Sqlx`.
    pub fn from_insert(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                DatabaseError::UniqueViolation(db.constraint().unwrap_or("unique").to_string())
            }
            other => DatabaseError::Sqlx(other),
        }
    }
}

/// Builds the PostgreSQL pool and applies migrations.
pub struct DatabaseManager;

impl DatabaseManager {
    pub async fn connect(config: &AppConfig) -> Result<PgPool, DatabaseError> {
        let url = config
            .database_url()
            .map_err(|_| DatabaseError::ConfigMissing("DATABASE_URL"))?;
        let shown = Self::validate_url(url)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .acquire_timeout(Duration::from_secs(config.database.connection_timeout))
            .connect(url)
            .await?;

        info!("Created database pool for: {}", shown);
        Ok(pool)
    }

    pub async fn migrate(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub async fn close(pool: PgPool) {
        pool.close().await;
        info!("Closed database pool");
    }

    /// Check the URL is a postgres URL and return it with the password masked,
    /// suitable for logs.
    fn validate_url(url: &str) -> Result<String, DatabaseError> {
        let mut parsed = url::Url::parse(url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        if !matches!(parsed.scheme(), "postgres" | "postgresql") {
            return Err(DatabaseError::InvalidDatabaseUrl);
        }
        if parsed.password().is_some() {
            parsed
                .set_password(Some("****"))
                .map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        }
        Ok(parsed.into())
    }
}
