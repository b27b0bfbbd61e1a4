//! # Database Persistence Layer
//!
//! Postgres persistence via SQLx. The layer is **optional**: when
//! `DATABASE_URL` is set, documents, professions, and the audit trail
//! are persisted; when absent, the service runs in-memory only
//! (suitable for development and testing).
//!
//! Writes are dual: handlers update the in-memory stores first (the
//! source of truth for reads) and write through to Postgres. On startup
//! with a pool, [`documents::load_all`] and [`professions::load_all`]
//! rehydrate the stores.

pub mod audit;
pub mod documents;
pub mod professions;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set — running in-memory only mode. \
                 State will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}
