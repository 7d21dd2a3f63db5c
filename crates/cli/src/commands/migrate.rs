//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! cartctl migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! Migrations live in `crates/storefront/migrations/` and are embedded at
//! compile time. The server never runs them on start-up.

use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;

use cartsync_storefront::config::{ConfigError, database_url_from_env};

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run storefront database migrations.
pub async fn storefront() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let database_url = database_url_from_env()?;

    tracing::info!("Connecting to storefront database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
