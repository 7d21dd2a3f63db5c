//! Cart persistence.
//!
//! # Database: `cartsync`
//!
//! ## Tables
//!
//! - `storefront.cart` - One JSONB cart document per user, versioned for
//!   optimistic concurrency
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p cartsync-cli -- migrate
//! ```
//!
//! # Repositories
//!
//! Both repositories expose the same two primitives through
//! [`CartRepository`]. Every write is a compare-and-swap on the stored
//! version, so no read-modify-write ever bypasses the version check.

pub mod carts;
pub mod memory;

use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use cartsync_core::{CartLines, CartVersion, UserId};

pub use carts::PgCartRepository;
pub use memory::MemoryCartRepository;

use crate::models::Cart;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Storage primitives the cart store is built on.
pub trait CartRepository: Send + Sync {
    /// Load the user's cart, creating an empty one at version 1 if none exists.
    fn load_or_create(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<Cart, RepositoryError>> + Send;

    /// Replace the cart's lines if its stored version is still `expected`.
    ///
    /// On success the stored version becomes `expected + 1` and the new cart
    /// is returned. Returns `Ok(None)` if another writer got there first.
    fn compare_and_swap(
        &self,
        user_id: &UserId,
        expected: CartVersion,
        lines: &CartLines,
    ) -> impl Future<Output = Result<Option<Cart>, RepositoryError>> + Send;

    /// Check that the backing storage is reachable.
    fn ping(&self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// The repository selected at start-up.
#[derive(Debug, Clone)]
pub enum CartBackend {
    /// `PostgreSQL` storage.
    Postgres(PgCartRepository),
    /// Process-local storage.
    Memory(MemoryCartRepository),
}

impl CartRepository for CartBackend {
    async fn load_or_create(&self, user_id: &UserId) -> Result<Cart, RepositoryError> {
        match self {
            Self::Postgres(repo) => repo.load_or_create(user_id).await,
            Self::Memory(repo) => repo.load_or_create(user_id).await,
        }
    }

    async fn compare_and_swap(
        &self,
        user_id: &UserId,
        expected: CartVersion,
        lines: &CartLines,
    ) -> Result<Option<Cart>, RepositoryError> {
        match self {
            Self::Postgres(repo) => repo.compare_and_swap(user_id, expected, lines).await,
            Self::Memory(repo) => repo.compare_and_swap(user_id, expected, lines).await,
        }
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        match self {
            Self::Postgres(repo) => repo.ping().await,
            Self::Memory(repo) => repo.ping().await,
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
