//! `PostgreSQL` cart repository.
//!
//! Queries are runtime-checked (`sqlx::query_as`) so the crate builds
//! without a live database.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use cartsync_core::{CartLine, CartLines, CartVersion, UserId};

use super::{CartRepository, RepositoryError};
use crate::models::Cart;

/// Row shape of `storefront.cart`.
#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    user_id: UserId,
    items: Json<Vec<CartLine>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CartRow> for Cart {
    type Error = RepositoryError;

    fn try_from(row: CartRow) -> Result<Self, Self::Error> {
        if row.version < CartVersion::INITIAL.as_i64() {
            return Err(RepositoryError::DataCorruption(format!(
                "cart version {} below initial version",
                row.version
            )));
        }

        Ok(Self {
            user_id: row.user_id,
            // Stored documents are re-normalized on read
            lines: CartLines::sanitized(row.items.0),
            version: CartVersion::new(row.version),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for cart documents in `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgCartRepository {
    pool: PgPool,
}

impl PgCartRepository {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl CartRepository for PgCartRepository {
    async fn load_or_create(&self, user_id: &UserId) -> Result<Cart, RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.cart (user_id, items, version)
            VALUES ($1, '[]'::jsonb, $2)
            ON CONFLICT (user_id) DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(CartVersion::INITIAL.as_i64())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT user_id, items, version, created_at, updated_at
            FROM storefront.cart
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn compare_and_swap(
        &self,
        user_id: &UserId,
        expected: CartVersion,
        lines: &CartLines,
    ) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            UPDATE storefront.cart
            SET items = $3, version = version + 1, updated_at = NOW()
            WHERE user_id = $1 AND version = $2
            RETURNING user_id, items, version, created_at, updated_at
            ",
        )
        .bind(user_id)
        .bind(expected.as_i64())
        .bind(Json(lines))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Cart::try_from).transpose()
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
