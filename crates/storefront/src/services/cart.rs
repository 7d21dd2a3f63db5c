//! Cart store: the authoritative cart operations.
//!
//! Token-gated operations (`update_quantity`, `remove_line`) check the
//! client's token against the loaded version and then write with a
//! compare-and-swap on that same version, so a concurrent writer always
//! surfaces as [`CartError::VersionConflict`].
//!
//! Additive operations (`upsert`, `merge`) commute, so a lost race is not the
//! caller's problem: they reload and re-run, up to
//! [`ADDITIVE_WRITE_ATTEMPTS`] times.

use thiserror::Error;
use tracing::instrument;

use cartsync_core::{
    CartError, CartLine, CartLines, ConcurrencyToken, Quantity, UserId, VariantKey,
};

use crate::db::{CartRepository, RepositoryError};
use crate::models::Cart;

/// Maximum attempts for an additive write that keeps losing races.
pub const ADDITIVE_WRITE_ATTEMPTS: usize = 5;

/// Errors returned by [`CartStore`] operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The operation was rejected by the cart rules.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// The storage layer failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Cart operations on top of a [`CartRepository`].
#[derive(Debug, Clone)]
pub struct CartStore<R> {
    repo: R,
}

impl<R: CartRepository> CartStore<R> {
    #[must_use]
    pub const fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Get a reference to the underlying repository.
    #[must_use]
    pub const fn repository(&self) -> &R {
        &self.repo
    }

    /// Return the user's cart, creating an empty one on first access.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if storage fails.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn read(&self, user_id: &UserId) -> Result<Cart, StoreError> {
        Ok(self.repo.load_or_create(user_id).await?)
    }

    /// Add a line's quantity to the matching line, or insert it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::VersionConflict` if every attempt lost a race, or
    /// `StoreError::Repository` if storage fails.
    #[instrument(skip_all, fields(user_id = %user_id, key = %line.key()))]
    pub async fn upsert(&self, user_id: &UserId, line: CartLine) -> Result<Cart, StoreError> {
        self.additive_write(user_id, |lines| lines.upsert(line.clone()))
            .await
    }

    /// Fold a batch of guest lines into the cart with a single version bump.
    ///
    /// Lines must already be validated; the batch is applied in one write or
    /// not at all.
    ///
    /// # Errors
    ///
    /// Same as [`Self::upsert`].
    #[instrument(skip_all, fields(user_id = %user_id, lines = lines.len()))]
    pub async fn merge(&self, user_id: &UserId, lines: Vec<CartLine>) -> Result<Cart, StoreError> {
        self.additive_write(user_id, |current| current.merge(lines.iter().cloned()))
            .await
    }

    /// Set the quantity of an existing line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::VersionConflict` if `token` is stale,
    /// `CartError::LineNotFound` if no line has `key`, or
    /// `StoreError::Repository` if storage fails.
    #[instrument(skip_all, fields(user_id = %user_id, key = %key))]
    pub async fn update_quantity(
        &self,
        user_id: &UserId,
        token: ConcurrencyToken,
        key: &VariantKey,
        quantity: Quantity,
    ) -> Result<Cart, StoreError> {
        self.gated_write(user_id, token, |lines| lines.set_quantity(key, quantity))
            .await
    }

    /// Remove a line. Removing an absent line succeeds and still bumps the
    /// version.
    ///
    /// # Errors
    ///
    /// Returns `CartError::VersionConflict` if `token` is stale, or
    /// `StoreError::Repository` if storage fails.
    #[instrument(skip_all, fields(user_id = %user_id, key = %key))]
    pub async fn remove_line(
        &self,
        user_id: &UserId,
        token: ConcurrencyToken,
        key: &VariantKey,
    ) -> Result<Cart, StoreError> {
        self.gated_write(user_id, token, |lines| {
            lines.remove(key);
            Ok(())
        })
        .await
    }

    async fn gated_write<F>(
        &self,
        user_id: &UserId,
        token: ConcurrencyToken,
        apply: F,
    ) -> Result<Cart, StoreError>
    where
        F: FnOnce(&mut CartLines) -> Result<(), CartError>,
    {
        let cart = self.repo.load_or_create(user_id).await?;
        if cart.version != token.version() {
            tracing::debug!(
                stored = %cart.version,
                presented = %token.version(),
                "stale concurrency token"
            );
            return Err(CartError::VersionConflict.into());
        }

        let mut lines = cart.lines;
        apply(&mut lines)?;

        let updated = self
            .repo
            .compare_and_swap(user_id, cart.version, &lines)
            .await?
            .ok_or(CartError::VersionConflict)?;
        tracing::debug!(version = %updated.version, "cart updated");
        Ok(updated)
    }

    async fn additive_write<F>(&self, user_id: &UserId, mut apply: F) -> Result<Cart, StoreError>
    where
        F: FnMut(&mut CartLines),
    {
        for attempt in 1..=ADDITIVE_WRITE_ATTEMPTS {
            let cart = self.repo.load_or_create(user_id).await?;
            let mut lines = cart.lines;
            apply(&mut lines);

            if let Some(updated) = self
                .repo
                .compare_and_swap(user_id, cart.version, &lines)
                .await?
            {
                tracing::debug!(version = %updated.version, attempt, "cart updated");
                return Ok(updated);
            }
            tracing::debug!(attempt, "lost write race, retrying");
        }

        tracing::warn!(
            attempts = ADDITIVE_WRITE_ATTEMPTS,
            "additive cart write kept conflicting"
        );
        Err(CartError::VersionConflict.into())
    }
}
