//! The cart service as seen by the synchronizer.

use std::future::Future;

use cartsync_core::{CartLine, CartLines, ConcurrencyToken, VariantKey};

use crate::error::RemoteError;

/// A remote cart and the token needed to mutate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCart {
    pub lines: CartLines,
    pub token: ConcurrencyToken,
}

/// Operations offered by the cart service.
///
/// `update_quantity` and `remove` are token-gated; `upsert` and `merge` are
/// additive and carry no token.
pub trait CartRemote: Send + Sync {
    /// Fetch the current cart.
    fn read(&self) -> impl Future<Output = Result<RemoteCart, RemoteError>> + Send;

    /// Add `line.quantity` to the matching line, or insert it.
    fn upsert(&self, line: &CartLine) -> impl Future<Output = Result<RemoteCart, RemoteError>> + Send;

    /// Set the quantity of the line with `line`'s variant key.
    fn update_quantity(
        &self,
        line: &CartLine,
        token: ConcurrencyToken,
    ) -> impl Future<Output = Result<RemoteCart, RemoteError>> + Send;

    /// Remove the line with `key`; absent lines succeed.
    fn remove(
        &self,
        key: &VariantKey,
        token: ConcurrencyToken,
    ) -> impl Future<Output = Result<RemoteCart, RemoteError>> + Send;

    /// Fold guest lines into the cart with a single version bump.
    fn merge(&self, lines: &CartLines) -> impl Future<Output = Result<RemoteCart, RemoteError>> + Send;
}
