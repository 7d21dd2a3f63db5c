//! In-process cart repository for development and tests.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use cartsync_core::{CartLines, CartVersion, UserId};

use super::{CartRepository, RepositoryError};
use crate::models::Cart;

/// Cart documents held in memory. Cloning shares the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryCartRepository {
    carts: Arc<RwLock<HashMap<UserId, Cart>>>,
}

impl MemoryCartRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartRepository for MemoryCartRepository {
    async fn load_or_create(&self, user_id: &UserId) -> Result<Cart, RepositoryError> {
        if let Some(cart) = self.carts.read().await.get(user_id) {
            return Ok(cart.clone());
        }

        let mut carts = self.carts.write().await;
        let cart = carts
            .entry(user_id.clone())
            .or_insert_with(|| Cart::empty(user_id.clone(), Utc::now()));
        Ok(cart.clone())
    }

    async fn compare_and_swap(
        &self,
        user_id: &UserId,
        expected: CartVersion,
        lines: &CartLines,
    ) -> Result<Option<Cart>, RepositoryError> {
        let mut carts = self.carts.write().await;
        let Some(cart) = carts.get_mut(user_id) else {
            return Ok(None);
        };
        if cart.version != expected {
            return Ok(None);
        }

        cart.lines = lines.clone();
        cart.version = expected.next();
        cart.updated_at = Utc::now();
        Ok(Some(cart.clone()))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_or_create_starts_at_initial_version() {
        let repo = MemoryCartRepository::new();
        let user = UserId::parse("u1").unwrap();

        let first = repo.load_or_create(&user).await.unwrap();
        assert_eq!(first.version, CartVersion::INITIAL);
        assert!(first.lines.is_empty());

        let again = repo.load_or_create(&user).await.unwrap();
        assert_eq!(again, first);
    }

    #[tokio::test]
    async fn test_compare_and_swap_accepts_only_one_writer_per_version() {
        let repo = MemoryCartRepository::new();
        let user = UserId::parse("u1").unwrap();
        let cart = repo.load_or_create(&user).await.unwrap();

        let won = repo
            .compare_and_swap(&user, cart.version, &CartLines::new())
            .await
            .unwrap();
        assert_eq!(won.unwrap().version, CartVersion::new(2));

        let lost = repo
            .compare_and_swap(&user, cart.version, &CartLines::new())
            .await
            .unwrap();
        assert!(lost.is_none());
    }

    #[tokio::test]
    async fn test_compare_and_swap_unknown_user() {
        let repo = MemoryCartRepository::new();
        let user = UserId::parse("nobody").unwrap();
        let result = repo
            .compare_and_swap(&user, CartVersion::INITIAL, &CartLines::new())
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
