//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::CartBackend;
use crate::services::{CartStore, TokenSigner};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// cart store and the access-token verifier.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    carts: CartStore<CartBackend>,
    tokens: TokenSigner,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `backend` - Cart repository selected at start-up
    /// * `tokens` - Access-token verifier
    #[must_use]
    pub fn new(backend: CartBackend, tokens: TokenSigner) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                carts: CartStore::new(backend),
                tokens,
            }),
        }
    }

    /// Get a reference to the cart store.
    #[must_use]
    pub fn carts(&self) -> &CartStore<CartBackend> {
        &self.inner.carts
    }

    /// Get a reference to the access-token verifier.
    #[must_use]
    pub fn tokens(&self) -> &TokenSigner {
        &self.inner.tokens
    }
}
