//! One-shot cart operations through the synchronizer.
//!
//! Each invocation hydrates (remote when `CART_ACCESS_TOKEN` is set and
//! accepted, guest otherwise), runs one operation, and prints the
//! resulting view as JSON.
//!
//! # Environment Variables
//!
//! - `CART_API_BASE_URL` - Base URL of the storefront
//! - `CART_ACCESS_TOKEN` - Bearer token (optional)
//! - `CART_GUEST_DIR` - Guest cart directory (default: `.cartsync`)

use std::sync::Arc;

use thiserror::Error;

use cartsync_client::{
    CartSynchronizer, CartView, ClientBuildError, ClientConfig, ConfigError, FileGuestStorage,
    HttpCartClient, Mode, Session, SyncError,
};
use cartsync_core::wire::{KeyRequest, LineRequest};

/// Errors that can occur while running a cart operation.
#[derive(Debug, Error)]
pub enum CartCommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] ClientBuildError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Failed to render cart: {0}")]
    Render(#[from] serde_json::Error),
}

/// A variant selected on the command line.
#[derive(Debug, Clone)]
pub struct Variant {
    pub product: String,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl Variant {
    fn line(self, quantity: i64) -> LineRequest {
        LineRequest {
            product_id: self.product,
            size_id: self.size,
            color_id: self.color,
            quantity,
        }
    }

    fn key(self) -> KeyRequest {
        KeyRequest {
            product_id: self.product,
            size_id: self.size,
            color_id: self.color,
        }
    }
}

/// Cart operation to run.
#[derive(Debug, Clone)]
pub enum Operation {
    Show,
    Add(Variant, i64),
    Update(Variant, i64),
    Remove(Variant),
    Clear,
}

/// Run `operation` and return the resulting view rendered as JSON.
pub async fn run(operation: Operation) -> Result<String, CartCommandError> {
    let config = ClientConfig::from_env()?;
    let signed_in = config.access_token.is_some();

    let session = Arc::new(Session::new(config.access_token.clone()));
    let remote = HttpCartClient::new(&config, session)?;
    let storage = FileGuestStorage::new(&config.guest_dir);
    let sync = CartSynchronizer::new(remote, storage).await;

    if signed_in && sync.start_session().await == Mode::Guest {
        tracing::warn!("Remote cart unavailable, using guest cart");
    }

    let view: CartView = match operation {
        Operation::Show => sync.view(),
        Operation::Add(variant, quantity) => sync.add(&variant.line(quantity)).await?,
        Operation::Update(variant, quantity) => {
            sync.update_quantity(&variant.line(quantity)).await?
        }
        Operation::Remove(variant) => sync.remove(&variant.key()).await?,
        Operation::Clear => sync.clear().await?,
    };

    Ok(serde_json::to_string_pretty(&view)?)
}
