//! Cartsync client library.
//!
//! The [`CartSynchronizer`] presents one cart regardless of whether the
//! shopper is signed in. Signed out, the cart lives in [`GuestStorage`];
//! signed in, it lives on the cart service and is reached through a
//! [`CartRemote`] such as [`HttpCartClient`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cartsync_client::{
//!     ClientConfig, CartSynchronizer, FileGuestStorage, HttpCartClient, Session,
//! };
//!
//! let config = ClientConfig::from_env()?;
//! let session = Arc::new(Session::new(config.access_token.clone()));
//! let remote = HttpCartClient::new(&config, session)?;
//! let storage = FileGuestStorage::new(&config.guest_dir);
//!
//! let sync = CartSynchronizer::new(remote, storage).await;
//! sync.start_session().await;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod http;
pub mod remote;
pub mod session;
pub mod storage;
pub mod sync;

pub use config::{ClientConfig, ConfigError};
pub use error::{RemoteError, SyncError};
pub use http::{ClientBuildError, HttpCartClient};
pub use remote::{CartRemote, RemoteCart};
pub use session::{RefreshError, Session, SingleFlight, TokenRefresher};
pub use storage::{FileGuestStorage, GUEST_CART_KEY, GuestStorage, MemoryGuestStorage, StorageError};
pub use sync::{CartSynchronizer, CartView, Mode, SyncState, TokenState};
