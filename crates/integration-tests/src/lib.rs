//! End-to-end test support for cartsync.
//!
//! [`TestServer`] serves the real storefront router, backed by the
//! in-memory cart repository, on an ephemeral local port. Tests drive it
//! over HTTP with `reqwest` directly or through the client synchronizer.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cartsync-integration-tests
//! ```

use std::net::SocketAddr;
use std::path::Path;

use chrono::{Duration, Utc};
use secrecy::SecretString;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

use cartsync_client::ClientConfig;
use cartsync_core::{Role, UserId};
use cartsync_storefront::db::{CartBackend, MemoryCartRepository};
use cartsync_storefront::services::{AccessClaims, TokenSigner};
use cartsync_storefront::state::AppState;

/// Signing secret shared by the test server and token helpers.
pub const TEST_TOKEN_SECRET: &str = "Zq8vN2kLp4Xw7Rt1Yb6Hc3Jm9Fd5Gs0Ae";

/// A storefront listening on `127.0.0.1` for the duration of a test.
pub struct TestServer {
    addr: SocketAddr,
    tokens: TokenSigner,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Bind an ephemeral port and serve the storefront router on it.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn spawn() -> Self {
        let tokens = TokenSigner::new(SecretString::from(TEST_TOKEN_SECRET));
        let state = AppState::new(
            CartBackend::Memory(MemoryCartRepository::new()),
            tokens.clone(),
        );
        let app = cartsync_storefront::app(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local address");

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            tokens,
            handle,
        }
    }

    /// Base URL of the server, with a trailing slash.
    ///
    /// # Panics
    ///
    /// Panics if the address does not form a URL.
    #[must_use]
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}/", self.addr)).expect("Invalid test server URL")
    }

    /// Absolute URL for `path` (relative, e.g. `cart/items`).
    ///
    /// # Panics
    ///
    /// Panics if `path` cannot be joined onto the base URL.
    #[must_use]
    pub fn url(&self, path: &str) -> Url {
        self.base_url().join(path).expect("Invalid test path")
    }

    /// Issue a token for `user` valid for one hour.
    #[must_use]
    pub fn token_for(&self, user: &str, role: Role) -> String {
        self.issue(user, role, Utc::now(), Duration::hours(1))
    }

    /// Issue a token for `user` that expired an hour ago.
    #[must_use]
    pub fn expired_token_for(&self, user: &str) -> String {
        self.issue(
            user,
            Role::Customer,
            Utc::now() - Duration::hours(2),
            Duration::hours(1),
        )
    }

    /// The signer the server verifies tokens with.
    #[must_use]
    pub const fn tokens(&self) -> &TokenSigner {
        &self.tokens
    }

    /// Client configuration pointing at this server.
    #[must_use]
    pub fn client_config(&self, guest_dir: &Path, access_token: Option<String>) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url(),
            guest_dir: guest_dir.to_path_buf(),
            request_timeout: std::time::Duration::from_secs(5),
            access_token: access_token.map(SecretString::from),
        }
    }

    fn issue(&self, user: &str, role: Role, now: chrono::DateTime<Utc>, ttl: Duration) -> String {
        let user_id = UserId::parse(user).expect("Invalid test user id");
        self.tokens
            .issue(&AccessClaims::new(user_id, role, now, ttl))
            .expect("Failed to issue test token")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
