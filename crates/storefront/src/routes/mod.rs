//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health        - Liveness check
//! GET    /health/ready  - Readiness check (cart storage reachable)
//!
//! # Cart (requires customer bearer token)
//! GET    /cart          - Current cart + ETag
//! POST   /cart/items    - Add line (additive, no token)
//! PATCH  /cart/items    - Set quantity (If-Match required)
//! DELETE /cart/items    - Remove line (If-Match required)
//! POST   /cart/merge    - Merge guest lines (one version bump)
//! ```

pub mod cart;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::db::CartRepository;
use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route(
            "/items",
            post(cart::add).patch(cart::update).delete(cart::remove),
        )
        .route("/merge", post(cart::merge))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/cart", cart_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if cart storage is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.carts().repository().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "cart storage not reachable");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
