//! Cartsync storefront library.
//!
//! Hosts the authoritative cart store behind an HTTP API. The router is
//! exposed through [`app`] so the binary, router tests, and the
//! integration-test crate all serve the same stack.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, body::Body, http::Request, middleware as axum_middleware};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the storefront router with tracing and request-id middleware.
///
/// Sentry layers are added by the binary so tests run without a client.
pub fn app(state: AppState) -> Router {
    routes::routes()
        .with_state(state)
        .layer(axum_middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                    user_id = tracing::field::Empty,
                )
            }),
        )
}
