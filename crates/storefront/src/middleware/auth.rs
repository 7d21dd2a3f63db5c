//! Authentication extractors.
//!
//! Verifies `Authorization: Bearer <token>` access tokens. A missing or
//! invalid token is a 401; a valid token for a role that may not shop is a
//! 403. Clients treat both as "fall back to guest", distinct from 412.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;
use tracing::Span;

use cartsync_core::UserId;

use crate::error::{AppError, set_sentry_user};
use crate::state::AppState;

/// Extractor that requires a customer access token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireCustomer(user_id): RequireCustomer,
/// ) -> impl IntoResponse {
///     format!("Cart of {user_id}")
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireCustomer(pub UserId);

impl FromRequestParts<AppState> for RequireCustomer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

        let claims = state.tokens().verify(token, Utc::now()).map_err(|e| {
            tracing::debug!(error = %e, "access token rejected");
            AppError::Unauthorized(e.to_string())
        })?;

        if !claims.role.can_shop() {
            tracing::debug!(user_id = %claims.sub, role = %claims.role, "role may not shop");
            return Err(AppError::Forbidden(format!("role {}", claims.role)));
        }

        Span::current().record("user_id", claims.sub.as_str());
        set_sentry_user(&claims.sub);

        Ok(Self(claims.sub))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
