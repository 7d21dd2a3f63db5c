//! Cart route handlers.
//!
//! Every successful response is `{"items": [...]}` with the cart's
//! concurrency token in `ETag`. `PATCH` and `DELETE` require `If-Match`.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{ETAG, IF_MATCH},
    },
    response::{IntoResponse, Response},
};
use tracing::instrument;

use cartsync_core::ConcurrencyToken;
use cartsync_core::wire::{CartResponse, KeyRequest, LineRequest, MergeRequest};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireCustomer;
use crate::models::Cart;
use crate::state::AppState;

/// A cart document rendered for the wire.
#[derive(Debug)]
pub struct CartReply(pub Cart);

impl IntoResponse for CartReply {
    fn into_response(self) -> Response {
        let etag = self.0.token().to_header_value();
        let body = Json(CartResponse {
            items: self.0.lines,
        });

        match HeaderValue::from_str(&etag) {
            Ok(value) => (StatusCode::OK, [(ETAG, value)], body).into_response(),
            Err(_) => AppError::Internal(format!("unencodable etag {etag}")).into_response(),
        }
    }
}

/// Read the concurrency token a gated operation requires.
///
/// A missing header is 428. A header that is not a valid token can never
/// match a stored version, so it is reported as a conflict.
fn required_token(headers: &HeaderMap) -> Result<ConcurrencyToken> {
    let value = headers
        .get(IF_MATCH)
        .ok_or(AppError::PreconditionRequired)?;
    value
        .to_str()
        .ok()
        .and_then(ConcurrencyToken::parse)
        .ok_or(AppError::VersionConflict)
}

/// GET /cart - Current cart, created on first access.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn show(
    State(state): State<AppState>,
    RequireCustomer(user_id): RequireCustomer,
) -> Result<CartReply> {
    let cart = state.carts().read(&user_id).await?;
    Ok(CartReply(cart))
}

/// POST /cart/items - Add a line, summing into a matching variant.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn add(
    State(state): State<AppState>,
    RequireCustomer(user_id): RequireCustomer,
    payload: std::result::Result<Json<LineRequest>, JsonRejection>,
) -> Result<CartReply> {
    let Json(request) = payload?;
    let line = request.validate()?;
    let cart = state.carts().upsert(&user_id, line).await?;
    Ok(CartReply(cart))
}

/// PATCH /cart/items - Set the quantity of an existing line.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn update(
    State(state): State<AppState>,
    RequireCustomer(user_id): RequireCustomer,
    headers: HeaderMap,
    payload: std::result::Result<Json<LineRequest>, JsonRejection>,
) -> Result<CartReply> {
    let token = required_token(&headers)?;
    let Json(request) = payload?;
    let line = request.validate()?;
    let cart = state
        .carts()
        .update_quantity(&user_id, token, &line.key(), line.quantity)
        .await?;
    Ok(CartReply(cart))
}

/// DELETE /cart/items - Remove a line; absent lines succeed.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireCustomer(user_id): RequireCustomer,
    headers: HeaderMap,
    payload: std::result::Result<Json<KeyRequest>, JsonRejection>,
) -> Result<CartReply> {
    let token = required_token(&headers)?;
    let Json(request) = payload?;
    let key = request.validate()?;
    let cart = state.carts().remove_line(&user_id, token, &key).await?;
    Ok(CartReply(cart))
}

/// POST /cart/merge - Fold a guest cart in with one version bump.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn merge(
    State(state): State<AppState>,
    RequireCustomer(user_id): RequireCustomer,
    payload: std::result::Result<Json<MergeRequest>, JsonRejection>,
) -> Result<CartReply> {
    let Json(request) = payload?;
    let lines = request.validate()?;
    let count = lines.len().to_string();
    let cart = state.carts().merge(&user_id, lines).await?;

    add_breadcrumb(
        "cart",
        "Merged guest cart",
        Some(&[("lines", count.as_str())]),
    );
    Ok(CartReply(cart))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request, header::AUTHORIZATION},
    };
    use chrono::{Duration, Utc};
    use secrecy::SecretString;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use cartsync_core::{Role, UserId};

    use super::*;
    use crate::db::{CartBackend, MemoryCartRepository};
    use crate::services::{AccessClaims, TokenSigner};

    const SECRET: &str = "k7#Qm2!vX9@pL4$wR8^zT1&nB6*cF3yH";

    fn signer() -> TokenSigner {
        TokenSigner::new(SecretString::from(SECRET))
    }

    fn app() -> Router {
        let state = AppState::new(CartBackend::Memory(MemoryCartRepository::new()), signer());
        crate::app(state)
    }

    fn token(role: Role) -> String {
        let claims = AccessClaims::new(
            UserId::parse("u1").unwrap(),
            role,
            Utc::now(),
            Duration::minutes(5),
        );
        signer().issue(&claims).unwrap()
    }

    fn request(
        method: Method,
        uri: &str,
        if_match: Option<&str>,
        body: Option<Value>,
    ) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(AUTHORIZATION, format!("Bearer {}", token(Role::Customer)));
        if let Some(tag) = if_match {
            builder = builder.header("if-match", tag);
        }
        match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Option<String>, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let etag = response
            .headers()
            .get(ETAG)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, etag, body)
    }

    #[tokio::test]
    async fn test_get_creates_cart_at_version_one() {
        let app = app();
        let (status, etag, body) = send(&app, request(Method::GET, "/cart", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(etag.as_deref(), Some("\"1\""));
        assert_eq!(body, json!({"items": []}));
    }

    #[tokio::test]
    async fn test_add_clamps_quantity() {
        let app = app();
        let (status, etag, body) = send(
            &app,
            request(
                Method::POST,
                "/cart/items",
                None,
                Some(json!({"productId": "p1", "sizeId": "s1", "quantity": 25})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(etag.as_deref(), Some("\"2\""));
        assert_eq!(
            body,
            json!({"items": [{"productId": "p1", "sizeId": "s1", "colorId": null, "quantity": 20}]})
        );
    }

    #[tokio::test]
    async fn test_update_requires_if_match() {
        let app = app();
        let (status, _, body) = send(
            &app,
            request(
                Method::PATCH,
                "/cart/items",
                None,
                Some(json!({"productId": "p1", "quantity": 2})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::PRECONDITION_REQUIRED);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_update_with_stale_token_is_412() {
        let app = app();
        send(
            &app,
            request(
                Method::POST,
                "/cart/items",
                None,
                Some(json!({"productId": "p1", "quantity": 2})),
            ),
        )
        .await;

        let (status, _, _) = send(
            &app,
            request(
                Method::PATCH,
                "/cart/items",
                Some("\"1\""),
                Some(json!({"productId": "p1", "quantity": 7})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::PRECONDITION_FAILED);

        let (_, etag, body) = send(&app, request(Method::GET, "/cart", None, None)).await;
        assert_eq!(etag.as_deref(), Some("\"2\""));
        assert_eq!(body["items"][0]["quantity"], 2);
    }

    #[tokio::test]
    async fn test_update_with_current_token() {
        let app = app();
        let (_, etag, _) = send(
            &app,
            request(
                Method::POST,
                "/cart/items",
                None,
                Some(json!({"productId": "p1", "sizeId": "s1", "quantity": 2})),
            ),
        )
        .await;

        let (status, etag, body) = send(
            &app,
            request(
                Method::PATCH,
                "/cart/items",
                etag.as_deref(),
                Some(json!({"productId": "p1", "sizeId": "s1", "quantity": 7})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(etag.as_deref(), Some("\"3\""));
        assert_eq!(body["items"][0]["quantity"], 7);
    }

    #[tokio::test]
    async fn test_update_missing_line_is_404() {
        let app = app();
        let (status, _, _) = send(
            &app,
            request(
                Method::PATCH,
                "/cart/items",
                Some("\"1\""),
                Some(json!({"productId": "p9", "quantity": 1})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_garbage_if_match_never_matches() {
        let app = app();
        let (status, _, _) = send(
            &app,
            request(
                Method::DELETE,
                "/cart/items",
                Some("*"),
                Some(json!({"productId": "p1"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    }

    #[tokio::test]
    async fn test_delete_absent_line_succeeds_and_bumps_version() {
        let app = app();
        let (status, etag, body) = send(
            &app,
            request(
                Method::DELETE,
                "/cart/items",
                Some("\"1\""),
                Some(json!({"productId": "p1"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(etag.as_deref(), Some("\"2\""));
        assert_eq!(body, json!({"items": []}));
    }

    #[tokio::test]
    async fn test_merge_bumps_version_once() {
        let app = app();
        let (status, etag, body) = send(
            &app,
            request(
                Method::POST,
                "/cart/merge",
                None,
                Some(json!({"items": [
                    {"productId": "p1", "sizeId": "s1", "colorId": null, "quantity": 3},
                    {"productId": "p2", "quantity": 1},
                    {"productId": "p1", "sizeId": "s1", "quantity": 2}
                ]})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(etag.as_deref(), Some("\"2\""));
        assert_eq!(body["items"].as_array().unwrap().len(), 2);
        assert_eq!(body["items"][0]["quantity"], 5);
    }

    #[tokio::test]
    async fn test_merge_rejects_whole_batch_on_invalid_line() {
        let app = app();
        let (status, _, body) = send(
            &app,
            request(
                Method::POST,
                "/cart/merge",
                None,
                Some(json!({"items": [
                    {"productId": "p1", "quantity": 3},
                    {"productId": "p2", "quantity": 0}
                ]})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("quantity"));

        let (_, etag, body) = send(&app, request(Method::GET, "/cart", None, None)).await;
        assert_eq!(etag.as_deref(), Some("\"1\""));
        assert_eq!(body, json!({"items": []}));
    }

    #[tokio::test]
    async fn test_malformed_body_is_400_json() {
        let app = app();
        let req = Request::builder()
            .method(Method::POST)
            .uri("/cart/items")
            .header(AUTHORIZATION, format!("Bearer {}", token(Role::Customer)))
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_missing_token_is_401() {
        let app = app();
        let req = Request::get("/cart").body(Body::empty()).unwrap();
        let (status, _, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_admin_token_is_403() {
        let app = app();
        let req = Request::get("/cart")
            .header(AUTHORIZATION, format!("Bearer {}", token(Role::Admin)))
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_carts_are_scoped_per_user() {
        let app = app();
        send(
            &app,
            request(
                Method::POST,
                "/cart/items",
                None,
                Some(json!({"productId": "p1", "quantity": 1})),
            ),
        )
        .await;

        let other = signer()
            .issue(&AccessClaims::new(
                UserId::parse("u2").unwrap(),
                Role::Customer,
                Utc::now(),
                Duration::minutes(5),
            ))
            .unwrap();
        let req = Request::get("/cart")
            .header(AUTHORIZATION, format!("Bearer {other}"))
            .body(Body::empty())
            .unwrap();
        let (_, etag, body) = send(&app, req).await;
        assert_eq!(etag.as_deref(), Some("\"1\""));
        assert_eq!(body, json!({"items": []}));
    }
}
