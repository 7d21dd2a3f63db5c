//! HTTP client for the storefront cart API.

use std::sync::Arc;

use reqwest::{Client, Method, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use cartsync_core::wire::{
    CartResponse, ETAG_HEADER, ErrorResponse, IF_MATCH_HEADER, KeyRequest, LineRequest,
    MergeRequest,
};
use cartsync_core::{CartLine, CartLines, ConcurrencyToken, VariantKey};

use crate::config::ClientConfig;
use crate::error::RemoteError;
use crate::remote::{CartRemote, RemoteCart};
use crate::session::Session;

/// Errors constructing an [`HttpCartClient`].
#[derive(Debug, Error)]
pub enum ClientBuildError {
    #[error("invalid cart endpoint: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Cart API client.
///
/// Sends the session's bearer token with every request. A 401 triggers one
/// token refresh (shared with any concurrent refresh) and one resend.
#[derive(Clone)]
pub struct HttpCartClient {
    inner: Arc<Inner>,
}

struct Inner {
    client: Client,
    cart_url: Url,
    items_url: Url,
    merge_url: Url,
    session: Arc<Session>,
}

impl std::fmt::Debug for HttpCartClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCartClient")
            .field("cart_url", &self.inner.cart_url.as_str())
            .field("session", &self.inner.session)
            .finish_non_exhaustive()
    }
}

impl HttpCartClient {
    /// Create a client for the service at `config.base_url`.
    ///
    /// # Errors
    ///
    /// Returns `ClientBuildError` if the endpoints cannot be derived from the
    /// base URL or the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, session: Arc<Session>) -> Result<Self, ClientBuildError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                cart_url: config.base_url.join("cart")?,
                items_url: config.base_url.join("cart/items")?,
                merge_url: config.base_url.join("cart/merge")?,
                session,
            }),
        })
    }

    /// The session whose token this client sends.
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.inner.session
    }

    fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &Url,
        if_match: Option<ConcurrencyToken>,
        body: Option<&B>,
    ) -> reqwest::RequestBuilder {
        let mut request = self.inner.client.request(method, url.clone());
        if let Some(token) = self.inner.session.access_token() {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(if_match) = if_match {
            request = request.header(IF_MATCH_HEADER, if_match.to_header_value());
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request
    }

    async fn execute<B: Serialize + Sync + ?Sized>(
        &self,
        method: Method,
        url: &Url,
        if_match: Option<ConcurrencyToken>,
        body: Option<&B>,
    ) -> Result<RemoteCart, RemoteError> {
        let mut response = self
            .request(method.clone(), url, if_match, body)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            match self.inner.session.refresh().await {
                Ok(_) => {
                    debug!("retrying cart request with refreshed token");
                    response = self.request(method, url, if_match, body).send().await?;
                }
                Err(e) => debug!(error = %e, "no refreshed token available"),
            }
        }

        decode(response).await
    }
}

/// Turn a cart API response into a remote cart or a typed error.
async fn decode(response: Response) -> Result<RemoteCart, RemoteError> {
    let status = response.status();

    if status.is_success() {
        let token = response
            .headers()
            .get(ETAG_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(ConcurrencyToken::parse)
            .ok_or_else(|| RemoteError::InvalidResponse("missing or malformed ETag".to_string()))?;
        let body: CartResponse = response.json().await?;
        return Ok(RemoteCart {
            lines: CartLines::sanitized(body.items),
            token,
        });
    }

    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(_) => status.canonical_reason().unwrap_or_default().to_string(),
    };
    let err = error_for_status(status, message);
    if matches!(err, RemoteError::Server { .. }) {
        warn!(status = status.as_u16(), error = %err, "cart service error");
    }
    Err(err)
}

fn error_for_status(status: StatusCode, message: String) -> RemoteError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Unauthorized,
        StatusCode::PRECONDITION_FAILED => RemoteError::VersionConflict,
        StatusCode::NOT_FOUND => RemoteError::LineNotFound,
        StatusCode::BAD_REQUEST
        | StatusCode::UNPROCESSABLE_ENTITY
        | StatusCode::PRECONDITION_REQUIRED => RemoteError::Rejected(message),
        _ => RemoteError::Server {
            status: status.as_u16(),
            message,
        },
    }
}

impl CartRemote for HttpCartClient {
    #[instrument(skip_all)]
    async fn read(&self) -> Result<RemoteCart, RemoteError> {
        self.execute::<()>(Method::GET, &self.inner.cart_url, None, None)
            .await
    }

    #[instrument(skip_all, fields(product_id = %line.product_id))]
    async fn upsert(&self, line: &CartLine) -> Result<RemoteCart, RemoteError> {
        let body = LineRequest::from_line(line);
        self.execute(Method::POST, &self.inner.items_url, None, Some(&body))
            .await
    }

    #[instrument(skip_all, fields(product_id = %line.product_id, version = %token.version()))]
    async fn update_quantity(
        &self,
        line: &CartLine,
        token: ConcurrencyToken,
    ) -> Result<RemoteCart, RemoteError> {
        let body = LineRequest::from_line(line);
        self.execute(Method::PATCH, &self.inner.items_url, Some(token), Some(&body))
            .await
    }

    #[instrument(skip_all, fields(product_id = %key.product_id, version = %token.version()))]
    async fn remove(
        &self,
        key: &VariantKey,
        token: ConcurrencyToken,
    ) -> Result<RemoteCart, RemoteError> {
        let body = KeyRequest::from_key(key);
        self.execute(Method::DELETE, &self.inner.items_url, Some(token), Some(&body))
            .await
    }

    #[instrument(skip_all, fields(lines = lines.len()))]
    async fn merge(&self, lines: &CartLines) -> Result<RemoteCart, RemoteError> {
        let body = MergeRequest::from_lines(lines);
        self.execute(Method::POST, &self.inner.merge_url, None, Some(&body))
            .await
    }
}
