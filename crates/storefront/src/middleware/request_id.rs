//! Request ID middleware for request tracing and correlation.
//!
//! Every response carries `x-request-id`. An id supplied by the caller (a
//! proxy, or the cart client correlating its retries) is reused when it is
//! short printable ASCII; otherwise a UUID v4 is generated.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LENGTH: usize = 128;

/// Request ID of the current request, available as a request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Middleware that ensures every request has a request ID.
///
/// The id is recorded in the current span, tagged on the Sentry scope,
/// stored as a [`RequestId`] extension, and echoed in the response.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|id| is_acceptable(id))
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    Span::current().record("request_id", request_id.as_str());
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

fn is_acceptable(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_REQUEST_ID_LENGTH
        && id.bytes().all(|b| b.is_ascii_graphic())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, http::Request as HttpRequest, middleware, routing::get};
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn(request_id_middleware))
    }

    #[tokio::test]
    async fn test_generates_request_id() {
        let response = app()
            .oneshot(HttpRequest::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let id = response.headers().get(REQUEST_ID_HEADER).unwrap();
        assert!(Uuid::parse_str(id.to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_propagates_caller_request_id() {
        let response = app()
            .oneshot(
                HttpRequest::get("/")
                    .header(REQUEST_ID_HEADER, "cart-retry-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers().get(REQUEST_ID_HEADER).unwrap(),
            "cart-retry-42"
        );
    }

    #[test]
    fn test_rejects_oversized_ids() {
        assert!(is_acceptable("abc-123"));
        assert!(!is_acceptable(""));
        assert!(!is_acceptable(&"a".repeat(MAX_REQUEST_ID_LENGTH + 1)));
        assert!(!is_acceptable("has space"));
    }
}
