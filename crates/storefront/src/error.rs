//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error body is JSON: `{"error": "<message>"}`.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use cartsync_core::wire::ErrorResponse;
use cartsync_core::{CartError, ValidationError};

use crate::db::RepositoryError;
use crate::services::cart::StoreError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Storage operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Request failed validation.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Request body could not be read as JSON.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but may not use carts.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// No cart line matches the requested variant.
    #[error("Cart line not found")]
    LineNotFound,

    /// The presented concurrency token is stale.
    #[error("Cart was modified concurrently")]
    VersionConflict,

    /// A token-gated request arrived without `If-Match`.
    #[error("If-Match header required")]
    PreconditionRequired,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::Validation(e) => Self::Validation(e),
            CartError::VersionConflict => Self::VersionConflict,
            CartError::LineNotFound => Self::LineNotFound,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Cart(e) => e.into(),
            StoreError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::LineNotFound => StatusCode::NOT_FOUND,
            Self::VersionConflict => StatusCode::PRECONDITION_FAILED,
            Self::PreconditionRequired => StatusCode::PRECONDITION_REQUIRED,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Database(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Unauthorized(_) => "Authentication required".to_string(),
            Self::Forbidden(_) => "Not permitted to use a cart".to_string(),
            _ => self.to_string(),
        };

        (self.status(), Json(ErrorResponse { error: message })).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for cart actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
