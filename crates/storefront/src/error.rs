//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Every error renders as JSON:
//!
//! ```json
//! { "error": "insufficient_stock", "message": "insufficient stock for product 7", "id": 7 }
//! ```
//!
//! Server-side failures are captured to Sentry and logged; clients only see an
//! opaque message for them.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::FulfillmentError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Order fulfillment or order management failed.
    #[error(transparent)]
    Fulfillment(#[from] FulfillmentError),

    /// The request host does not name a store.
    #[error("Store context required")]
    StoreContextRequired,

    /// The request host names a store that is unknown or inactive.
    #[error("Store not found")]
    StoreNotFound,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but may not act on this resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The request conflicts with existing data.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
}

impl AppError {
    /// Whether the error is the server's fault rather than the client's.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Internal(_)
                | Self::Database(
                    RepositoryError::Database(_) | RepositoryError::DataCorruption(_)
                )
                | Self::Fulfillment(
                    FulfillmentError::Failed(_) | FulfillmentError::OrderNumberCollision(_)
                )
        )
    }

    /// HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Database(err) => match err {
                RepositoryError::NotFound => StatusCode::NOT_FOUND,
                RepositoryError::Conflict(_) => StatusCode::CONFLICT,
                RepositoryError::Invalid(_) => StatusCode::BAD_REQUEST,
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Fulfillment(err) => match err {
                FulfillmentError::StoreContextRequired
                | FulfillmentError::InvalidRequest(_)
                | FulfillmentError::InsufficientStock(_) => StatusCode::BAD_REQUEST,
                FulfillmentError::ProductNotFound(_) | FulfillmentError::OrderNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                FulfillmentError::Forbidden => StatusCode::FORBIDDEN,
                FulfillmentError::OrderNumberCollision(_) | FulfillmentError::Failed(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::StoreContextRequired | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::StoreNotFound | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error category.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Database(err) => match err {
                RepositoryError::NotFound => "not_found",
                RepositoryError::Conflict(_) => "conflict",
                RepositoryError::Invalid(_) => "invalid_request",
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                    "internal_error"
                }
            },
            Self::Fulfillment(err) => match err {
                FulfillmentError::StoreContextRequired => "store_context_required",
                FulfillmentError::InvalidRequest(_) => "invalid_request",
                FulfillmentError::ProductNotFound(_) => "product_not_found",
                FulfillmentError::InsufficientStock(_) => "insufficient_stock",
                FulfillmentError::OrderNotFound(_) => "order_not_found",
                FulfillmentError::Forbidden => "forbidden",
                FulfillmentError::OrderNumberCollision(_) | FulfillmentError::Failed(_) => {
                    "fulfillment_failed"
                }
            },
            Self::StoreContextRequired => "store_context_required",
            Self::StoreNotFound => "store_not_found",
            Self::NotFound(_) => "not_found",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::BadRequest(_) => "invalid_request",
            Self::Conflict(_) => "conflict",
            Self::RateLimited => "rate_limited",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Offending identifier, when the error is about one record.
    #[must_use]
    pub fn offending_id(&self) -> Option<i64> {
        match self {
            Self::Fulfillment(
                FulfillmentError::ProductNotFound(id) | FulfillmentError::InsufficientStock(id),
            ) => Some(id.as_i64()),
            Self::Fulfillment(FulfillmentError::OrderNotFound(id)) => Some(id.as_i64()),
            _ => None,
        }
    }

    /// Client-facing message. Server errors stay opaque.
    fn public_message(&self) -> String {
        if self.is_server_error() {
            return match self {
                Self::Fulfillment(_) => "Order could not be placed, please try again".to_string(),
                _ => "Internal server error".to_string(),
            };
        }
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(msg) | RepositoryError::Invalid(msg))
            | Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg)
            | Self::Conflict(msg) => msg.clone(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                source = ?std::error::Error::source(&self),
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = ErrorBody {
            error: self.category(),
            message: self.public_message(),
            id: self.offending_id(),
        };

        (self.status_code(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context after login.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context on logout.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Order placed", Some(&[("order_number", "ORD...")]));
/// ```
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::{OrderId, ProductId};

    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        let cases = [
            (AppError::StoreContextRequired, StatusCode::BAD_REQUEST),
            (AppError::StoreNotFound, StatusCode::NOT_FOUND),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (AppError::RateLimited, StatusCode::TOO_MANY_REQUESTS),
            (
                AppError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                FulfillmentError::InsufficientStock(ProductId::new(1)).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                FulfillmentError::ProductNotFound(ProductId::new(1)).into(),
                StatusCode::NOT_FOUND,
            ),
            (FulfillmentError::Forbidden.into(), StatusCode::FORBIDDEN),
            (
                RepositoryError::Conflict("taken".into()).into(),
                StatusCode::CONFLICT,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{err}");
        }
    }

    #[tokio::test]
    async fn test_body_names_category_and_id() {
        let (status, body) =
            body_json(FulfillmentError::InsufficientStock(ProductId::new(7)).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "insufficient_stock");
        assert_eq!(body["id"], 7);

        let (_, body) = body_json(FulfillmentError::OrderNotFound(OrderId::new(3)).into()).await;
        assert_eq!(body["error"], "order_not_found");
        assert_eq!(body["id"], 3);
    }

    #[tokio::test]
    async fn test_server_errors_are_opaque() {
        let err: AppError = RepositoryError::DataCorruption("bad phone 0123".into()).into();
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal_error");
        assert_eq!(body["message"], "Internal server error");
        assert!(body.get("id").is_none());
    }
}
