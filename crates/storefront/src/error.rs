//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. Route handlers return `Result<T, AppError>`;
//! visitor mistakes become 4xx responses carrying a readable message, server
//! faults become 5xx responses with the details kept out of the body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use farmhouse_core::cart::CartError;
use farmhouse_core::order::OrderError;
use farmhouse_core::shipping::ShippingError;
use thiserror::Error;

use crate::catalog::CatalogLoadError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Catalog could not be loaded and no fallback applies.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogLoadError),

    /// Cart input was rejected.
    #[error("{0}")]
    Cart(#[from] CartError),

    /// Shipping quote could not be produced.
    #[error("{0}")]
    Shipping(#[from] ShippingError),

    /// Order could not be placed.
    #[error("{0}")]
    Order(#[from] OrderError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Request conflicts with the shop's current state, e.g. a sold-out
    /// product.
    #[error("{0}")]
    Conflict(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Catalog(_) => StatusCode::BAD_GATEWAY,
            Self::Cart(_) | Self::Shipping(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Order(OrderError::OrdersPaused) | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Order(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show the visitor.
    ///
    /// Internal error details are never exposed to clients.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Session(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Catalog(_) => "The menu is unavailable right now. Please try again soon.".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Catalog(_) | Self::Session(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (self.status(), self.public_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
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
