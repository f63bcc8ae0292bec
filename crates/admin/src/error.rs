//! Unified error handling for admin.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use farmhouse_core::storage::StorageError;
use thiserror::Error;

use crate::editor::EditorError;

/// Application-level error type for the admin panel.
#[derive(Debug, Error)]
pub enum AppError {
    /// Catalog edit was rejected or the catalog file is unreadable.
    #[error("{0}")]
    Editor(#[from] EditorError),

    /// Site configuration could not be written.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),}

impl AppError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Editor(EditorError::NoSuchProduct { .. }) => StatusCode::NOT_FOUND,
            Self::Editor(EditorError::ImageTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Editor(EditorError::NotAnImage(_)) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Editor(EditorError::Io { .. } | EditorError::Serialize(_))
            | Self::Storage(_)
            | Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Editor(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        // Don't expose internal error details to clients
        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("missing confirm".to_string());
        assert_eq!(err.to_string(), "Bad request: missing confirm");

        let err = AppError::Editor(EditorError::NoSizes);
        assert_eq!(err.to_string(), "a product needs at least one size");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::Editor(EditorError::NoSuchProduct { index: 4, len: 2 })),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Editor(EditorError::InvalidSize("dozen".to_string()))),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(AppError::Editor(EditorError::ImageTooLarge { size: 3, max: 2 })),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            get_status(AppError::Editor(EditorError::NotAnImage("text/plain".to_string()))),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Storage(StorageError::Unavailable("disk".to_string()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
