//! Password gate for the editor.
//!
//! This is not a trust boundary. Anyone who can reach the admin port and
//! guesses or reads the password can edit the working copy, and nothing the
//! editor does touches the live catalog: a download still has to be uploaded
//! by hand. The gate only keeps casual visitors out of the editor.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use tower_sessions::Session;

/// Session key marking a logged-in browser session.
pub const ADMIN_AUTH_KEY: &str = "admin_auth";

/// Compare a submitted password with the configured one in constant time.
#[must_use]
pub fn password_matches(submitted: &str, expected: &SecretString) -> bool {
    submitted
        .as_bytes()
        .ct_eq(expected.expose_secret().as_bytes())
        .into()
}

/// Mark the session as logged in.
///
/// The session ID is cycled first so a pre-login cookie cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn log_in(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(ADMIN_AUTH_KEY, true).await
}

/// Drop the session, including the working copy.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn log_out(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

/// Extractor that requires a logged-in session, redirecting to the login
/// page otherwise.
pub struct RequireAdminAuth;

/// Error returned when the session is not logged in.
pub enum AdminAuthRejection {
    RedirectToLogin,
    /// The route is not behind the session layer.
    MissingSession,
}

impl IntoResponse for AdminAuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::MissingSession => {
                tracing::error!("Admin route reached without a session layer");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

impl<S> FromRequestParts<S> for RequireAdminAuth
where
    S: Send + Sync,
{
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AdminAuthRejection::MissingSession)?;

        let logged_in = session
            .get::<bool>(ADMIN_AUTH_KEY)
            .await
            .ok()
            .flatten()
            .unwrap_or(false);

        if logged_in {
            Ok(Self)
        } else {
            Err(AdminAuthRejection::RedirectToLogin)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, http::Request, routing::get};
    use tower::ServiceExt;

    use super::*;

    async fn guarded(_auth: RequireAdminAuth) -> &'static str {
        "editor"
    }

    #[tokio::test]
    async fn test_route_without_session_layer_fails_closed() {
        let app = Router::new().route("/", get(guarded));
        let resp = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_password_matches() {
        let expected = SecretString::from("snickerdoodle42");
        assert!(password_matches("snickerdoodle42", &expected));
        assert!(!password_matches("snickerdoodle4", &expected));
        assert!(!password_matches("", &expected));
        assert!(!password_matches("Snickerdoodle42", &expected));
    }
}
