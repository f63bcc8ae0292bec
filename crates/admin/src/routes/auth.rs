//! Authentication route handlers for admin.
//!
//! A single shared password; see [`crate::middleware::auth`] for why this is
//! not a trust boundary.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::{log_in, log_out, password_matches};
use crate::state::AppState;

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
}

/// Login form.
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub password: String,
}

/// Render the login page.
///
/// GET /auth/login
pub async fn login_page() -> LoginTemplate {
    LoginTemplate { error: None }
}

/// Check the password and start an editor session.
///
/// POST /auth/login
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    if !password_matches(&form.password, &state.config().password) {
        tracing::warn!("Admin login failed");
        let page = LoginTemplate {
            error: Some("Incorrect password.".to_string()),
        };
        return Ok((StatusCode::UNAUTHORIZED, page).into_response());
    }

    log_in(&session).await?;
    tracing::info!("Admin logged in");
    Ok(Redirect::to("/").into_response())
}

/// Logout and clear session.
///
/// POST /auth/logout
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<Redirect> {
    log_out(&session).await?;
    tracing::info!("Admin logged out");
    Ok(Redirect::to("/auth/login"))
}
