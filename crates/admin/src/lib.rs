//! Yellow Farmhouse Treats admin library.
//!
//! The catalog editor and the site settings, as a library so the router can
//! be tested. [`app`] builds the full router minus the Sentry layers, which
//! the binary adds.
//!
//! # Security
//!
//! The password gate is a convenience, not a trust boundary. The editor
//! never writes the live catalog; its output is a download a person uploads
//! by hand. The site settings it writes only pause orders and mark products
//! sold out. Run it on a private network.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod editor;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{
    Router,
    http::header,
    middleware::from_fn,
    response::IntoResponse,
    routing::get,
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::state::AppState;

const STYLESHEET: &str = include_str!("../static/admin.css");

/// Build the admin router.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .route("/static/admin.css", get(stylesheet))
        .merge(routes::routes())
        .layer(session_layer)
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

async fn stylesheet() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], STYLESHEET)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::Path;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use secrecy::SecretString;
    use tower::ServiceExt;

    use super::*;
    use crate::config::AdminConfig;

    fn test_app(dir: &Path) -> Router {
        let config = AdminConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3001,
            base_url: "http://localhost:3001".to_string(),
            password: SecretString::from("snickerdoodle42"),
            catalog_path: dir.join("products-data.json"),
            site_data_dir: dir.join("site"),
            sentry_dsn: None,
            sentry_environment: None,
            json_logs: false,
        };
        app(AppState::new(config).unwrap())
    }

    #[tokio::test]
    async fn test_health_and_stylesheet_are_public() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path());

        let resp = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .oneshot(Request::get("/static/admin.css").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/css; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn test_editor_redirects_to_login() {
        let dir = tempfile::tempdir().unwrap();
        let resp = test_app(dir.path())
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(resp.status().is_redirection());
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/auth/login");
        assert!(resp.headers().contains_key("content-security-policy"));
    }

    #[tokio::test]
    async fn test_login_sets_session_cookie() {
        let dir = tempfile::tempdir().unwrap();
        let resp = test_app(dir.path())
            .oneshot(
                Request::post("/auth/login")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("password=snickerdoodle42"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(resp.status().is_redirection());
        let cookie = resp.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with(middleware::SESSION_COOKIE_NAME));
    }
}
