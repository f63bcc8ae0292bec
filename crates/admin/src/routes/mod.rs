//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Health check
//!
//! # Auth (one shared password)
//! GET  /auth/login                  - Login page
//! POST /auth/login                  - Check password
//! POST /auth/logout                 - Logout
//!
//! # Catalog editor (session working copy)
//! GET  /                            - Editor: products, pricing, site settings
//! POST /products/new                - Append a placeholder product
//! POST /products/{index}            - Update a product
//! POST /products/{index}/delete     - Delete a product, requires confirm=true
//! POST /products/{index}/image      - Upload an image (multipart)
//! POST /dietary-pricing             - Update dietary surcharges
//! POST /reload                      - Discard the working copy
//! GET  /download                    - products-data.json attachment
//! GET  /export                      - Dated backup attachment
//!
//! # Site settings (shared with the storefront)
//! POST /settings/orders             - Pause or resume orders
//! POST /settings/sold-out           - Mark a product sold out or available
//! POST /settings/reset              - Restore defaults
//! ```

pub mod auth;
pub mod editor;
pub mod settings;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::editor::MAX_IMAGE_BYTES;
use crate::state::AppState;

/// Request body limit for image uploads. Above the image limit so
/// moderately oversized images get the editor's own message.
const UPLOAD_BODY_LIMIT: usize = 2 * MAX_IMAGE_BYTES;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create the settings routes router.
pub fn settings_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(settings::orders))
        .route("/sold-out", post(settings::sold_out))
        .route("/reset", post(settings::reset))
}

/// Create all routes for the admin panel.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(editor::index))
        .route("/products/new", post(editor::new_product))
        .route("/products/{index}", post(editor::update_product))
        .route("/products/{index}/delete", post(editor::delete_product))
        .route(
            "/products/{index}/image",
            post(editor::upload_image).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/dietary-pricing", post(editor::dietary_pricing))
        .route("/reload", post(editor::reload))
        .route("/download", get(editor::download))
        .route("/export", get(editor::export))
        .nest("/auth", auth_routes())
        .nest("/settings", settings_routes())
}
