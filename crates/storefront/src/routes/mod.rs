//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Menu, all products
//! GET  /menu/{category}        - Menu, one category
//! GET  /api/catalog            - Catalog JSON with sold-out state applied
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart panel
//! GET  /cart/count             - Cart count badge
//! POST /cart/add               - Add to cart (returns badge, triggers cart-updated)
//! POST /cart/update            - Change quantity by a delta (returns cart panel)
//! POST /cart/remove            - Remove a line (returns cart panel)
//! POST /cart/clear             - Empty the cart, requires confirm=true
//! POST /cart/undo              - Undo the last remove or clear
//!
//! # Order
//! GET  /order                  - Order page with summary and form
//! POST /order/shipping         - Shipping quote fragment
//! GET  /order/payment          - Payment instructions fragment
//! POST /order                  - Place the order
//! ```

pub mod api;
pub mod cart;
pub mod menu;
pub mod order;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/count", get(cart::count))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/undo", post(cart::undo))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(order::show).post(order::place))
        .route("/shipping", post(order::shipping))
        .route("/payment", get(order::payment))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(menu::index))
        .route("/menu/{category}", get(menu::category))
        .route("/api/catalog", get(api::catalog))
        .nest("/cart", cart_routes())
        .nest("/order", order_routes())
}
