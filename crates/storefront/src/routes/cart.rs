//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! The cart itself lives in the visitor's session (see [`SessionCart`]).
//! Every mutation answers with an `HX-Trigger: cart-updated` header so the
//! badge refreshes, and a failed save adds an `X-Storage-Warning` header on
//! top of the in-page warning.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderValue,
    response::{AppendHeaders, IntoResponse, Response},
};
use farmhouse_core::Price;
use farmhouse_core::cart::{
    LineItem, QuantityChange, StorageWarning, Totals, parse_quantity, totals,
};
use farmhouse_core::order::OrderError;
use farmhouse_core::undo::UndoAction;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::session_cart::SessionCart;
use crate::state::AppState;

/// Header telling HTMX listeners the cart changed.
pub const HX_TRIGGER: &str = "HX-Trigger";

/// Event the cart badge listens for.
pub const CART_UPDATED: &str = "cart-updated";

/// Events sent after an add; the cart panel reloads on `cart-item-added`.
const ITEM_ADDED: &str = "cart-updated, cart-item-added";

/// Header carrying a non-fatal storage warning.
pub const STORAGE_WARNING_HEADER: &str = "x-storage-warning";

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub index: usize,
    pub name: String,
    pub size: Option<String>,
    /// Dietary tags joined with commas, e.g. `GF, SF`.
    pub tags: String,
    pub quantity: u32,
    pub price: String,
    pub line_total: String,
}

/// Order totals formatted for templates.
#[derive(Clone)]
pub struct TotalsView {
    pub subtotal: String,
    pub shipping: String,
    pub total: String,
    pub deposit: String,
    pub balance: String,
}

impl From<&Totals> for TotalsView {
    fn from(totals: &Totals) -> Self {
        Self {
            subtotal: totals.subtotal.display(),
            shipping: totals.shipping.display(),
            total: totals.total.display(),
            deposit: totals.deposit.display(),
            balance: totals.balance.display(),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub item_count: u32,
    pub totals: TotalsView,
    /// Description of the action the undo button would revert.
    pub undo: Option<String>,
    pub notice: Option<String>,
    pub warning: Option<String>,
}

impl CartView {
    #[must_use]
    pub fn new(cart: &SessionCart) -> Self {
        Self::with_shipping(cart, Price::ZERO)
    }

    #[must_use]
    pub fn with_shipping(cart: &SessionCart, shipping: Price) -> Self {
        let items = cart
            .items()
            .iter()
            .enumerate()
            .map(|(index, item)| CartItemView::new(index, item))
            .collect();
        Self {
            items,
            item_count: cart.item_count(),
            totals: TotalsView::from(&totals(cart.items(), shipping)),
            undo: cart.pending_undo(),
            notice: None,
            warning: None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl CartItemView {
    fn new(index: usize, item: &LineItem) -> Self {
        Self {
            index,
            name: item.name.clone(),
            size: item.size.clone().filter(|s| !s.is_empty()),
            tags: item.dietary_tags().join(", "),
            quantity: item.quantity,
            price: item.price.display(),
            line_total: item.line_total().display(),
        }
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    #[serde(default)]
    pub size_index: usize,
    #[serde(default = "default_quantity")]
    pub quantity: String,
    /// Checkbox; present when ticked.
    pub gluten_free: Option<String>,
    /// Checkbox; present when ticked.
    pub sugar_free: Option<String>,
}

fn default_quantity() -> String {
    "1".to_string()
}

/// Update quantity form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub index: usize,
    pub delta: i64,
}

/// Remove line form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub index: usize,
}

/// Clear cart form data.
#[derive(Debug, Deserialize)]
pub struct ClearCartForm {
    #[serde(default)]
    pub confirm: String,
}

/// Cart panel fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Attach the HTMX trigger and any storage warning to `body`.
fn cart_updated(body: impl IntoResponse, events: &'static str, warnings: &[StorageWarning]) -> Response {
    let mut response = (AppendHeaders([(HX_TRIGGER, events)]), body).into_response();
    if let Some(warning) = warnings.first()
        && let Ok(value) = HeaderValue::from_str(&warning.message)
    {
        response.headers_mut().insert(STORAGE_WARNING_HEADER, value);
    }
    response
}

/// Save the cart and answer with the refreshed panel.
async fn render_panel(cart: SessionCart, session: &Session, notice: Option<String>) -> Result<Response> {
    let mut view = CartView::new(&cart);
    let warnings = cart.save(session).await?;
    view.notice = notice;
    view.warning = warnings.first().map(ToString::to_string);
    Ok(cart_updated(CartItemsTemplate { cart: view }, CART_UPDATED, &warnings))
}

/// Add an item to the cart (HTMX).
///
/// The price is looked up from the catalog; the dietary surcharge in effect
/// now is folded into the unit price. Returns the updated badge.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let site = state.site_config();
    if site.orders_paused() {
        return Err(OrderError::OrdersPaused.into());
    }

    let catalog = state.catalog().load_with_overlay(&site).await?;
    let product = catalog
        .find(&form.product_id)
        .ok_or_else(|| AppError::NotFound(format!("product {}", form.product_id)))?;
    if product.sold_out {
        return Err(AppError::Conflict(format!("{} is sold out", product.name)));
    }
    let size = product.sizes.get(form.size_index).ok_or_else(|| {
        AppError::BadRequest(format!("{} has no size #{}", product.name, form.size_index))
    })?;
    let quantity = parse_quantity(&form.quantity)?;

    let gluten_free = form.gluten_free.is_some() && product.dietary.gluten_free;
    let sugar_free = form.sugar_free.is_some() && product.dietary.sugar_free;
    let mut price = size.price;
    if gluten_free {
        price = price + catalog.dietary_pricing.gluten_free;
    }
    if sugar_free {
        price = price + catalog.dietary_pricing.sugar_free;
    }

    let item = LineItem::new(product.name.clone(), price, quantity)
        .with_size(size.name.clone())
        .with_dietary(gluten_free, sugar_free)
        .with_product_id(product.id.clone());

    let mut cart = SessionCart::load(&session).await?;
    let outcome = cart.store().add_item(item)?;
    let count = cart.item_count();
    let warnings = cart.save(&session).await?;

    tracing::info!(product = %product.id, ?outcome, count, "Added to cart");
    add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product.id.as_str())]));

    Ok(cart_updated(CartCountTemplate { count }, ITEM_ADDED, &warnings))
}

/// Change a line's quantity by a delta (HTMX).
///
/// Reaching zero removes the line, which can then be undone.
#[instrument(skip(session))]
pub async fn update(session: Session, Form(form): Form<UpdateCartForm>) -> Result<Response> {
    let mut cart = SessionCart::load(&session).await?;
    let change = cart.store().update_quantity(form.index, form.delta)?;
    if let QuantityChange::Removed(item) = change {
        cart.record(UndoAction::RemovedItem {
            index: form.index,
            item,
        });
    }
    render_panel(cart, &session, None).await
}

/// Remove a line (HTMX).
#[instrument(skip(session))]
pub async fn remove(session: Session, Form(form): Form<RemoveFromCartForm>) -> Result<Response> {
    let mut cart = SessionCart::load(&session).await?;
    let item = cart.store().remove_item(form.index)?;
    tracing::info!(item = %item.label(), "Removed from cart");
    cart.record(UndoAction::RemovedItem {
        index: form.index,
        item,
    });
    render_panel(cart, &session, None).await
}

/// Empty the cart (HTMX). Requires `confirm=true`.
#[instrument(skip(session))]
pub async fn clear(session: Session, Form(form): Form<ClearCartForm>) -> Result<Response> {
    if form.confirm != "true" {
        return Err(AppError::BadRequest(
            "clearing the cart must be confirmed".to_string(),
        ));
    }

    let mut cart = SessionCart::load(&session).await?;
    let items = cart.store().clear();
    if !items.is_empty() {
        tracing::info!(lines = items.len(), "Cart cleared");
        cart.record(UndoAction::ClearedCart { items });
    }
    render_panel(cart, &session, None).await
}

/// Undo the most recent remove or clear (HTMX).
#[instrument(skip(session))]
pub async fn undo(session: Session) -> Result<Response> {
    let mut cart = SessionCart::load(&session).await?;
    let notice = match cart.undo() {
        Some(action) => {
            tracing::info!(action = %action.describe(), "Undo");
            format!("Undid: {}", action.describe())
        }
        None => "Nothing to undo.".to_string(),
    };
    render_panel(cart, &session, Some(notice)).await
}

/// Get the cart panel (HTMX).
#[instrument(skip(session))]
pub async fn show(session: Session) -> Result<CartItemsTemplate> {
    let cart = SessionCart::load(&session).await?;
    Ok(CartItemsTemplate {
        cart: CartView::new(&cart),
    })
}

/// Get cart count badge (HTMX).
#[instrument(skip(session))]
pub async fn count(session: Session) -> Result<CartCountTemplate> {
    let cart = SessionCart::load(&session).await?;
    Ok(CartCountTemplate {
        count: cart.item_count(),
    })
}
