//! Order page route handlers.
//!
//! The order page shows the cart summary and the order form. Shipping quotes
//! and payment instructions are HTMX fragments that update as the visitor
//! fills the form in. Placing an order validates everything at once and
//! either renders the confirmation or re-renders the form with each problem
//! next to its field.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use chrono::{Days, Local, NaiveDate};
use farmhouse_core::Price;
use farmhouse_core::catalog::Catalog;
use farmhouse_core::order::{
    Checkout, Fulfillment, OrderError, OrderForm, OrderFormErrors, PaymentDetails, PaymentMethod,
    PaymentPlan, PlacedOrder, payment_details,
};
use farmhouse_core::shipping::{CartWeight, ShippingQuote};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::routes::cart::{CartView, TotalsView};
use crate::session_cart::SessionCart;
use crate::state::AppState;

// =============================================================================
// View models
// =============================================================================

/// A payment method radio button.
#[derive(Clone)]
pub struct PaymentOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
    /// Only offered for pickup orders.
    pub pickup_only: bool,
}

fn payment_options(selected: &str) -> Vec<PaymentOption> {
    PaymentMethod::ALL
        .into_iter()
        .map(|m| PaymentOption {
            value: m.as_str(),
            label: m.display_name(),
            selected: m.as_str() == selected.trim(),
            pickup_only: m == PaymentMethod::Cash,
        })
        .collect()
}

/// Shipping quote display data.
#[derive(Clone)]
pub struct QuoteView {
    pub zip: String,
    pub state: &'static str,
    pub zone: String,
    pub base: String,
    pub surcharge: Option<String>,
    pub total: String,
    pub weight: String,
    pub weight_estimated: bool,
}

impl From<&ShippingQuote> for QuoteView {
    fn from(quote: &ShippingQuote) -> Self {
        Self {
            zip: quote.zip.clone(),
            state: quote.state,
            zone: quote.zone.to_string(),
            base: quote.base.display(),
            surcharge: quote.surcharge.is_positive().then(|| quote.surcharge.display()),
            total: quote.total.display(),
            weight: format!("{} lbs", quote.weight_lbs.round_dp(1).normalize()),
            weight_estimated: quote.weight_estimated,
        }
    }
}

/// Payment instructions display data.
#[derive(Clone)]
pub struct PaymentView {
    pub method: &'static str,
    pub plan: &'static str,
    pub amount: String,
    pub recipient: String,
    pub note: String,
    pub instructions: String,
    pub link: Option<String>,
    /// Extra wording from the catalog's `paymentMethods` table.
    pub catalog_note: Option<String>,
}

impl PaymentView {
    fn new(details: &PaymentDetails, catalog: Option<&Catalog>) -> Self {
        let catalog_note = catalog
            .and_then(|c| c.payment_methods.get(details.method.as_str()))
            .map(|info| info.instructions.trim().to_string())
            .filter(|s| !s.is_empty());
        Self {
            method: details.method.display_name(),
            plan: details.plan.label(),
            amount: details.amount.display(),
            recipient: details.recipient.clone(),
            note: details.note.clone(),
            instructions: details.instructions.clone(),
            link: details.link.clone(),
            catalog_note,
        }
    }
}

/// Order summary line display data.
#[derive(Clone)]
pub struct SummaryLineView {
    pub quantity: u32,
    pub label: String,
    pub unit_price: String,
    pub line_total: String,
}

/// Placed order display data.
#[derive(Clone)]
pub struct ConfirmationView {
    pub customer_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub fulfillment: String,
    pub quote: Option<QuoteView>,
    pub notes: Option<String>,
    pub lines: Vec<SummaryLineView>,
    pub totals: TotalsView,
    pub payment: PaymentView,
    /// Plain-text summary for copying into a message.
    pub summary_text: String,
}

impl ConfirmationView {
    fn new(order: &PlacedOrder, catalog: Option<&Catalog>) -> Self {
        let (fulfillment, quote) = match &order.fulfillment {
            Fulfillment::Pickup { date } => {
                (format!("Pickup on {}", date.format("%A, %B %-d, %Y")), None)
            }
            Fulfillment::Shipping { address, quote } => (
                format!("Ship to {address}, {} {}", quote.state, quote.zip),
                Some(QuoteView::from(quote)),
            ),
        };

        Self {
            customer_name: order.customer_name.clone(),
            email: order.email.to_string(),
            phone: order.phone.clone(),
            fulfillment,
            quote,
            notes: order.notes.clone(),
            lines: order
                .summary
                .lines
                .iter()
                .map(|l| SummaryLineView {
                    quantity: l.quantity,
                    label: l.label.clone(),
                    unit_price: l.unit_price.display(),
                    line_total: l.line_total.display(),
                })
                .collect(),
            totals: TotalsView::from(&order.summary.totals),
            payment: PaymentView::new(&order.payment, catalog),
            summary_text: order.summary.text(),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Order page template.
#[derive(Template, WebTemplate)]
#[template(path = "order.html")]
pub struct OrderTemplate {
    pub cart: CartView,
    pub methods: Vec<PaymentOption>,
    pub form: OrderForm,
    pub full_payment: bool,
    pub errors: OrderFormErrors,
    /// Problem with the order as a whole, e.g. paused orders.
    pub error: Option<String>,
    pub min_pickup_date: String,
    pub orders_paused: bool,
}

/// Order confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "confirmation.html")]
pub struct ConfirmationTemplate {
    pub order: ConfirmationView,
}

/// Shipping quote fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/shipping_quote.html")]
pub struct ShippingQuoteTemplate {
    pub quote: Option<QuoteView>,
    pub error: Option<String>,
    pub totals: TotalsView,
}

/// Payment instructions fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/payment.html")]
pub struct PaymentTemplate {
    pub payment: PaymentView,
}

// =============================================================================
// Form data
// =============================================================================

/// Shipping quote form data.
#[derive(Debug, Deserialize)]
pub struct ShippingForm {
    #[serde(default)]
    pub zip: String,
    #[serde(default)]
    pub state: String,
}

/// Payment instructions query parameters.
#[derive(Debug, Deserialize)]
pub struct PaymentQuery {
    #[serde(default)]
    pub payment_method: String,
    pub plan: Option<PaymentPlan>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fulfillment: String,
    #[serde(default)]
    pub zip: String,
    #[serde(default)]
    pub state: String,
}

// =============================================================================
// Helpers
// =============================================================================

/// Earliest pickup date the form offers: tomorrow.
fn min_pickup_date(today: NaiveDate) -> String {
    today
        .checked_add_days(Days::new(1))
        .unwrap_or(today)
        .format("%Y-%m-%d")
        .to_string()
}

/// The overlaid catalog, or `None` when it cannot be loaded.
///
/// Checkout still works without a catalog; weights fall back to estimates
/// and shippability is not checked.
async fn optional_catalog(state: &AppState) -> Option<Catalog> {
    let site = state.site_config();
    state.catalog().load_with_overlay(&site).await.ok()
}

fn order_page(
    cart: &SessionCart,
    form: OrderForm,
    errors: OrderFormErrors,
    error: Option<String>,
    orders_paused: bool,
) -> OrderTemplate {
    OrderTemplate {
        cart: CartView::new(cart),
        methods: payment_options(&form.payment_method),
        full_payment: form.plan == Some(PaymentPlan::Full),
        form,
        errors,
        error,
        min_pickup_date: min_pickup_date(Local::now().date_naive()),
        orders_paused,
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the order page.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<OrderTemplate> {
    let cart = SessionCart::load(&session).await?;
    let orders_paused = state.site_config().orders_paused();
    Ok(order_page(
        &cart,
        OrderForm::default(),
        OrderFormErrors::default(),
        None,
        orders_paused,
    ))
}

/// Quote shipping for the current cart (HTMX).
#[instrument(skip(state, session))]
pub async fn shipping(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ShippingForm>,
) -> Result<Response> {
    let cart = SessionCart::load(&session).await?;
    let catalog = optional_catalog(&state).await;
    let rates = state.shipping_rates(catalog.as_ref());

    let weight = CartWeight::from_items(cart.items(), catalog.as_ref());
    match rates.estimate(&form.zip, &form.state, weight) {
        Ok(quote) => {
            tracing::debug!(zip = %quote.zip, zone = %quote.zone, total = %quote.total.display(), "Shipping quoted");
            Ok(ShippingQuoteTemplate {
                quote: Some(QuoteView::from(&quote)),
                error: None,
                totals: CartView::with_shipping(&cart, quote.total).totals,
            }
            .into_response())
        }
        Err(e) => {
            let error = AppError::from(e);
            Ok((
                error.status(),
                ShippingQuoteTemplate {
                    quote: None,
                    error: Some(error.public_message()),
                    totals: CartView::new(&cart).totals,
                },
            )
                .into_response())
        }
    }
}

/// Payment instructions for the chosen method and plan (HTMX).
///
/// Shipping is included in the amount when a valid ZIP and state are given.
#[instrument(skip(state, session))]
pub async fn payment(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<PaymentQuery>,
) -> Result<PaymentTemplate> {
    let method = query
        .payment_method
        .parse::<PaymentMethod>()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let cart = SessionCart::load(&session).await?;
    let catalog = optional_catalog(&state).await;

    let shipping = if query.fulfillment.trim() == "shipping" {
        let rates = state.shipping_rates(catalog.as_ref());
        let weight = CartWeight::from_items(cart.items(), catalog.as_ref());
        rates
            .estimate(&query.zip, &query.state, weight)
            .map_or(Price::ZERO, |q| q.total)
    } else {
        Price::ZERO
    };

    let totals = farmhouse_core::cart::totals(cart.items(), shipping);
    let details = payment_details(
        method,
        query.plan.unwrap_or_default(),
        &totals,
        &query.name,
        state.payment_handles(),
    );

    Ok(PaymentTemplate {
        payment: PaymentView::new(&details, catalog.as_ref()),
    })
}

/// Place the order.
///
/// On success the cart and its undo history are emptied and the
/// confirmation is shown. Otherwise the form is shown again with the
/// visitor's input kept.
#[instrument(skip(state, session, form))]
pub async fn place(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<OrderForm>,
) -> Result<Response> {
    let site = state.site_config();
    let catalog = state.catalog().load_with_overlay(&site).await.ok();
    let rates = state.shipping_rates(catalog.as_ref());
    let mut cart = SessionCart::load(&session).await?;

    let checkout = Checkout {
        rates: &rates,
        handles: state.payment_handles(),
        catalog: catalog.as_ref(),
        orders_paused: site.orders_paused(),
        today: Local::now().date_naive(),
    };

    match checkout.place(&form, cart.items()) {
        Ok(order) => {
            tracing::info!(
                customer = %order.customer_name,
                email = %order.email,
                method = %order.payment.method,
                plan = order.payment.plan.label(),
                total = %order.summary.totals.total.display(),
                lines = order.summary.lines.len(),
                "Order placed"
            );
            add_breadcrumb("order", "Order placed", None);

            let view = ConfirmationView::new(&order, catalog.as_ref());
            cart.store().clear();
            cart.forget_undo();
            cart.save(&session).await?;

            Ok(ConfirmationTemplate { order: view }.into_response())
        }
        Err(err) => {
            let status = AppError::from(err.clone()).status();
            tracing::info!(error = %err, "Order rejected");
            let (errors, message) = match err {
                OrderError::Invalid(errors) => (errors, None),
                other => (OrderFormErrors::default(), Some(other.to_string())),
            };
            let page = order_page(&cart, form, errors, message, site.orders_paused());
            Ok((status, page).into_response())
        }
    }
}
