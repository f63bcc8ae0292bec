//! Order summary, payment links and the order form.
//!
//! Nothing here takes payment. An order is a validated form plus a
//! plain-text summary of the cart; the visitor then pays through a deep link
//! into a payment app (or in cash at pickup) and the bakery reconciles by
//! hand.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cart::{LineItem, MAX_NAME_CHARS, Totals, sanitize_text, totals};
use crate::catalog::Catalog;
use crate::shipping::{CartWeight, ShippingQuote, ShippingRates};
use crate::types::{Email, Price};

/// Used in payment notes when the visitor has not typed a name yet.
const PLACEHOLDER_PAYER: &str = "YourName";

// =============================================================================
// Summary
// =============================================================================

/// One line of the order summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryLine {
    pub quantity: u32,
    /// Name with size and dietary tags, e.g. `Sugar Cookies (1/2 dozen) [GF]`.
    pub label: String,
    pub unit_price: Price,
    pub line_total: Price,
}

/// Cart lines plus totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    pub lines: Vec<SummaryLine>,
    pub totals: Totals,
}

impl OrderSummary {
    #[must_use]
    pub fn new(items: &[LineItem], shipping: Price) -> Self {
        let lines = items
            .iter()
            .map(|item| SummaryLine {
                quantity: item.quantity,
                label: item.label(),
                unit_price: item.price,
                line_total: item.line_total(),
            })
            .collect();
        Self {
            lines,
            totals: totals(items, shipping),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Plain-text block, one `"{qty}x {label} - ${line total}"` line per item.
    #[must_use]
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|line| format!("{}x {} - {}\n", line.quantity, line.label, line.line_total))
            .collect()
    }
}

// =============================================================================
// Payment
// =============================================================================

/// How the visitor will pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    CashApp,
    Venmo,
    PayPal,
    Zelle,
}

impl PaymentMethod {
    pub const ALL: [Self; 5] = [
        Self::Cash,
        Self::CashApp,
        Self::Venmo,
        Self::PayPal,
        Self::Zelle,
    ];

    /// Form value, also the catalog's `paymentMethods` key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::CashApp => "cashapp",
            Self::Venmo => "venmo",
            Self::PayPal => "paypal",
            Self::Zelle => "zelle",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Cash => "Cash",
            Self::CashApp => "Cash App",
            Self::Venmo => "Venmo",
            Self::PayPal => "PayPal",
            Self::Zelle => "Zelle",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Error for an unrecognized payment method string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown payment method {0:?}")]
pub struct UnknownPaymentMethod(pub String);

impl FromStr for PaymentMethod {
    type Err = UnknownPaymentMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownPaymentMethod(s.to_owned()))
    }
}

/// How much is paid now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentPlan {
    /// Half now, the balance at pickup or before shipping.
    #[default]
    Deposit,
    Full,
}

impl PaymentPlan {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Deposit => "50% Deposit",
            Self::Full => "Full Amount",
        }
    }

    /// The amount due now under this plan.
    #[must_use]
    pub const fn amount(self, totals: &Totals) -> Price {
        match self {
            Self::Deposit => totals.deposit,
            Self::Full => totals.total,
        }
    }
}

/// The bakery's payment app accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentHandles {
    /// Cash App cashtag without the `$`.
    pub cashtag: String,
    /// Venmo username without the `@`.
    pub venmo: String,
    /// PayPal.Me name.
    pub paypal_me: String,
    pub zelle_phone: String,
}

impl Default for PaymentHandles {
    fn default() -> Self {
        Self {
            cashtag: "DanaBlueMoonHaven".to_owned(),
            venmo: "BlueMoonHaven".to_owned(),
            paypal_me: "BlueMoonHaven".to_owned(),
            zelle_phone: "805-709-4686".to_owned(),
        }
    }
}

/// What to pay, to whom, and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentDetails {
    pub method: PaymentMethod,
    pub plan: PaymentPlan,
    pub amount: Price,
    /// Who receives the payment, e.g. `@BlueMoonHaven`.
    pub recipient: String,
    /// Note to attach to the payment.
    pub note: String,
    pub instructions: String,
    /// Deep link into the payment app, when it has one.
    pub link: Option<String>,
}

/// Payment note for `payer`, e.g. `Dana - Yellow Farmhouse Order`.
#[must_use]
pub fn payment_note(payer: &str) -> String {
    let name = sanitize_text(payer, MAX_NAME_CHARS);
    let name = if name.is_empty() {
        PLACEHOLDER_PAYER
    } else {
        name.as_str()
    };
    format!("{name} - Yellow Farmhouse Order")
}

fn deep_link(base: &str, segments: &[&str], query: &[(&str, &str)]) -> Option<String> {
    let mut url = Url::parse(base).ok()?;
    url.path_segments_mut().ok()?.pop_if_empty().extend(segments);
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Some(url.into())
}

/// Build payment details for `method` and `plan`.
#[must_use]
pub fn payment_details(
    method: PaymentMethod,
    plan: PaymentPlan,
    totals: &Totals,
    payer: &str,
    handles: &PaymentHandles,
) -> PaymentDetails {
    let amount = plan.amount(totals);
    let amount_str = amount.plain();
    let label = plan.label();
    let note = payment_note(payer);

    let (recipient, instructions, link) = match method {
        PaymentMethod::Cash => (
            "Pay at pickup".to_owned(),
            format!("Please bring {amount} ({label}) in cash when you arrive for pickup."),
            None,
        ),
        PaymentMethod::CashApp => (
            format!("${}", handles.cashtag),
            format!("Send {label} of {amount} to ${} with the note \"{note}\".", handles.cashtag),
            deep_link(
                "https://cash.app/",
                &[format!("${}", handles.cashtag).as_str(), amount_str.as_str()],
                &[("note", note.as_str())],
            ),
        ),
        PaymentMethod::Venmo => (
            format!("@{}", handles.venmo),
            format!("Send {label} of {amount} to @{} with the note \"{note}\".", handles.venmo),
            deep_link(
                "https://venmo.com/",
                &[handles.venmo.as_str()],
                &[
                    ("txn", "pay"),
                    ("amount", amount_str.as_str()),
                    ("note", note.as_str()),
                ],
            ),
        ),
        PaymentMethod::PayPal => (
            format!("PayPal.Me/{}", handles.paypal_me),
            format!(
                "Send {label} of {amount} to PayPal.Me/{}. Include \"{note}\" in the payment note.",
                handles.paypal_me
            ),
            deep_link(
                "https://paypal.me/",
                &[handles.paypal_me.as_str(), format!("{amount_str}USD").as_str()],
                &[],
            ),
        ),
        PaymentMethod::Zelle => (
            handles.zelle_phone.clone(),
            format!(
                "Send {label} of {amount} to {} with the note \"{note}\". \
                 Open your banking app and select Zelle to send payment.",
                handles.zelle_phone
            ),
            None,
        ),
    };

    PaymentDetails {
        method,
        plan,
        amount,
        recipient,
        note,
        instructions,
        link,
    }
}

// =============================================================================
// Order form
// =============================================================================

/// Raw order form fields, as posted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrderForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    /// `"pickup"` or `"shipping"`.
    pub fulfillment: String,
    /// `YYYY-MM-DD`.
    pub pickup_date: String,
    pub address: String,
    pub zip: String,
    pub state: String,
    pub payment_method: String,
    pub plan: Option<PaymentPlan>,
    pub notes: String,
}

/// One problem with a form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every problem found in a submitted form.
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("{} problem(s) with the order form", .0.len())]
pub struct OrderFormErrors(pub Vec<FieldError>);

impl OrderFormErrors {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Message for `field`, if it had a problem.
    #[must_use]
    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

/// Why an order could not be placed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("orders are paused right now, please check back soon")]
    OrdersPaused,

    #[error("your cart is empty")]
    EmptyCart,

    #[error(transparent)]
    Invalid(#[from] OrderFormErrors),
}

/// Pickup or delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum Fulfillment {
    Pickup { date: NaiveDate },
    Shipping { address: String, quote: ShippingQuote },
}

impl Fulfillment {
    /// Shipping charge, zero for pickup.
    #[must_use]
    pub const fn shipping_cost(&self) -> Price {
        match self {
            Self::Pickup { .. } => Price::ZERO,
            Self::Shipping { quote, .. } => quote.total,
        }
    }
}

/// A placed order, ready to show to the visitor and log for the bakery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedOrder {
    pub customer_name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub fulfillment: Fulfillment,
    pub notes: Option<String>,
    pub summary: OrderSummary,
    pub payment: PaymentDetails,
}

/// Everything order placement depends on besides the form and the cart.
#[derive(Debug, Clone, Copy)]
pub struct Checkout<'a> {
    pub rates: &'a ShippingRates,
    pub handles: &'a PaymentHandles,
    pub catalog: Option<&'a Catalog>,
    pub orders_paused: bool,
    /// Pickup must be on a later day than this.
    pub today: NaiveDate,
}

impl Checkout<'_> {
    /// Validate `form` against the cart and build the order.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::OrdersPaused`] or [`OrderError::EmptyCart`]
    /// before looking at the form, otherwise every field problem at once.
    pub fn place(&self, form: &OrderForm, items: &[LineItem]) -> Result<PlacedOrder, OrderError> {
        if self.orders_paused {
            return Err(OrderError::OrdersPaused);
        }
        if items.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let mut errors = Vec::new();
        let mut fail = |field: &'static str, message: String| {
            errors.push(FieldError { field, message });
        };

        let customer_name = sanitize_text(&form.name, MAX_NAME_CHARS);
        if customer_name.is_empty() {
            fail("name", "Please enter your name.".to_owned());
        }

        let email = Email::parse(&form.email)
            .map_err(|e| fail("email", format!("Please enter a valid email: {e}.")))
            .ok();

        let phone = form.phone.trim();
        let digits = phone.chars().filter(char::is_ascii_digit).count();
        if !phone.is_empty() && !(10..=11).contains(&digits) {
            fail("phone", "Please enter a 10-digit phone number.".to_owned());
        }

        let method = if form.payment_method.trim().is_empty() {
            fail("payment_method", "Please choose a payment method.".to_owned());
            None
        } else {
            form.payment_method
                .parse::<PaymentMethod>()
                .map_err(|e| fail("payment_method", e.to_string()))
                .ok()
        };

        let fulfillment = match form.fulfillment.trim() {
            "pickup" => self.pickup(form, &mut fail),
            "shipping" => {
                if method == Some(PaymentMethod::Cash) {
                    fail(
                        "payment_method",
                        "Cash is only accepted for pickup orders.".to_owned(),
                    );
                }
                self.shipping(form, items, &mut fail)
            }
            _ => {
                fail("fulfillment", "Please choose pickup or shipping.".to_owned());
                None
            }
        };

        let (Some(email), Some(method), Some(fulfillment)) = (email, method, fulfillment) else {
            return Err(OrderFormErrors(errors).into());
        };
        if !errors.is_empty() {
            return Err(OrderFormErrors(errors).into());
        }

        let summary = OrderSummary::new(items, fulfillment.shipping_cost());
        let plan = form.plan.unwrap_or_default();
        let payment = payment_details(method, plan, &summary.totals, &customer_name, self.handles);
        let notes = Some(sanitize_text(&form.notes, 1000)).filter(|n| !n.is_empty());

        Ok(PlacedOrder {
            customer_name,
            email,
            phone: Some(phone.to_owned()).filter(|p| !p.is_empty()),
            fulfillment,
            notes,
            summary,
            payment,
        })
    }

    fn pickup(
        &self,
        form: &OrderForm,
        fail: &mut impl FnMut(&'static str, String),
    ) -> Option<Fulfillment> {
        let Ok(date) = NaiveDate::parse_from_str(form.pickup_date.trim(), "%Y-%m-%d") else {
            fail("pickup_date", "Please choose a pickup date.".to_owned());
            return None;
        };
        if date <= self.today {
            fail(
                "pickup_date",
                "Pickup dates start tomorrow; please choose a later date.".to_owned(),
            );
            return None;
        }
        Some(Fulfillment::Pickup { date })
    }

    fn shipping(
        &self,
        form: &OrderForm,
        items: &[LineItem],
        fail: &mut impl FnMut(&'static str, String),
    ) -> Option<Fulfillment> {
        if let Some(catalog) = self.catalog {
            for item in items {
                let product = item
                    .product_id
                    .as_ref()
                    .and_then(|id| catalog.find(id.as_str()));
                if product.is_some_and(|p| !p.shippable) {
                    fail(
                        "fulfillment",
                        format!("{} is pickup only.", item.name),
                    );
                }
            }
        }

        let address = form.address.trim();
        if address.is_empty() {
            fail("address", "Please enter a shipping address.".to_owned());
        }

        let weight = CartWeight::from_items(items, self.catalog);
        match self.rates.estimate(&form.zip, &form.state, weight) {
            Ok(quote) if !address.is_empty() => Some(Fulfillment::Shipping {
                address: address.to_owned(),
                quote,
            }),
            Ok(_) => None,
            Err(e) => {
                fail("zip", e.to_string());
                None
            }
        }
    }
}
