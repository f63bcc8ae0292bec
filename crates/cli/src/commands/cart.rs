//! File-backed cart commands.
//!
//! # Usage
//!
//! ```bash
//! yfhs cart --store ./cart list
//! yfhs cart --store ./cart add "Sugar Cookies" 12 --size "1/2 dozen" --gluten-free
//! yfhs cart --store ./cart qty 0 -1
//! yfhs cart --store ./cart remove 0
//! yfhs cart --store ./cart totals --shipping 8
//! ```
//!
//! Positions are the zero-based numbers `list` prints.

use std::io::Write;

use farmhouse_core::cart::{AddOutcome, CartError, CartStore, LineItem, QuantityChange, totals};
use farmhouse_core::storage::KeyValueStore;
use farmhouse_core::{Price, ProductId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors from cart commands.
#[derive(Debug, Error)]
pub enum CartCommandError {
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("cannot write output: {0}")]
    Output(#[from] std::io::Error),
}

/// A line item to add.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub price: Decimal,
    pub quantity: String,
    pub size: Option<String>,
    pub gluten_free: bool,
    pub sugar_free: bool,
    pub product_id: Option<String>,
}

/// Print any storage warnings the last write produced.
fn report_warnings<S: KeyValueStore>(
    cart: &mut CartStore<S>,
    out: &mut impl Write,
) -> Result<(), CartCommandError> {
    for warning in cart.take_warnings() {
        tracing::warn!(%warning, "Cart write failed");
        writeln!(out, "warning: {warning}")?;
    }
    Ok(())
}

/// Print every line with its position.
///
/// # Errors
///
/// Returns an error if output cannot be written.
pub fn list<S: KeyValueStore>(
    cart: &mut CartStore<S>,
    out: &mut impl Write,
) -> Result<(), CartCommandError> {
    let items = cart.get_cart();
    if items.is_empty() {
        writeln!(out, "cart is empty")?;
        return Ok(());
    }
    for (index, item) in items.iter().enumerate() {
        writeln!(
            out,
            "[{index}] {} x{} @ {} = {}",
            item.label(),
            item.quantity,
            item.price,
            item.line_total()
        )?;
    }
    writeln!(out, "{} item(s)", cart.item_count())?;
    Ok(())
}

/// Add a line, merging into a matching one.
///
/// # Errors
///
/// Returns an error for an invalid quantity, name or price.
pub fn add<S: KeyValueStore>(
    cart: &mut CartStore<S>,
    item: NewItem,
    out: &mut impl Write,
) -> Result<(), CartCommandError> {
    let quantity = farmhouse_core::cart::parse_quantity(&item.quantity)?;
    let mut line = LineItem::new(item.name, Price::new(item.price), quantity)
        .with_dietary(item.gluten_free, item.sugar_free);
    if let Some(size) = item.size {
        line = line.with_size(size);
    }
    if let Some(id) = item.product_id {
        line = line.with_product_id(ProductId::new(id));
    }

    let label = line.label();
    match cart.add_item(line)? {
        AddOutcome::Added { index } => writeln!(out, "added [{index}] {label}")?,
        AddOutcome::Merged { index, quantity } => {
            writeln!(out, "merged into [{index}] {label}, now x{quantity}")?;
        }
    }
    report_warnings(cart, out)
}

/// Change a line's quantity by `delta`.
///
/// # Errors
///
/// Returns an error if `index` is out of range.
pub fn quantity<S: KeyValueStore>(
    cart: &mut CartStore<S>,
    index: usize,
    delta: i64,
    out: &mut impl Write,
) -> Result<(), CartCommandError> {
    match cart.update_quantity(index, delta)? {
        QuantityChange::Updated { quantity } => writeln!(out, "[{index}] now x{quantity}")?,
        QuantityChange::Removed(item) => writeln!(out, "removed {}", item.label())?,
    }
    report_warnings(cart, out)
}

/// Remove a line.
///
/// # Errors
///
/// Returns an error if `index` is out of range.
pub fn remove<S: KeyValueStore>(
    cart: &mut CartStore<S>,
    index: usize,
    out: &mut impl Write,
) -> Result<(), CartCommandError> {
    let item = cart.remove_item(index)?;
    writeln!(out, "removed {}", item.label())?;
    report_warnings(cart, out)
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error if output cannot be written.
pub fn clear<S: KeyValueStore>(
    cart: &mut CartStore<S>,
    out: &mut impl Write,
) -> Result<(), CartCommandError> {
    let removed = cart.clear();
    writeln!(out, "removed {} line(s)", removed.len())?;
    report_warnings(cart, out)
}

/// Print subtotal, shipping, total and the 50% deposit split.
///
/// # Errors
///
/// Returns an error if output cannot be written.
pub fn print_totals<S: KeyValueStore>(
    cart: &mut CartStore<S>,
    shipping: Decimal,
    out: &mut impl Write,
) -> Result<(), CartCommandError> {
    let totals = totals(&cart.get_cart(), Price::new(shipping));
    writeln!(out, "subtotal {}", totals.subtotal)?;
    writeln!(out, "shipping {}", totals.shipping)?;
    writeln!(out, "total    {}", totals.total)?;
    writeln!(out, "deposit  {}", totals.deposit)?;
    writeln!(out, "balance  {}", totals.balance)?;
    Ok(())
}
