//! Cart store.
//!
//! The cart is an ordered JSON array of [`LineItem`]s kept in one storage slot
//! ([`CART_KEY`]). [`CartStore`] owns every read and write of that slot:
//!
//! - reads are sanitized, and a corrupted slot is reset to an empty cart
//! - adds merge into an existing line when name, size and dietary flags match
//! - writes that fail (quota, storage disabled) are recorded as
//!   [`StorageWarning`]s and the store keeps working from its in-memory copy
//!
//! Totals are a pure function of the items, see [`totals`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::{KeyValueStore, StorageError};
use crate::types::{Price, ProductId};
use crate::undo::UndoAction;

/// Storage slot holding the cart.
pub const CART_KEY: &str = "yfhs_cart";

/// Longest item name kept after sanitizing.
pub const MAX_NAME_CHARS: usize = 100;

/// Longest size label kept after sanitizing.
pub const MAX_SIZE_CHARS: usize = 50;

/// Highest unit price a line may carry, in whole dollars. Keeps line and cart
/// totals far inside `Decimal` range at any `u32` quantity.
pub const MAX_UNIT_PRICE_DOLLARS: i64 = 10_000;

/// Characters removed from names and sizes read back from storage.
const STRIPPED_CHARS: &[char] = &['<', '>', '"', '\'', '`', '&'];

/// Errors for cart operations the visitor can correct.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("item name is required")]
    EmptyName,

    #[error("price must be greater than zero")]
    NonPositivePrice,

    #[error("price must be at most {max}")]
    PriceTooHigh { max: Price },

    #[error("quantity must be a whole number of at least 1 (got {0:?})")]
    InvalidQuantity(String),

    #[error("no cart item at position {index} (cart has {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

// =============================================================================
// Line items
// =============================================================================

/// One cart entry.
///
/// `name` is the product name only; size and dietary choices live in their
/// own fields. The older `glutenFree`/`sugarFree` keys are accepted on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// Unit price including any dietary surcharge.
    pub price: Price,
    pub quantity: u32,
    #[serde(rename = "isGF", alias = "glutenFree", default)]
    pub is_gf: bool,
    #[serde(rename = "isSF", alias = "sugarFree", default)]
    pub is_sf: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
}

impl LineItem {
    /// A plain line item with no size or dietary flags.
    #[must_use]
    pub fn new(name: impl Into<String>, price: Price, quantity: u32) -> Self {
        Self {
            name: name.into(),
            size: None,
            price,
            quantity,
            is_gf: false,
            is_sf: false,
            product_id: None,
        }
    }

    #[must_use]
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    #[must_use]
    pub const fn with_dietary(mut self, gluten_free: bool, sugar_free: bool) -> Self {
        self.is_gf = gluten_free;
        self.is_sf = sugar_free;
        self
    }

    #[must_use]
    pub fn with_product_id(mut self, id: ProductId) -> Self {
        self.product_id = Some(id);
        self
    }

    /// `price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price * self.quantity
    }

    /// Dietary tags in display order.
    #[must_use]
    pub fn dietary_tags(&self) -> Vec<&'static str> {
        let mut tags = Vec::new();
        if self.is_gf {
            tags.push("GF");
        }
        if self.is_sf {
            tags.push("SF");
        }
        tags
    }

    /// Display label, e.g. `Sugar Cookies (1/2 dozen) [GF]`.
    #[must_use]
    pub fn label(&self) -> String {
        let mut label = self.name.clone();
        if let Some(size) = self.size.as_deref().filter(|s| !s.is_empty()) {
            label.push_str(" (");
            label.push_str(size);
            label.push(')');
        }
        let tags = self.dietary_tags();
        if !tags.is_empty() {
            label.push_str(" [");
            label.push_str(&tags.join(", "));
            label.push(']');
        }
        label
    }

    fn same_line(&self, other: &Self) -> bool {
        self.name == other.name
            && self.size == other.size
            && self.is_gf == other.is_gf
            && self.is_sf == other.is_sf
    }
}

/// Remove control characters and markup-significant characters, trim, and
/// cap the length in characters.
#[must_use]
pub fn sanitize_text(s: &str, max_chars: usize) -> String {
    let cleaned: String = s
        .chars()
        .filter(|c| !c.is_control() && !STRIPPED_CHARS.contains(c))
        .collect();
    cleaned.trim().chars().take(max_chars).collect()
}

/// Parse a quantity typed by the visitor.
///
/// # Errors
///
/// Returns [`CartError::InvalidQuantity`] for anything but a whole number of
/// at least 1 (`"1.5"`, `"abc"`, `"0"`, `"-2"`).
pub fn parse_quantity(input: &str) -> Result<u32, CartError> {
    match input.trim().parse::<u32>() {
        Ok(q) if q >= 1 => Ok(q),
        _ => Err(CartError::InvalidQuantity(input.to_owned())),
    }
}

/// Sanitize one stored element, or `None` if it should be dropped.
fn sanitize_stored(value: Value) -> Option<LineItem> {
    let mut item: LineItem = serde_json::from_value(value).ok()?;
    item.name = sanitize_text(&item.name, MAX_NAME_CHARS);
    item.size = item
        .size
        .map(|s| sanitize_text(&s, MAX_SIZE_CHARS))
        .filter(|s| !s.is_empty());
    if item.name.is_empty()
        || !item.price.is_positive()
        || item.price > Price::dollars(MAX_UNIT_PRICE_DOLLARS)
        || item.quantity == 0
    {
        return None;
    }
    Some(item)
}

// =============================================================================
// Totals
// =============================================================================

/// Order totals with the fixed 50% deposit policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub subtotal: Price,
    pub shipping: Price,
    pub total: Price,
    pub deposit: Price,
    pub balance: Price,
}

/// Compute totals for `items` plus a shipping charge.
///
/// `deposit` is exactly half of `total` and `deposit + balance == total`.
#[must_use]
pub fn totals(items: &[LineItem], shipping: Price) -> Totals {
    let subtotal: Price = items.iter().map(LineItem::line_total).sum();
    let total = subtotal + shipping;
    let deposit = total.half();
    Totals {
        subtotal,
        shipping,
        total,
        deposit,
        balance: total - deposit,
    }
}

// =============================================================================
// CartStore
// =============================================================================

/// A failed cart write, reported to the visitor as a non-fatal warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageWarning {
    pub message: String,
}

impl StorageWarning {
    fn from_error(error: &StorageError) -> Self {
        let message = match error {
            StorageError::QuotaExceeded { .. } => {
                "Your cart is too large to save. It will be kept until you leave the site."
            }
            StorageError::Unavailable(_) | StorageError::Io { .. } => {
                "Cart storage is unavailable. Your cart will not be saved."
            }
        };
        Self {
            message: message.to_owned(),
        }
    }
}

impl fmt::Display for StorageWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result of [`CartStore::add_item`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new line was appended.
    Added { index: usize },
    /// An existing matching line now has `quantity`.
    Merged { index: usize, quantity: u32 },
}

/// Result of [`CartStore::update_quantity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuantityChange {
    Updated { quantity: u32 },
    /// The quantity reached zero and the line was removed.
    Removed(LineItem),
}

/// The cart, persisted in a storage slot.
#[derive(Debug)]
pub struct CartStore<S> {
    storage: S,
    items: Vec<LineItem>,
    degraded: bool,
    warnings: Vec<StorageWarning>,
}

impl<S: KeyValueStore> CartStore<S> {
    /// Open the cart held in `storage`.
    pub fn new(storage: S) -> Self {
        let mut store = Self {
            storage,
            items: Vec::new(),
            degraded: false,
            warnings: Vec::new(),
        };
        store.items = store.load();
        store
    }

    /// Resume a cart that already failed to save.
    ///
    /// `items` are kept in memory only; `storage` is never written.
    pub fn unsaved(storage: S, items: Vec<LineItem>) -> Self {
        Self {
            storage,
            items,
            degraded: true,
            warnings: Vec::new(),
        }
    }

    /// Current cart contents, re-read from storage and sanitized.
    ///
    /// Never fails: corrupted storage resets to an empty cart, and unreadable
    /// storage falls back to the in-memory copy.
    pub fn get_cart(&mut self) -> Vec<LineItem> {
        if !self.degraded {
            self.items = self.load();
        }
        self.items.clone()
    }

    /// In-memory view without re-reading storage.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Sum of quantities, for the cart badge.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |n, item| n.saturating_add(item.quantity))
    }

    /// Add a line item, merging into a matching line if there is one.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, the price is not positive or
    /// above [`MAX_UNIT_PRICE_DOLLARS`], or the quantity is zero. The cart is
    /// unchanged in that case.
    pub fn add_item(&mut self, candidate: LineItem) -> Result<AddOutcome, CartError> {
        let mut candidate = candidate;
        candidate.name = sanitize_text(&candidate.name, MAX_NAME_CHARS);
        candidate.size = candidate
            .size
            .map(|s| sanitize_text(&s, MAX_SIZE_CHARS))
            .filter(|s| !s.is_empty());

        if candidate.name.is_empty() {
            return Err(CartError::EmptyName);
        }
        if !candidate.price.is_positive() {
            return Err(CartError::NonPositivePrice);
        }
        let max = Price::dollars(MAX_UNIT_PRICE_DOLLARS);
        if candidate.price > max {
            return Err(CartError::PriceTooHigh { max });
        }
        if candidate.quantity == 0 {
            return Err(CartError::InvalidQuantity("0".to_owned()));
        }

        let outcome = self.merge_or_push(candidate);
        self.persist();
        tracing::debug!(?outcome, count = self.item_count(), "Cart item added");
        Ok(outcome)
    }

    /// Change a line's quantity by `delta`, removing it at zero or below.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range.
    pub fn update_quantity(&mut self, index: usize, delta: i64) -> Result<QuantityChange, CartError> {
        let len = self.items.len();
        let item = self
            .items
            .get_mut(index)
            .ok_or(CartError::IndexOutOfRange { index, len })?;

        let next = i64::from(item.quantity).saturating_add(delta);
        let change = if next <= 0 {
            QuantityChange::Removed(self.items.remove(index))
        } else {
            let quantity = u32::try_from(next).unwrap_or(u32::MAX);
            item.quantity = quantity;
            QuantityChange::Updated { quantity }
        };
        self.persist();
        Ok(change)
    }

    /// Remove a line and return it.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range.
    pub fn remove_item(&mut self, index: usize) -> Result<LineItem, CartError> {
        if index >= self.items.len() {
            return Err(CartError::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        let removed = self.items.remove(index);
        self.persist();
        Ok(removed)
    }

    /// Empty the cart and return what was in it.
    pub fn clear(&mut self) -> Vec<LineItem> {
        let previous = std::mem::take(&mut self.items);
        self.persist();
        previous
    }

    /// Put back what an undoable action took out.
    ///
    /// A removed line returns to its old position (or the end, if the cart has
    /// shrunk since); lines matching an existing one merge into it.
    pub fn restore(&mut self, action: UndoAction) {
        match action {
            UndoAction::RemovedItem { index, item } => {
                if let Some(existing) = self.items.iter_mut().find(|i| i.same_line(&item)) {
                    existing.quantity = existing.quantity.saturating_add(item.quantity);
                } else {
                    let at = index.min(self.items.len());
                    self.items.insert(at, item);
                }
            }
            UndoAction::ClearedCart { items } => {
                for item in items {
                    self.merge_or_push(item);
                }
            }
        }
        self.persist();
    }

    /// True once a write has failed; the cart is then memory-only.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Drain warnings recorded by failed writes.
    pub fn take_warnings(&mut self) -> Vec<StorageWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// Give back the storage backend.
    pub fn into_storage(self) -> S {
        self.storage
    }

    fn merge_or_push(&mut self, item: LineItem) -> AddOutcome {
        if let Some((index, existing)) = self
            .items
            .iter_mut()
            .enumerate()
            .find(|(_, i)| i.same_line(&item))
        {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
            AddOutcome::Merged {
                index,
                quantity: existing.quantity,
            }
        } else {
            self.items.push(item);
            AddOutcome::Added {
                index: self.items.len() - 1,
            }
        }
    }

    fn load(&mut self) -> Vec<LineItem> {
        let raw = match self.storage.get_item(CART_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Cart storage unreadable, using in-memory cart");
                return self.items.clone();
            }
        };

        let Ok(Value::Array(elements)) = serde_json::from_str::<Value>(&raw) else {
            tracing::warn!(bytes = raw.len(), "Cart data corrupted, resetting to empty cart");
            if let Err(e) = self.storage.remove_item(CART_KEY) {
                tracing::warn!(error = %e, "Could not clear corrupted cart");
            }
            return Vec::new();
        };

        let stored = elements.len();
        let items: Vec<LineItem> = elements.into_iter().filter_map(sanitize_stored).collect();
        if items.len() < stored {
            tracing::warn!(
                dropped = stored - items.len(),
                "Dropped invalid cart items"
            );
        }
        items
    }

    fn persist(&mut self) {
        if self.degraded {
            return;
        }
        let result = serde_json::to_string(&self.items)
            .map_err(|e| StorageError::Unavailable(format!("cannot encode cart: {e}")))
            .and_then(|json| self.storage.set_item(CART_KEY, &json));

        if let Err(e) = result {
            tracing::warn!(error = %e, "Cart write failed, continuing in memory");
            self.warnings.push(StorageWarning::from_error(&e));
            self.degraded = true;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn cookies() -> LineItem {
        LineItem::new("Chocolate Chip Cookies", Price::dollars(20), 2).with_size("dozen")
    }

    fn sugar_gf() -> LineItem {
        LineItem::new("Sugar Cookies", Price::dollars(12), 1)
            .with_size("1/2 dozen")
            .with_dietary(true, false)
    }

    #[test]
    fn test_totals_half_deposit() {
        let t = totals(&[cookies()], Price::ZERO);
        assert_eq!(t.subtotal, Price::dollars(40));
        assert_eq!(t.total, Price::dollars(40));
        assert_eq!(t.deposit, Price::dollars(20));
        assert_eq!(t.balance, Price::dollars(20));
        assert_eq!(t.subtotal.display(), "$40.00");
    }

    #[test]
    fn test_totals_with_shipping_and_odd_cents() {
        let items = [LineItem::new("Fudge", Price::from_cents(1001), 1)];
        let t = totals(&items, Price::dollars(15));
        assert_eq!(t.total, Price::from_cents(2501));
        assert_eq!(t.deposit + t.balance, t.total);
        assert_eq!(t.deposit, t.total.half());
    }

    #[test]
    fn test_totals_empty_cart() {
        let t = totals(&[], Price::ZERO);
        assert_eq!(t.total, Price::ZERO);
        assert_eq!(t.deposit, Price::ZERO);
    }

    #[test]
    fn test_add_same_item_twice_merges() {
        let mut store = CartStore::new(MemoryStore::new());
        assert_eq!(store.add_item(sugar_gf()).unwrap(), AddOutcome::Added { index: 0 });
        assert_eq!(
            store.add_item(sugar_gf()).unwrap(),
            AddOutcome::Merged {
                index: 0,
                quantity: 2
            }
        );

        let cart = store.get_cart();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].quantity, 2);
        assert!(cart[0].is_gf);
    }

    #[test]
    fn test_dietary_flags_keep_lines_separate() {
        let mut store = CartStore::new(MemoryStore::new());
        store.add_item(sugar_gf()).unwrap();
        store
            .add_item(sugar_gf().with_dietary(false, false))
            .unwrap();
        store
            .add_item(sugar_gf().with_size("dozen"))
            .unwrap();
        assert_eq!(store.get_cart().len(), 3);
        assert_eq!(store.item_count(), 3);
    }

    #[test]
    fn test_add_rejects_invalid_candidates() {
        let mut store = CartStore::new(MemoryStore::new());
        assert_eq!(
            store.add_item(LineItem::new("  ", Price::dollars(1), 1)),
            Err(CartError::EmptyName)
        );
        assert_eq!(
            store.add_item(LineItem::new("Pie", Price::ZERO, 1)),
            Err(CartError::NonPositivePrice)
        );
        assert!(matches!(
            store.add_item(LineItem::new("Pie", Price::dollars(5), 0)),
            Err(CartError::InvalidQuantity(_))
        ));
        assert!(store.get_cart().is_empty());
    }

    #[test]
    fn test_price_ceiling_keeps_totals_in_range() {
        let mut store = CartStore::new(MemoryStore::new());
        let err = store
            .add_item(LineItem::new("Pie", Price::from_cents(1_000_001), 1))
            .unwrap_err();
        assert_eq!(err.to_string(), "price must be at most $10000.00");

        let ceiling = Price::dollars(MAX_UNIT_PRICE_DOLLARS);
        store.add_item(LineItem::new("Pie", ceiling, u32::MAX)).unwrap();
        store.add_item(LineItem::new("Pie", ceiling, u32::MAX)).unwrap();
        let items = store.get_cart();
        assert_eq!(items[0].quantity, u32::MAX);
        let t = totals(&items, ceiling);
        assert_eq!(t.deposit + t.balance, t.total);
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("3"), Ok(3));
        assert_eq!(parse_quantity(" 10 "), Ok(10));
        for bad in ["1.5", "abc", "0", "-2", ""] {
            assert!(
                matches!(parse_quantity(bad), Err(CartError::InvalidQuantity(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_update_quantity_to_zero_removes() {
        let mut store = CartStore::new(MemoryStore::new());
        store.add_item(cookies()).unwrap();
        store.add_item(sugar_gf()).unwrap();

        assert_eq!(
            store.update_quantity(0, 1).unwrap(),
            QuantityChange::Updated { quantity: 3 }
        );
        let change = store.update_quantity(1, -1).unwrap();
        assert!(matches!(change, QuantityChange::Removed(ref item) if item.name == "Sugar Cookies"));
        assert_eq!(store.get_cart().len(), 1);

        assert!(matches!(
            store.update_quantity(5, 1),
            Err(CartError::IndexOutOfRange { index: 5, len: 1 })
        ));
    }

    #[test]
    fn test_remove_and_clear_return_items() {
        let mut store = CartStore::new(MemoryStore::new());
        store.add_item(cookies()).unwrap();
        store.add_item(sugar_gf()).unwrap();

        let removed = store.remove_item(0).unwrap();
        assert_eq!(removed.name, "Chocolate Chip Cookies");

        let cleared = store.clear();
        assert_eq!(cleared.len(), 1);
        assert!(store.get_cart().is_empty());
        assert_eq!(store.item_count(), 0);
    }

    #[test]
    fn test_restore_removed_item_at_original_index() {
        let mut store = CartStore::new(MemoryStore::new());
        store.add_item(cookies()).unwrap();
        store.add_item(sugar_gf()).unwrap();

        let item = store.remove_item(0).unwrap();
        store.restore(UndoAction::RemovedItem { index: 0, item });
        let cart = store.get_cart();
        assert_eq!(cart[0].name, "Chocolate Chip Cookies");
        assert_eq!(cart[1].name, "Sugar Cookies");
    }

    #[test]
    fn test_restore_cleared_cart_merges() {
        let mut store = CartStore::new(MemoryStore::new());
        store.add_item(cookies()).unwrap();
        let items = store.clear();
        store.add_item(cookies()).unwrap();

        store.restore(UndoAction::ClearedCart { items });
        let cart = store.get_cart();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].quantity, 4);
    }

    #[test]
    fn test_corrupted_storage_resets() {
        let storage = MemoryStore::new().with_item(CART_KEY, "{{{not json");
        let mut store = CartStore::new(storage);
        assert!(store.get_cart().is_empty());
        assert_eq!(store.into_storage().get_item(CART_KEY).unwrap(), None);

        let storage = MemoryStore::new().with_item(CART_KEY, r#"{"name": "x"}"#);
        assert!(CartStore::new(storage).get_cart().is_empty());
    }

    #[test]
    fn test_sanitize_drops_invalid_items() {
        let raw = r#"[
            {"name": "Good", "price": 5, "quantity": 1},
            {"name": "", "price": 5, "quantity": 1},
            {"price": 5, "quantity": 1},
            {"name": "Free", "price": 0, "quantity": 1},
            {"name": "None", "price": 5, "quantity": 0},
            {"name": "Half", "price": 5, "quantity": 1.5},
            {"name": "Neg", "price": 5, "quantity": -1},
            {"name": "Gold", "price": 1e25, "quantity": 4000000000},
            "garbage"
        ]"#;
        let mut store = CartStore::new(MemoryStore::new().with_item(CART_KEY, raw));
        let cart = store.get_cart();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].name, "Good");
    }

    #[test]
    fn test_sanitize_strips_and_truncates() {
        let long = "x".repeat(150);
        let raw = serde_json::json!([
            {"name": "<script>alert('hi')</script>Fudge", "size": "1/2 dozen\u{0007}", "price": 5, "quantity": 1},
            {"name": long, "size": "y".repeat(80), "price": 5, "quantity": 1}
        ])
        .to_string();
        let mut store = CartStore::new(MemoryStore::new().with_item(CART_KEY, raw));
        let cart = store.get_cart();

        assert_eq!(cart[0].name, "scriptalert(hi)/scriptFudge");
        assert_eq!(cart[0].size.as_deref(), Some("1/2 dozen"));
        assert_eq!(cart[1].name.chars().count(), MAX_NAME_CHARS);
        assert_eq!(cart[1].size.as_ref().unwrap().chars().count(), MAX_SIZE_CHARS);
    }

    #[test]
    fn test_legacy_dietary_keys_accepted() {
        let raw = r#"[{"name": "Brownies", "price": 18, "quantity": 1, "glutenFree": true, "sugarFree": true}]"#;
        let mut store = CartStore::new(MemoryStore::new().with_item(CART_KEY, raw));
        let cart = store.get_cart();
        assert!(cart[0].is_gf && cart[0].is_sf);

        let json = serde_json::to_value(&cart[0]).unwrap();
        assert_eq!(json["isGF"], true);
        assert_eq!(json["isSF"], true);
    }

    #[test]
    fn test_persisted_between_stores() {
        let mut store = CartStore::new(MemoryStore::new());
        store.add_item(cookies()).unwrap();
        let storage = store.into_storage();

        let mut reopened = CartStore::new(storage);
        assert_eq!(reopened.get_cart(), vec![cookies()]);
    }

    #[test]
    fn test_quota_failure_keeps_memory_cart() {
        let mut store = CartStore::new(MemoryStore::with_quota(40));
        store.add_item(cookies()).unwrap();

        assert!(store.is_degraded());
        let warnings = store.take_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("too large"));

        store.add_item(cookies()).unwrap();
        let cart = store.get_cart();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].quantity, 4);
        assert!(store.take_warnings().is_empty());
    }

    #[test]
    fn test_unsaved_cart_never_writes() {
        let mut store = CartStore::unsaved(MemoryStore::new(), vec![cookies()]);
        assert!(store.is_degraded());
        store.add_item(sugar_gf()).unwrap();
        assert_eq!(store.get_cart().len(), 2);
        assert!(store.take_warnings().is_empty());

        let mut storage = store.into_storage();
        assert_eq!(storage.take(CART_KEY), None);
    }

    #[test]
    fn test_disabled_storage_works_in_memory() {
        let mut store = CartStore::new(MemoryStore::disabled());
        assert!(store.get_cart().is_empty());
        store.add_item(sugar_gf()).unwrap();
        assert_eq!(store.item_count(), 1);
        assert!(store.take_warnings()[0].message.contains("unavailable"));
    }

    #[test]
    fn test_label() {
        assert_eq!(sugar_gf().label(), "Sugar Cookies (1/2 dozen) [GF]");
        assert_eq!(
            LineItem::new("Fudge", Price::dollars(9), 1)
                .with_dietary(true, true)
                .label(),
            "Fudge [GF, SF]"
        );
        assert_eq!(LineItem::new("Pie", Price::dollars(9), 1).label(), "Pie");
    }
}
