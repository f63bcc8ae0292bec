//! Catalog document model.
//!
//! The catalog is a hand-edited JSON file (`products-data.json`) listing the
//! bakery's products plus global reference data: dietary surcharges, payment
//! method blurbs and per-ZIP shipping overrides. Reading is deliberately
//! forgiving: only the `products` array is required, unknown fields are kept
//! for round-trips, and bad sizes are defaulted by [`Catalog::normalize`]
//! rather than rejected. [`Catalog::validate`] reports the same problems for
//! tools that want to fix the file instead.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::site_config::SiteConfig;
use crate::types::{Price, ProductId};

/// Price assigned to sizes whose price is missing or not positive.
pub const DEFAULT_PRICE_DOLLARS: i64 = 20;

/// Size name used when a product lists no sizes at all.
pub const DEFAULT_SIZE_NAME: &str = "Regular";

/// Errors raised while parsing a catalog document.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The document is not valid JSON, or a field has the wrong type.
    #[error("invalid catalog JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The document has no `products` array.
    #[error("catalog has no products array")]
    MissingProducts,
}

// =============================================================================
// Product
// =============================================================================

/// Product category.
///
/// The five menu categories are named; anything else is kept verbatim so a
/// new category in the JSON file shows up without a code change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    #[default]
    Cookies,
    Cakes,
    Pies,
    Breads,
    Candy,
    Other(String),
}

impl Category {
    /// The named menu categories, in menu order.
    pub const MENU: [Self; 5] = [
        Self::Cookies,
        Self::Cakes,
        Self::Pies,
        Self::Breads,
        Self::Candy,
    ];

    /// Slug used in JSON and URLs.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Cookies => "cookies",
            Self::Cakes => "cakes",
            Self::Pies => "pies",
            Self::Breads => "breads",
            Self::Candy => "candy",
            Self::Other(s) => s,
        }
    }

    /// Heading shown on the menu.
    #[must_use]
    pub fn label(&self) -> String {
        let slug = self.as_str();
        let mut chars = slug.chars();
        chars.next().map_or_else(String::new, |first| {
            first.to_uppercase().chain(chars).collect()
        })
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "cookies" => Self::Cookies,
            "cakes" => Self::Cakes,
            "pies" => Self::Pies,
            "breads" => Self::Breads,
            "candy" => Self::Candy,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        Self::from(s.to_owned())
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.as_str().to_owned()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free text or a list of strings. Older catalog files use both shapes for
/// `ingredients` and `allergens`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextList {
    Text(String),
    List(Vec<String>),
}

impl TextList {
    /// Display form, list entries joined with commas.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::List(items) => items.join(", "),
        }
    }

    /// True when there is nothing to show.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::List(items) => items.iter().all(|i| i.trim().is_empty()),
        }
    }
}

/// One purchasable size of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub name: String,
    /// A missing or `null` price reads as zero; [`Catalog::normalize`]
    /// then resets it to the default.
    #[serde(default, deserialize_with = "price_or_zero")]
    pub price: Price,
}

fn price_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Price, D::Error> {
    Ok(Option::<Price>::deserialize(deserializer)?.unwrap_or(Price::ZERO))
}

/// Dietary substitutions a product offers.
///
/// `vegan` is no longer offered in the cart; it is kept so catalog files
/// round-trip unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dietary {
    pub gluten_free: bool,
    pub sugar_free: bool,
    pub vegan: bool,
}

/// Optional per-product shipping data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductShipping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_shipping_cost: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_pound_rate: Option<Price>,
    /// Weight of one unit in pounds.
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub weight_lbs: Option<Decimal>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(b: &bool) -> bool {
    !*b
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default = "empty_id")]
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub sizes: Vec<Size>,
    #[serde(default)]
    pub dietary: Dietary,
    #[serde(default)]
    pub shippable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping: Option<ProductShipping>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub sold_out: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingredients: Option<TextList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allergens: Option<TextList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub featured: bool,
    /// Fields this model does not know about, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn empty_id() -> ProductId {
    ProductId::new("")
}

impl Product {
    /// A blank product with one size at the default price.
    #[must_use]
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tier: None,
            category: Category::default(),
            description: String::new(),
            image: None,
            sizes: vec![Size {
                name: DEFAULT_SIZE_NAME.to_owned(),
                price: Price::dollars(DEFAULT_PRICE_DOLLARS),
            }],
            dietary: Dietary::default(),
            shippable: false,
            shipping: None,
            sold_out: false,
            ingredients: None,
            allergens: None,
            emoji: None,
            featured: false,
            extra: Map::new(),
        }
    }

    /// The first listed size, which is the base size and price.
    #[must_use]
    pub fn base_size(&self) -> Option<&Size> {
        self.sizes.first()
    }

    /// Price range across all sizes: `"$20"` when every size costs the same,
    /// otherwise `"$12-$20"`.
    #[must_use]
    pub fn price_display(&self) -> String {
        let prices = self.sizes.iter().map(|s| s.price);
        let (Some(min), Some(max)) = (prices.clone().min(), prices.max()) else {
            return String::new();
        };
        if min == max {
            min.display_short()
        } else {
            format!("{}-{}", min.display_short(), max.display_short())
        }
    }

    /// Per-unit shipping weight, if the catalog specifies one.
    #[must_use]
    pub fn weight_lbs(&self) -> Option<Decimal> {
        self.shipping.as_ref().and_then(|s| s.weight_lbs)
    }

    /// Problems with this product, as human-readable messages.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.id.as_str().trim().is_empty() {
            errors.push("id is required".to_owned());
        }
        if self.name.trim().is_empty() {
            errors.push("name is required".to_owned());
        }
        if self.sizes.is_empty() {
            errors.push("at least one size is required".to_owned());
        }
        for (i, size) in self.sizes.iter().enumerate() {
            if size.name.trim().is_empty() {
                errors.push(format!("size {} has no name", i + 1));
            }
            if !size.price.is_positive() {
                errors.push(format!(
                    "size {} ({}) must have a price above zero",
                    i + 1,
                    size.name
                ));
            }
        }
        if let Some(weight) = self.weight_lbs()
            && weight <= Decimal::ZERO
        {
            errors.push("shipping weight must be above zero".to_owned());
        }
        errors
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Dietary surcharges in dollars, added to the unit price when the option is
/// selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DietaryPricing {
    pub gluten_free: Price,
    pub sugar_free: Price,
    pub vegan: Price,
}

/// Display text for one payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodInfo {
    pub name: String,
    pub instructions: String,
}

/// The whole catalog document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub products: Vec<Product>,
    #[serde(default)]
    pub dietary_pricing: DietaryPricing,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub payment_methods: BTreeMap<String, PaymentMethodInfo>,
    /// Flat shipping cost overrides keyed by exact 5-digit ZIP.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub shipping_zones: BTreeMap<String, Price>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

/// A validation problem found in one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Position in the product list.
    pub index: usize,
    /// Product id, or `"#<index>"` when it has none.
    pub product: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.product, self.message)
    }
}

impl Catalog {
    /// Parse and normalize a catalog document.
    ///
    /// Accepts either the full document object or a bare array of products.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not JSON, has no product array, or a
    /// product field has an unusable type.
    pub fn parse(text: &str) -> Result<Self, CatalogError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Like [`Catalog::parse`], from an already decoded JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no product array or a field has an
    /// unusable type.
    pub fn from_value(value: Value) -> Result<Self, CatalogError> {
        Self::from_value_with_fixes(value).map(|(catalog, _)| catalog)
    }

    /// Like [`Catalog::from_value`], also returning what [`Catalog::normalize`]
    /// changed.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no product array or a field has an
    /// unusable type.
    pub fn from_value_with_fixes(value: Value) -> Result<(Self, Vec<String>), CatalogError> {
        let has_products = value.get("products").is_some_and(Value::is_array);
        let mut catalog: Self = if value.is_array() {
            Self {
                products: serde_json::from_value(value)?,
                ..Self::empty()
            }
        } else if has_products {
            serde_json::from_value(value)?
        } else {
            return Err(CatalogError::MissingProducts);
        };
        let fixes = catalog.normalize();
        Ok((catalog, fixes))
    }

    /// A catalog with no products.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            schema_version: None,
            version: None,
            products: Vec::new(),
            dietary_pricing: DietaryPricing::default(),
            payment_methods: BTreeMap::new(),
            shipping_zones: BTreeMap::new(),
            metadata: Map::new(),
        }
    }

    /// The single-product catalog served when the real one cannot be loaded.
    #[must_use]
    pub fn sample() -> Self {
        let mut product = Product::new("sample-chocolate-chip", "Chocolate Chip Cookies");
        product.description =
            "Classic cookies loaded with chocolate chips. Soft and chewy.".to_owned();
        product.sizes = vec![
            Size {
                name: "1/2 dozen".to_owned(),
                price: Price::dollars(12),
            },
            Size {
                name: "dozen".to_owned(),
                price: Price::dollars(20),
            },
        ];
        product.dietary = Dietary {
            gluten_free: true,
            sugar_free: true,
            vegan: false,
        };
        product.emoji = Some("🍪".to_owned());

        Self {
            products: vec![product],
            dietary_pricing: DietaryPricing {
                gluten_free: Price::dollars(3),
                sugar_free: Price::dollars(3),
                vegan: Price::dollars(2),
            },
            ..Self::empty()
        }
    }

    /// Default missing or invalid data in place and return what was changed.
    ///
    /// - a product without an id gets one derived from its name
    /// - a product without sizes gets one `Regular` size at the default price
    /// - a size whose price is not positive is reset to the default price
    pub fn normalize(&mut self) -> Vec<String> {
        let mut fixes = Vec::new();
        for (index, product) in self.products.iter_mut().enumerate() {
            if product.id.as_str().trim().is_empty() {
                let slug = slugify(&product.name);
                let id = if slug.is_empty() {
                    format!("product-{}", index + 1)
                } else {
                    slug
                };
                fixes.push(format!("product #{index} had no id, using {id}"));
                product.id = ProductId::new(id);
            }
            if product.sizes.is_empty() {
                fixes.push(format!(
                    "{} had no sizes, added {DEFAULT_SIZE_NAME} at ${DEFAULT_PRICE_DOLLARS}",
                    product.id
                ));
                product.sizes.push(Size {
                    name: DEFAULT_SIZE_NAME.to_owned(),
                    price: Price::dollars(DEFAULT_PRICE_DOLLARS),
                });
            }
            for size in &mut product.sizes {
                if !size.price.is_positive() {
                    fixes.push(format!(
                        "{} size {:?} had price {}, reset to ${DEFAULT_PRICE_DOLLARS}",
                        product.id, size.name, size.price
                    ));
                    size.price = Price::dollars(DEFAULT_PRICE_DOLLARS);
                }
            }
        }
        for fix in &fixes {
            tracing::warn!(fix = %fix, "Catalog data defaulted");
        }
        fixes
    }

    /// Report problems without changing anything.
    #[must_use]
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();
        for (index, product) in self.products.iter().enumerate() {
            let label = if product.id.as_str().is_empty() {
                format!("#{index}")
            } else {
                product.id.to_string()
            };
            for message in product.validate() {
                issues.push(ValidationIssue {
                    index,
                    product: label.clone(),
                    message,
                });
            }
            if !product.id.as_str().is_empty() && !seen.insert(product.id.as_str()) {
                issues.push(ValidationIssue {
                    index,
                    product: label.clone(),
                    message: "duplicate id".to_owned(),
                });
            }
        }
        issues
    }

    /// Look up a product by id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id.as_str() == id)
    }

    /// Products in one category, or all of them.
    #[must_use]
    pub fn in_category(&self, category: Option<&Category>) -> Vec<&Product> {
        self.products
            .iter()
            .filter(|p| category.is_none_or(|c| &p.category == c))
            .collect()
    }

    /// Mark products listed in the site configuration as sold out.
    ///
    /// A product flagged sold out in the catalog file itself stays sold out.
    pub fn apply_site_config(&mut self, config: &SiteConfig) {
        for product in &mut self.products {
            product.sold_out = product.sold_out || config.is_sold_out(&product.id);
        }
    }

    /// Stamp `version` and `metadata.lastUpdated` with `now`.
    pub fn stamp(&mut self, now: DateTime<Utc>) {
        let stamp = now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        self.version = Some(stamp.clone());
        self.metadata
            .insert("lastUpdated".to_owned(), Value::String(stamp));
    }

    /// Pretty-printed JSON, two-space indented.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Lowercase ASCII slug: runs of anything but letters and digits become `-`.
#[must_use]
pub fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
