//! Catalog editor working copy.
//!
//! The editor loads the catalog file once per admin session and keeps every
//! edit in a working copy stored in the session. Nothing here writes the
//! catalog file: the result leaves the server only as a downloaded
//! `products-data.json`, which a person uploads to the site.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use farmhouse_core::Price;
use farmhouse_core::catalog::{
    Catalog, CatalogError, Category, DietaryPricing, Product, Size, TextList, ValidationIssue,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Session key for the working copy.
pub const WORKING_COPY_KEY: &str = "admin_catalog";

/// Largest image accepted for upload.
pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

/// File name of the downloaded catalog.
pub const DOWNLOAD_FILENAME: &str = "products-data.json";

/// Editor errors.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("no product at position {index} (the catalog has {len})")]
    NoSuchProduct { index: usize, len: usize },

    #[error("size line {0:?} must look like `name:price`")]
    InvalidSize(String),

    #[error("{0:?} is not a valid price")]
    InvalidPrice(String),

    #[error("size {0:?} needs a price above $0")]
    FreeSize(String),

    #[error("a product needs at least one size")]
    NoSizes,

    #[error("{0:?} is not an image type")]
    NotAnImage(String),

    #[error("image is {size} bytes; the limit is {max} bytes")]
    ImageTooLarge { size: usize, max: usize },

    #[error("cannot serialize catalog: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Form fields for one product.
///
/// Checkbox fields are true when present with any value other than
/// `false`/`0`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductPatch {
    pub name: String,
    pub category: String,
    pub description: String,
    pub ingredients: String,
    pub allergens: String,
    /// One `name:price` pair per line, e.g. `1/2 dozen:12`.
    pub sizes: String,
    #[serde(deserialize_with = "checkbox")]
    pub gluten_free: bool,
    #[serde(deserialize_with = "checkbox")]
    pub sugar_free: bool,
    #[serde(deserialize_with = "checkbox")]
    pub vegan: bool,
    #[serde(deserialize_with = "checkbox")]
    pub shippable: bool,
    #[serde(deserialize_with = "checkbox")]
    pub featured: bool,
    /// Image file name or URL. Blank keeps an uploaded image.
    pub image: String,
    #[serde(deserialize_with = "checkbox")]
    pub remove_image: bool,
}

pub(crate) fn checkbox<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = String::deserialize(deserializer)?;
    let value = value.trim();
    Ok(!value.is_empty() && value != "false" && value != "0")
}

/// Parse `name:price` lines into sizes.
///
/// The price follows the last `:` and may carry a `$`. Blank lines are
/// skipped.
///
/// # Errors
///
/// Returns an error for a line without a `:`, an unparseable or zero price,
/// or when no sizes remain.
pub fn parse_sizes(text: &str) -> Result<Vec<Size>, EditorError> {
    let sizes = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let (name, price) = line
                .rsplit_once(':')
                .ok_or_else(|| EditorError::InvalidSize(line.to_string()))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(EditorError::InvalidSize(line.to_string()));
            }
            let price = parse_price(price)?;
            if !price.is_positive() {
                return Err(EditorError::FreeSize(name.to_string()));
            }
            Ok(Size {
                name: name.to_string(),
                price,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if sizes.is_empty() {
        return Err(EditorError::NoSizes);
    }
    Ok(sizes)
}

/// Parse a non-negative dollar amount, with or without a leading `$`.
///
/// # Errors
///
/// Returns [`EditorError::InvalidPrice`] for anything else.
pub fn parse_price(text: &str) -> Result<Price, EditorError> {
    let text = text.trim();
    Decimal::from_str(text.trim_start_matches('$'))
        .ok()
        .filter(|amount| !amount.is_sign_negative())
        .map(Price::new)
        .ok_or_else(|| EditorError::InvalidPrice(text.to_string()))
}

/// Sizes as the editor shows them, one `name:price` per line.
#[must_use]
pub fn format_sizes(sizes: &[Size]) -> String {
    sizes
        .iter()
        .map(|s| format!("{}:{}", s.name, s.price.plain()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Replace a text list from form input, keeping the list shape when the
/// product already used one.
fn text_list(input: &str, previous: Option<&TextList>) -> Option<TextList> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    Some(match previous {
        Some(TextList::List(_)) => TextList::List(
            input
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        ),
        _ => TextList::Text(input.to_string()),
    })
}

/// The editor's working copy of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEditor {
    catalog: Catalog,
    /// Edited since it was loaded.
    dirty: bool,
}

impl CatalogEditor {
    /// Start editing `catalog`.
    #[must_use]
    pub const fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            dirty: false,
        }
    }

    /// Load the catalog file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a catalog.
    pub async fn load(path: &Path) -> Result<Self, EditorError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| EditorError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let catalog = Catalog::parse(&text)?;
        tracing::info!(path = %path.display(), products = catalog.products.len(), "Catalog loaded for editing");
        Ok(Self::new(catalog))
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.catalog.products
    }

    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn product_mut(&mut self, index: usize) -> Result<&mut Product, EditorError> {
        let len = self.catalog.products.len();
        self.catalog
            .products
            .get_mut(index)
            .ok_or(EditorError::NoSuchProduct { index, len })
    }

    /// Apply form fields to the product at `index`.
    ///
    /// Nothing changes when a field fails to parse.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown index or malformed sizes.
    pub fn update(&mut self, index: usize, patch: ProductPatch) -> Result<(), EditorError> {
        let sizes = parse_sizes(&patch.sizes)?;
        let product = self.product_mut(index)?;

        product.name = patch.name.trim().to_string();
        if !patch.category.trim().is_empty() {
            product.category = Category::from(patch.category.trim());
        }
        product.description = patch.description.trim().to_string();
        product.ingredients = text_list(&patch.ingredients, product.ingredients.as_ref());
        product.allergens = text_list(&patch.allergens, product.allergens.as_ref());
        product.sizes = sizes;
        product.dietary.gluten_free = patch.gluten_free;
        product.dietary.sugar_free = patch.sugar_free;
        product.dietary.vegan = patch.vegan;
        product.shippable = patch.shippable;
        product.featured = patch.featured;

        let image = patch.image.trim();
        let uploaded = product.image.as_deref().is_some_and(|i| i.starts_with("data:"));
        if patch.remove_image {
            product.image = None;
        } else if !image.is_empty() {
            product.image = Some(image.to_string());
        } else if !uploaded {
            product.image = None;
        }

        tracing::info!(index, product = %product.id, "Product updated");
        self.dirty = true;
        Ok(())
    }

    /// Replace the dietary surcharges.
    pub fn set_dietary_pricing(&mut self, pricing: DietaryPricing) {
        self.catalog.dietary_pricing = pricing;
        self.dirty = true;
    }

    /// Append a placeholder product and return its index.
    pub fn add_product(&mut self, now: DateTime<Utc>) -> usize {
        let mut product = Product::new(
            format!("new-product-{}", now.timestamp_millis()),
            "New Product",
        );
        product.category = Category::Cookies;
        product.sizes = vec![Size {
            name: "dozen".to_string(),
            price: Price::dollars(20),
        }];
        product.description = "Enter product description".to_string();

        self.catalog.products.push(product);
        self.dirty = true;
        self.catalog.products.len() - 1
    }

    /// Remove and return the product at `index`.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown index.
    pub fn delete(&mut self, index: usize) -> Result<Product, EditorError> {
        let len = self.catalog.products.len();
        if index >= len {
            return Err(EditorError::NoSuchProduct { index, len });
        }
        let product = self.catalog.products.remove(index);
        tracing::info!(index, product = %product.id, "Product deleted");
        self.dirty = true;
        Ok(product)
    }

    /// Embed an uploaded image in the product at `index` as a data URI.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown index, a non-image content type, or
    /// an upload over [`MAX_IMAGE_BYTES`].
    pub fn set_image_upload(
        &mut self,
        index: usize,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), EditorError> {
        let content_type = content_type.trim().to_ascii_lowercase();
        if !content_type.starts_with("image/") || content_type.len() <= "image/".len() {
            return Err(EditorError::NotAnImage(content_type));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(EditorError::ImageTooLarge {
                size: bytes.len(),
                max: MAX_IMAGE_BYTES,
            });
        }

        let uri = format!("data:{content_type};base64,{}", BASE64.encode(bytes));
        let product = self.product_mut(index)?;
        product.image = Some(uri);
        tracing::info!(index, product = %product.id, bytes = bytes.len(), "Image uploaded");
        self.dirty = true;
        Ok(())
    }

    /// Problems in the working copy.
    #[must_use]
    pub fn validate(&self) -> Vec<ValidationIssue> {
        self.catalog.validate()
    }

    /// The working copy as a catalog document, stamped with `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self, now: DateTime<Utc>) -> Result<String, EditorError> {
        let mut catalog = self.catalog.clone();
        catalog.stamp(now);
        Ok(catalog.to_pretty_json()?)
    }

    /// A backup of the product list.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn export_backup(&self, now: DateTime<Utc>) -> Result<String, EditorError> {
        let backup = serde_json::json!({
            "products": self.catalog.products,
            "exportDate": now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "totalProducts": self.catalog.products.len(),
        });
        Ok(serde_json::to_string_pretty(&backup)?)
    }
}

/// File name for a backup taken at `now`.
#[must_use]
pub fn backup_filename(now: DateTime<Utc>) -> String {
    format!("farmhouse-products-backup-{}.json", now.format("%Y-%m-%d"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn editor() -> CatalogEditor {
        CatalogEditor::new(Catalog::sample())
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 15, 9, 26).unwrap()
    }

    fn patch() -> ProductPatch {
        ProductPatch {
            name: "  Snickerdoodles ".to_string(),
            category: "cookies".to_string(),
            description: "Cinnamon sugar.".to_string(),
            sizes: "1/2 dozen:12\n\ndozen: $20.50".to_string(),
            gluten_free: true,
            shippable: true,
            image: "snickerdoodles.jpg".to_string(),
            ..ProductPatch::default()
        }
    }

    #[test]
    fn test_parse_sizes() {
        let sizes = parse_sizes("1/2 dozen:12\n dozen : $20.50 \n").unwrap();
        assert_eq!(sizes.len(), 2);
        assert_eq!(sizes[0].name, "1/2 dozen");
        assert_eq!(sizes[0].price, Price::dollars(12));
        assert_eq!(sizes[1].price, Price::from_cents(2050));
    }

    #[test]
    fn test_parse_sizes_errors() {
        assert!(matches!(parse_sizes("dozen"), Err(EditorError::InvalidSize(_))));
        assert!(matches!(parse_sizes("dozen:abc"), Err(EditorError::InvalidPrice(_))));
        assert!(matches!(parse_sizes(":12"), Err(EditorError::InvalidSize(_))));
        assert!(matches!(parse_sizes("  \n "), Err(EditorError::NoSizes)));
    }

    #[test]
    fn test_parse_sizes_rejects_free_size() {
        let err = parse_sizes("1/2 dozen:12\ndozen:$0.00").unwrap_err();
        assert!(matches!(&err, EditorError::FreeSize(name) if name == "dozen"));
        assert_eq!(err.to_string(), "size \"dozen\" needs a price above $0");
        // Surcharges may still be zero.
        assert_eq!(parse_price("0").unwrap(), Price::ZERO);
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price(" $3 ").unwrap(), Price::dollars(3));
        assert_eq!(parse_price("2.50").unwrap(), Price::from_cents(250));
        assert!(parse_price("-1").is_err());
        assert!(parse_price("").is_err());
        assert!(parse_price("free").is_err());
    }

    #[test]
    fn test_format_sizes_round_trips_through_parse() {
        let sizes = parse_sizes("1/2 dozen:12\ndozen:20").unwrap();
        assert_eq!(parse_sizes(&format_sizes(&sizes)).unwrap(), sizes);
    }

    #[test]
    fn test_update_applies_patch() {
        let mut editor = editor();
        editor.update(0, patch()).unwrap();

        let product = &editor.products()[0];
        assert_eq!(product.name, "Snickerdoodles");
        assert_eq!(product.sizes.len(), 2);
        assert!(product.dietary.gluten_free);
        assert!(!product.dietary.sugar_free);
        assert!(product.shippable);
        assert_eq!(product.image.as_deref(), Some("snickerdoodles.jpg"));
        assert!(editor.is_dirty());
    }

    #[test]
    fn test_update_with_bad_sizes_changes_nothing() {
        let mut editor = editor();
        let before = editor.clone();
        let bad = ProductPatch {
            sizes: "dozen".to_string(),
            ..patch()
        };

        assert!(editor.update(0, bad).is_err());
        assert_eq!(editor, before);
    }

    #[test]
    fn test_update_unknown_index() {
        let err = editor().update(7, patch()).unwrap_err();
        assert!(matches!(err, EditorError::NoSuchProduct { index: 7, len: 1 }));
    }

    #[test]
    fn test_update_keeps_uploaded_image_when_field_blank() {
        let mut editor = editor();
        editor.set_image_upload(0, b"\x89PNG", "image/png").unwrap();

        let blank = ProductPatch {
            image: String::new(),
            ..patch()
        };
        editor.update(0, blank.clone()).unwrap();
        assert!(editor.products()[0].image.as_deref().unwrap().starts_with("data:image/png;base64,"));

        let remove = ProductPatch {
            remove_image: true,
            ..blank
        };
        editor.update(0, remove).unwrap();
        assert!(editor.products()[0].image.is_none());
    }

    #[test]
    fn test_text_list_keeps_list_shape() {
        let previous = TextList::List(vec!["flour".to_string()]);
        assert_eq!(
            text_list("flour, sugar ,", Some(&previous)),
            Some(TextList::List(vec!["flour".to_string(), "sugar".to_string()]))
        );
        assert_eq!(
            text_list("flour, sugar", None),
            Some(TextList::Text("flour, sugar".to_string()))
        );
        assert_eq!(text_list("   ", Some(&previous)), None);
    }

    #[test]
    fn test_add_product() {
        let mut editor = editor();
        let index = editor.add_product(now());

        let product = &editor.products()[index];
        assert_eq!(index, 1);
        assert_eq!(product.id.as_str(), format!("new-product-{}", now().timestamp_millis()));
        assert_eq!(product.name, "New Product");
        assert_eq!(product.category, Category::Cookies);
        assert_eq!(product.sizes[0].name, "dozen");
        assert_eq!(product.sizes[0].price, Price::dollars(20));
    }

    #[test]
    fn test_delete() {
        let mut editor = editor();
        let removed = editor.delete(0).unwrap();
        assert_eq!(removed.id.as_str(), "sample-chocolate-chip");
        assert!(editor.products().is_empty());
        assert!(editor.delete(0).is_err());
    }

    #[test]
    fn test_image_upload_limits() {
        let mut editor = editor();
        assert!(matches!(
            editor.set_image_upload(0, b"text", "text/plain"),
            Err(EditorError::NotAnImage(_))
        ));
        assert!(matches!(
            editor.set_image_upload(0, b"x", "image/"),
            Err(EditorError::NotAnImage(_))
        ));

        let big = vec![0_u8; MAX_IMAGE_BYTES + 1];
        assert!(matches!(
            editor.set_image_upload(0, &big, "image/jpeg"),
            Err(EditorError::ImageTooLarge { .. })
        ));
        assert!(!editor.is_dirty());

        editor.set_image_upload(0, b"abc", "Image/JPEG").unwrap();
        assert_eq!(
            editor.products()[0].image.as_deref(),
            Some("data:image/jpeg;base64,YWJj")
        );
    }

    #[test]
    fn test_to_json_is_stamped_and_parseable() {
        let mut editor = editor();
        editor.set_dietary_pricing(DietaryPricing {
            gluten_free: Price::dollars(5),
            ..DietaryPricing::default()
        });

        let json = editor.to_json(now()).unwrap();
        let catalog = Catalog::parse(&json).unwrap();
        assert_eq!(catalog.dietary_pricing.gluten_free, Price::dollars(5));
        assert_eq!(catalog.version.as_deref(), Some("2025-03-14T15:09:26.000Z"));
        assert!(catalog.metadata.contains_key("lastUpdated"));

        // The working copy itself is not stamped.
        assert!(editor.catalog().version.is_none());
    }

    #[test]
    fn test_export_backup() {
        let json = editor().export_backup(now()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["totalProducts"], 1);
        assert_eq!(value["exportDate"], "2025-03-14T15:09:26.000Z");
        assert_eq!(value["products"].as_array().unwrap().len(), 1);
        assert_eq!(backup_filename(now()), "farmhouse-products-backup-2025-03-14.json");
    }

    #[test]
    fn test_validate_reports_problems() {
        let mut editor = editor();
        editor.add_product(now());
        assert!(editor.validate().is_empty());

        let nameless = ProductPatch {
            name: "   ".to_string(),
            ..patch()
        };
        editor.update(1, nameless).unwrap();
        let issues = editor.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].index, 1);
    }

    #[test]
    fn test_checkbox_form_values() {
        let patch: ProductPatch = serde_json::from_value(serde_json::json!({
            "name": "Pie",
            "gluten_free": "on",
            "sugar_free": "false",
            "shippable": "",
        }))
        .unwrap();
        assert!(patch.gluten_free);
        assert!(!patch.sugar_free);
        assert!(!patch.shippable);
        assert!(!patch.featured);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CatalogEditor::load(&dir.path().join("missing.json")).await.unwrap_err();
        assert!(matches!(err, EditorError::Io { .. }));
    }

    #[tokio::test]
    async fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products-data.json");
        std::fs::write(&path, Catalog::sample().to_pretty_json().unwrap()).unwrap();

        let editor = CatalogEditor::load(&path).await.unwrap();
        assert_eq!(editor.products().len(), 1);
        assert!(!editor.is_dirty());
    }
}
