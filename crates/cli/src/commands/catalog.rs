//! Catalog file maintenance commands.
//!
//! # Usage
//!
//! ```bash
//! # Report defaulted data and validation problems
//! yfhs catalog validate data/products-data.json
//!
//! # Drop legacy per-variant fields and stamp the version
//! yfhs catalog cleanup data/products-data.json --dry-run
//! yfhs catalog cleanup data/products-data.json
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use farmhouse_core::catalog::{Catalog, CatalogError};
use serde_json::{Map, Value};
use thiserror::Error;

/// Product fields the card layout no longer shows.
const LEGACY_FIELDS: &[&str] = &["variantIngredients", "variantAllergens"];

/// Errors from catalog commands.
#[derive(Debug, Error)]
pub enum CatalogCommandError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("cannot write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("catalog has {0} problem(s)")]
    Invalid(usize),
}

fn read(path: &Path) -> Result<String, CatalogCommandError> {
    std::fs::read_to_string(path).map_err(|source| CatalogCommandError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Print defaulted data and validation problems.
///
/// # Errors
///
/// Returns [`CatalogCommandError::Invalid`] when validation finds problems,
/// so the process exits non-zero.
pub fn validate(path: &Path, out: &mut impl Write) -> Result<(), CatalogCommandError> {
    let value: Value = serde_json::from_str(&read(path)?).map_err(CatalogError::from)?;
    let (catalog, fixes) = Catalog::from_value_with_fixes(value)?;

    for fix in &fixes {
        writeln!(out, "warning: {fix}")?;
    }

    let issues = catalog.validate();
    for issue in &issues {
        writeln!(out, "error: {} (#{}): {}", issue.product, issue.index, issue.message)?;
    }

    writeln!(
        out,
        "{}: {} products, {} warning(s), {} problem(s)",
        path.display(),
        catalog.products.len(),
        fixes.len(),
        issues.len()
    )?;

    if issues.is_empty() {
        Ok(())
    } else {
        Err(CatalogCommandError::Invalid(issues.len()))
    }
}

/// What [`cleanup_value`] changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub products: usize,
    /// Products that had at least one legacy field.
    pub cleaned: usize,
}

/// Remove legacy fields from every product and stamp `version` and
/// `metadata.lastUpdated`. Every other field is left as it was.
///
/// # Errors
///
/// Returns an error if the document has no `products` array.
pub fn cleanup_value(
    document: &mut Value,
    now: DateTime<Utc>,
) -> Result<CleanupReport, CatalogCommandError> {
    let Some(object) = document.as_object_mut() else {
        return Err(CatalogError::MissingProducts.into());
    };
    let Some(products) = object.get_mut("products").and_then(Value::as_array_mut) else {
        return Err(CatalogError::MissingProducts.into());
    };

    let mut cleaned = 0;
    for product in products.iter_mut().filter_map(Value::as_object_mut) {
        let mut had_legacy = false;
        for field in LEGACY_FIELDS {
            had_legacy |= product.remove(*field).is_some();
        }
        if had_legacy {
            cleaned += 1;
        }
    }
    let report = CleanupReport {
        products: products.len(),
        cleaned,
    };

    let stamp = Value::String(now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true));
    object.insert("version".to_owned(), stamp.clone());
    let metadata = object
        .entry("metadata")
        .or_insert_with(|| Value::Object(Map::new()));
    if !metadata.is_object() {
        *metadata = Value::Object(Map::new());
    }
    if let Some(metadata) = metadata.as_object_mut() {
        metadata.insert("lastUpdated".to_owned(), stamp);
    }

    Ok(report)
}

/// Clean up the catalog file at `path`, rewriting it unless `dry_run`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or written.
pub fn cleanup(
    path: &Path,
    dry_run: bool,
    now: DateTime<Utc>,
    out: &mut impl Write,
) -> Result<CleanupReport, CatalogCommandError> {
    let mut document: Value = serde_json::from_str(&read(path)?).map_err(CatalogError::from)?;
    let report = cleanup_value(&mut document, now)?;

    writeln!(
        out,
        "{} products, {} cleaned (removed {})",
        report.products,
        report.cleaned,
        LEGACY_FIELDS.join(", ")
    )?;

    if dry_run {
        writeln!(out, "dry run: {} not modified", path.display())?;
        return Ok(report);
    }

    let json = serde_json::to_string_pretty(&document).map_err(CatalogError::from)?;
    std::fs::write(path, json).map_err(|source| CatalogCommandError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), cleaned = report.cleaned, "Catalog rewritten");
    writeln!(out, "wrote {}", path.display())?;
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 15, 9, 26).unwrap()
    }

    fn document() -> Value {
        json!({
            "schemaVersion": 2,
            "products": [
                {
                    "id": "chocolate-chip-cookies",
                    "name": "Chocolate Chip Cookies",
                    "variantIngredients": {"gf": "rice flour"},
                    "variantAllergens": {"gf": "none"},
                    "customField": "kept"
                },
                {"id": "apple-pie", "name": "Apple Pie", "variantAllergens": {}},
                {"id": "fudge", "name": "Fudge"}
            ],
            "metadata": {"author": "kitchen"}
        })
    }

    #[test]
    fn test_cleanup_value_removes_legacy_fields_only() {
        let mut doc = document();
        let report = cleanup_value(&mut doc, now()).unwrap();

        assert_eq!(report, CleanupReport { products: 3, cleaned: 2 });
        let first = &doc["products"][0];
        assert!(first.get("variantIngredients").is_none());
        assert!(first.get("variantAllergens").is_none());
        assert_eq!(first["customField"], "kept");
        assert_eq!(doc["schemaVersion"], 2);
        assert_eq!(doc["metadata"]["author"], "kitchen");
        assert_eq!(doc["version"], "2025-03-14T15:09:26.000Z");
        assert_eq!(doc["metadata"]["lastUpdated"], "2025-03-14T15:09:26.000Z");
    }

    #[test]
    fn test_cleanup_value_creates_metadata() {
        let mut doc = json!({"products": [], "metadata": "junk"});
        cleanup_value(&mut doc, now()).unwrap();
        assert_eq!(doc["metadata"]["lastUpdated"], "2025-03-14T15:09:26.000Z");
    }

    #[test]
    fn test_cleanup_value_requires_products() {
        let mut doc = json!([{"id": "a"}]);
        assert!(matches!(
            cleanup_value(&mut doc, now()),
            Err(CatalogCommandError::Catalog(CatalogError::MissingProducts))
        ));
    }

    #[test]
    fn test_cleanup_file_and_dry_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products-data.json");
        let original = serde_json::to_string_pretty(&document()).unwrap();
        std::fs::write(&path, &original).unwrap();

        let mut out = Vec::new();
        cleanup(&path, true, now(), &mut out).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
        assert!(String::from_utf8(out).unwrap().contains("dry run"));

        let mut out = Vec::new();
        let report = cleanup(&path, false, now(), &mut out).unwrap();
        assert_eq!(report.cleaned, 2);
        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(written["products"][1].get("variantAllergens").is_none());
    }

    #[test]
    fn test_validate_reports_problems() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"{"products": [
                {"id": "pie", "name": "Pie", "sizes": [{"name": "whole", "price": 0}]},
                {"id": "pie", "name": "Other Pie", "sizes": [{"name": "whole", "price": 20}]}
            ]}"#,
        )
        .unwrap();

        let mut out = Vec::new();
        let err = validate(&path, &mut out).unwrap_err();
        assert!(matches!(err, CatalogCommandError::Invalid(1)));

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("warning: pie size"));
        assert!(text.contains("duplicate id"));
    }

    #[test]
    fn test_validate_clean_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, Catalog::sample().to_pretty_json().unwrap()).unwrap();

        let mut out = Vec::new();
        validate(&path, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("1 products, 0 warning(s), 0 problem(s)"));
    }

    #[test]
    fn test_validate_missing_file() {
        let mut out = Vec::new();
        let err = validate(Path::new("/nonexistent/catalog.json"), &mut out).unwrap_err();
        assert!(matches!(err, CatalogCommandError::Read { .. }));
    }
}
