//! Shipping estimator.
//!
//! A quote is built in three steps:
//!
//! 1. The ZIP is validated (`12345` or `12345-6789`) and mapped to a state
//!    through the 3-digit prefix table below. Only the 48 contiguous states
//!    and DC are served; Alaska, Hawaii, territories and military prefixes
//!    are rejected whatever state was typed.
//! 2. The typed state must match the ZIP's state.
//! 3. The base cost is an exact-ZIP override from the catalog, else the local
//!    rate for the bakery's home state, else a band by the ZIP's first digit.
//!    Carts heavier than [`HEAVY_THRESHOLD_LBS`] add a flat surcharge.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::cart::LineItem;
use crate::catalog::Catalog;
use crate::types::Price;

static ZIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{5})(?:-\d{4})?$").expect("Invalid regex"));

/// Carts above this weight pay [`ShippingRates::heavy_surcharge`].
pub const HEAVY_THRESHOLD_LBS: i64 = 3;

/// Per-unit weight of items whose name suggests a heavy bake.
const HEAVY_ITEM_LBS: i64 = 4;

/// Per-unit weight of everything else without a catalog weight.
const LIGHT_ITEM_LBS: i64 = 1;

/// Name fragments treated as heavy when the catalog has no weight.
const HEAVY_KEYWORDS: &[&str] = &["cake", "pie", "bread", "loaf", "crisp"];

/// Regions recognized by the prefix table but not shipped to.
const UNSUPPORTED_REGIONS: &[&str] = &["AK", "HI", "PR", "GU", "AA", "AE", "AP"];

/// State and territory abbreviations accepted as input.
const KNOWN_STATES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "HI", "ID", "IL", "IN",
    "IA", "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH",
    "NJ", "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT",
    "VT", "VA", "WA", "WV", "WI", "WY", "PR", "VI", "GU", "AS", "MP", "AA", "AE", "AP",
];

/// Inclusive 3-digit ZIP prefix ranges and the region they belong to.
const ZIP3_RANGES: &[(u16, u16, &str)] = &[
    (5, 5, "NY"),
    (6, 9, "PR"),
    (10, 27, "MA"),
    (28, 29, "RI"),
    (30, 38, "NH"),
    (39, 49, "ME"),
    (50, 54, "VT"),
    (55, 55, "MA"),
    (56, 59, "VT"),
    (60, 69, "CT"),
    (70, 89, "NJ"),
    (90, 99, "AE"),
    (100, 149, "NY"),
    (150, 196, "PA"),
    (197, 199, "DE"),
    (200, 200, "DC"),
    (201, 201, "VA"),
    (202, 205, "DC"),
    (206, 219, "MD"),
    (220, 246, "VA"),
    (247, 268, "WV"),
    (270, 289, "NC"),
    (290, 299, "SC"),
    (300, 319, "GA"),
    (320, 339, "FL"),
    (340, 340, "AA"),
    (341, 349, "FL"),
    (350, 369, "AL"),
    (370, 385, "TN"),
    (386, 397, "MS"),
    (398, 399, "GA"),
    (400, 427, "KY"),
    (430, 459, "OH"),
    (460, 479, "IN"),
    (480, 499, "MI"),
    (500, 528, "IA"),
    (530, 549, "WI"),
    (550, 567, "MN"),
    (569, 569, "DC"),
    (570, 577, "SD"),
    (580, 588, "ND"),
    (590, 599, "MT"),
    (600, 629, "IL"),
    (630, 658, "MO"),
    (660, 679, "KS"),
    (680, 693, "NE"),
    (700, 714, "LA"),
    (716, 729, "AR"),
    (730, 749, "OK"),
    (750, 799, "TX"),
    (800, 816, "CO"),
    (820, 831, "WY"),
    (832, 838, "ID"),
    (840, 847, "UT"),
    (850, 865, "AZ"),
    (870, 884, "NM"),
    (885, 885, "TX"),
    (889, 898, "NV"),
    (900, 961, "CA"),
    (962, 966, "AP"),
    (967, 968, "HI"),
    (969, 969, "GU"),
    (970, 979, "OR"),
    (980, 994, "WA"),
    (995, 999, "AK"),
];

/// Why a shipping quote could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShippingError {
    #[error("{0:?} is not a valid ZIP code (use 12345 or 12345-6789)")]
    InvalidZip(String),

    #[error("ZIP code {0} is not a recognized US ZIP code")]
    UnknownZip(String),

    #[error("we only ship within the 48 contiguous states and DC ({zip} is in {region})")]
    UnsupportedRegion { zip: String, region: &'static str },

    #[error("{0:?} is not a US state abbreviation")]
    InvalidState(String),

    #[error("ZIP code is in {zip_state}, but the state entered was {entered}")]
    StateMismatch {
        zip_state: &'static str,
        entered: String,
    },
}

/// Pricing band a quote fell into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Zone {
    /// Exact-ZIP override from the catalog.
    Override,
    /// The bakery's home state.
    Local,
    Eastern,
    Central,
    Western,
}

impl Zone {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Override => "Special rate",
            Self::Local => "Local",
            Self::Eastern => "Eastern US",
            Self::Central => "Central US",
            Self::Western => "Western US",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Total shipping weight of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartWeight {
    pub pounds: Decimal,
    /// True when at least one item had no catalog weight and was estimated
    /// from its name.
    pub estimated: bool,
}

impl CartWeight {
    /// A known weight.
    #[must_use]
    pub const fn pounds(pounds: Decimal) -> Self {
        Self {
            pounds,
            estimated: false,
        }
    }

    /// Weigh cart items using catalog weights where available.
    ///
    /// Items without one count 4 lb per unit when the name contains a heavy
    /// keyword (cake, pie, bread, loaf, crisp) and 1 lb per unit otherwise.
    #[must_use]
    pub fn from_items(items: &[LineItem], catalog: Option<&Catalog>) -> Self {
        let mut pounds = Decimal::ZERO;
        let mut estimated = false;
        for item in items {
            let known = item
                .product_id
                .as_ref()
                .and_then(|id| catalog.and_then(|c| c.find(id.as_str())))
                .and_then(crate::catalog::Product::weight_lbs);
            let per_unit = known.unwrap_or_else(|| {
                estimated = true;
                Decimal::from(heuristic_unit_weight(&item.name))
            });
            pounds += per_unit * Decimal::from(item.quantity);
        }
        Self { pounds, estimated }
    }

    #[must_use]
    pub fn is_heavy(&self) -> bool {
        self.pounds > Decimal::from(HEAVY_THRESHOLD_LBS)
    }
}

fn heuristic_unit_weight(name: &str) -> i64 {
    let lower = name.to_lowercase();
    if HEAVY_KEYWORDS.iter().any(|k| lower.contains(k)) {
        HEAVY_ITEM_LBS
    } else {
        LIGHT_ITEM_LBS
    }
}

/// A computed shipping charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingQuote {
    /// The 5-digit ZIP the quote is for.
    pub zip: String,
    pub state: &'static str,
    pub zone: Zone,
    pub base: Price,
    pub surcharge: Price,
    pub total: Price,
    pub weight_lbs: Decimal,
    pub weight_estimated: bool,
}

/// Rate card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingRates {
    /// Two-letter code of the bakery's state.
    pub home_state: String,
    pub local_rate: Price,
    pub eastern_rate: Price,
    pub central_rate: Price,
    pub western_rate: Price,
    pub heavy_surcharge: Price,
    /// Flat costs for exact 5-digit ZIPs.
    pub zone_overrides: BTreeMap<String, Price>,
}

impl Default for ShippingRates {
    fn default() -> Self {
        Self {
            home_state: "ID".to_owned(),
            local_rate: Price::dollars(8),
            eastern_rate: Price::dollars(12),
            central_rate: Price::dollars(15),
            western_rate: Price::dollars(18),
            heavy_surcharge: Price::dollars(5),
            zone_overrides: BTreeMap::new(),
        }
    }
}

impl ShippingRates {
    /// Use the catalog's per-ZIP overrides.
    #[must_use]
    pub fn with_overrides(mut self, overrides: BTreeMap<String, Price>) -> Self {
        self.zone_overrides = overrides;
        self
    }

    /// Quote shipping to `zip`/`state` for a cart weighing `weight`.
    ///
    /// # Errors
    ///
    /// Returns an error if the ZIP is malformed or unknown, is outside the
    /// contiguous US, or does not match `state`.
    pub fn estimate(
        &self,
        zip: &str,
        state: &str,
        weight: CartWeight,
    ) -> Result<ShippingQuote, ShippingError> {
        let zip5 = normalize_zip(zip)?;
        let zip_state = state_for_zip(&zip5)?;

        let entered = state.trim().to_ascii_uppercase();
        if !KNOWN_STATES.contains(&entered.as_str()) {
            return Err(ShippingError::InvalidState(state.trim().to_owned()));
        }
        if entered != zip_state {
            return Err(ShippingError::StateMismatch {
                zip_state,
                entered,
            });
        }

        let (zone, base) = if let Some(cost) = self.zone_overrides.get(&zip5) {
            (Zone::Override, *cost)
        } else if zip_state.eq_ignore_ascii_case(&self.home_state) {
            (Zone::Local, self.local_rate)
        } else {
            match zip5.as_bytes().first() {
                Some(b'0'..=b'3') => (Zone::Eastern, self.eastern_rate),
                Some(b'4'..=b'6') => (Zone::Central, self.central_rate),
                _ => (Zone::Western, self.western_rate),
            }
        };

        let surcharge = if weight.is_heavy() {
            self.heavy_surcharge
        } else {
            Price::ZERO
        };

        Ok(ShippingQuote {
            zip: zip5,
            state: zip_state,
            zone,
            base,
            surcharge,
            total: base + surcharge,
            weight_lbs: weight.pounds,
            weight_estimated: weight.estimated,
        })
    }
}

/// Quote with the default rate card.
///
/// # Errors
///
/// See [`ShippingRates::estimate`].
pub fn estimate(zip: &str, state: &str, weight: CartWeight) -> Result<ShippingQuote, ShippingError> {
    ShippingRates::default().estimate(zip, state, weight)
}

/// Validate a ZIP or ZIP+4 and return its first five digits.
///
/// # Errors
///
/// Returns [`ShippingError::InvalidZip`] for anything else.
pub fn normalize_zip(zip: &str) -> Result<String, ShippingError> {
    let trimmed = zip.trim();
    ZIP_RE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_owned())
        .ok_or_else(|| ShippingError::InvalidZip(trimmed.to_owned()))
}

/// The state (or unsupported region) a 5-digit ZIP belongs to.
///
/// # Errors
///
/// Returns an error for prefixes outside the contiguous US or not assigned.
pub fn state_for_zip(zip5: &str) -> Result<&'static str, ShippingError> {
    let prefix: u16 = zip5
        .get(..3)
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| ShippingError::InvalidZip(zip5.to_owned()))?;

    let region = ZIP3_RANGES
        .iter()
        .find(|(lo, hi, _)| (*lo..=*hi).contains(&prefix))
        .map(|(_, _, region)| *region)
        .ok_or_else(|| ShippingError::UnknownZip(zip5.to_owned()))?;

    if UNSUPPORTED_REGIONS.contains(&region) {
        return Err(ShippingError::UnsupportedRegion {
            zip: zip5.to_owned(),
            region,
        });
    }
    Ok(region)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::types::ProductId;

    fn light() -> CartWeight {
        CartWeight::pounds(Decimal::ONE)
    }

    #[test]
    fn test_alaska_rejected_whatever_the_state() {
        for state in ["AK", "WA", "ID", "zz"] {
            assert!(matches!(
                estimate("99501", state, light()),
                Err(ShippingError::UnsupportedRegion { region: "AK", .. })
            ));
        }
        assert!(matches!(
            estimate("96813", "HI", light()),
            Err(ShippingError::UnsupportedRegion { region: "HI", .. })
        ));
        assert!(matches!(
            estimate("00901", "PR", light()),
            Err(ShippingError::UnsupportedRegion { .. })
        ));
    }

    #[test]
    fn test_idaho_gets_local_rate() {
        let quote = estimate("83201", "ID", light()).unwrap();
        assert_eq!(quote.state, "ID");
        assert_eq!(quote.zone, Zone::Local);
        assert_eq!(quote.total, Price::dollars(8));
    }

    #[test]
    fn test_bands_by_first_digit() {
        let east = estimate("10001", "NY", light()).unwrap();
        assert_eq!((east.zone, east.total), (Zone::Eastern, Price::dollars(12)));

        let central = estimate("60601", "il", light()).unwrap();
        assert_eq!((central.zone, central.total), (Zone::Central, Price::dollars(15)));

        let west = estimate("94105", " CA ", light()).unwrap();
        assert_eq!((west.zone, west.total), (Zone::Western, Price::dollars(18)));
    }

    #[test]
    fn test_zip_plus_four() {
        let quote = estimate("30301-1234", "GA", light()).unwrap();
        assert_eq!(quote.zip, "30301");
    }

    #[test]
    fn test_invalid_zip_formats() {
        for zip in ["1234", "123456", "abcde", "12345-12", ""] {
            assert!(
                matches!(estimate(zip, "NY", light()), Err(ShippingError::InvalidZip(_))),
                "{zip} should be invalid"
            );
        }
        assert!(matches!(
            estimate("00012", "NY", light()),
            Err(ShippingError::UnknownZip(_))
        ));
    }

    #[test]
    fn test_state_checks() {
        assert!(matches!(
            estimate("83201", "XX", light()),
            Err(ShippingError::InvalidState(_))
        ));
        assert_eq!(
            estimate("83201", "WA", light()),
            Err(ShippingError::StateMismatch {
                zip_state: "ID",
                entered: "WA".to_owned()
            })
        );
    }

    #[test]
    fn test_heavy_surcharge() {
        let heavy = CartWeight::pounds(Decimal::new(35, 1));
        let quote = estimate("10001", "NY", heavy).unwrap();
        assert_eq!(quote.surcharge, Price::dollars(5));
        assert_eq!(quote.total, Price::dollars(17));

        let at_threshold = CartWeight::pounds(Decimal::from(HEAVY_THRESHOLD_LBS));
        assert_eq!(
            estimate("10001", "NY", at_threshold).unwrap().surcharge,
            Price::ZERO
        );
    }

    #[test]
    fn test_catalog_override() {
        let mut overrides = BTreeMap::new();
        overrides.insert("12345".to_owned(), Price::from_cents(750));
        let rates = ShippingRates::default().with_overrides(overrides);
        let quote = rates.estimate("12345", "NY", light()).unwrap();
        assert_eq!(quote.zone, Zone::Override);
        assert_eq!(quote.total, Price::from_cents(750));
    }

    #[test]
    fn test_weight_heuristic_matches_legacy_rule() {
        // Four cookie boxes: over three units, so heavy.
        let cookies = [LineItem::new("Sugar Cookies", Price::dollars(12), 4)];
        let weight = CartWeight::from_items(&cookies, None);
        assert_eq!(weight.pounds, Decimal::from(4));
        assert!(weight.estimated && weight.is_heavy());

        // Three boxes is not.
        let cookies = [LineItem::new("Sugar Cookies", Price::dollars(12), 3)];
        assert!(!CartWeight::from_items(&cookies, None).is_heavy());

        // A single pie is.
        let pie = [LineItem::new("Apple Pie", Price::dollars(28), 1)];
        assert!(CartWeight::from_items(&pie, None).is_heavy());
    }

    #[test]
    fn test_weight_prefers_catalog() {
        let catalog = Catalog::parse(
            r#"[{"id": "apple-pie", "name": "Apple Pie", "shipping": {"weightLbs": 2.5}}]"#,
        )
        .unwrap();
        let items = [LineItem::new("Apple Pie", Price::dollars(28), 1)
            .with_product_id(ProductId::new("apple-pie"))];
        let weight = CartWeight::from_items(&items, Some(&catalog));
        assert_eq!(weight.pounds, Decimal::new(25, 1));
        assert!(!weight.estimated);
    }
}
