//! Type-safe price representation using decimal arithmetic.
//!
//! All bakery prices are US dollars. Amounts are stored as [`Decimal`] so that
//! totals, deposits and balances add up to the cent without float drift, and
//! serialize as plain JSON numbers to stay compatible with hand-edited
//! catalog files.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Mul, Sub};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A dollar amount.
///
/// Deserializes from a JSON number or numeric string; serializes as a number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(#[serde(serialize_with = "rust_decimal::serde::float::serialize")] Decimal);

impl Price {
    /// Zero dollars.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal dollar amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from whole dollars.
    #[must_use]
    pub fn dollars(amount: i64) -> Self {
        Self(Decimal::from(amount))
    }

    /// Create a price from cents (`1250` is `$12.50`).
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// True when the amount is strictly greater than zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Half of this amount, unrounded.
    #[must_use]
    pub fn half(&self) -> Self {
        Self(self.0 * Decimal::new(5, 1))
    }

    /// Format with two decimals, e.g. `"$40.00"`.
    #[must_use]
    pub fn display(&self) -> String {
        format!("${:.2}", self.0)
    }

    /// Format without the currency symbol, e.g. `"40.00"`, for payment links.
    #[must_use]
    pub fn plain(&self) -> String {
        format!("{:.2}", self.0)
    }

    /// Format whole-dollar amounts without decimals (`"$12"`), others with two.
    #[must_use]
    pub fn display_short(&self) -> String {
        if self.0.fract().is_zero() {
            format!("${}", self.0.trunc().normalize())
        } else {
            self.display()
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul<u32> for Price {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self {
        Self(self.0 * Decimal::from(rhs))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Price::dollars(40).display(), "$40.00");
        assert_eq!(Price::from_cents(1250).display(), "$12.50");
        assert_eq!(Price::from_cents(1250).plain(), "12.50");
    }

    #[test]
    fn test_display_short_drops_whole_cents() {
        assert_eq!(Price::dollars(12).display_short(), "$12");
        assert_eq!(Price::from_cents(2000).display_short(), "$20");
        assert_eq!(Price::from_cents(1299).display_short(), "$12.99");
    }

    #[test]
    fn test_arithmetic() {
        let line = Price::dollars(20) * 2;
        assert_eq!(line, Price::dollars(40));
        assert_eq!(line.half(), Price::dollars(20));
        assert_eq!(line - Price::dollars(15), Price::dollars(25));

        let total: Price = [Price::dollars(1), Price::from_cents(50)].into_iter().sum();
        assert_eq!(total, Price::from_cents(150));
    }

    #[test]
    fn test_half_is_exact() {
        let total = Price::from_cents(4001);
        assert_eq!(total.half() + (total - total.half()), total);
    }

    #[test]
    fn test_deserialize_number_and_string() {
        let from_int: Price = serde_json::from_str("20").unwrap();
        assert_eq!(from_int, Price::dollars(20));

        let from_str: Price = serde_json::from_str("\"12.50\"").unwrap();
        assert_eq!(from_str, Price::from_cents(1250));
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_value(Price::from_cents(1250)).unwrap();
        assert!(json.is_number());
        assert!((json.as_f64().unwrap() - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_is_positive() {
        assert!(Price::from_cents(1).is_positive());
        assert!(!Price::ZERO.is_positive());
        assert!(!Price::dollars(-3).is_positive());
    }
}
