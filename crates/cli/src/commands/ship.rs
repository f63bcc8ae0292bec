//! Shipping quote command.
//!
//! # Usage
//!
//! ```bash
//! yfhs ship --zip 83201 --state ID
//! yfhs ship --zip 10001 --state NY --weight 4.5
//! ```

use std::io::Write;

use farmhouse_core::shipping::{CartWeight, ShippingError, ShippingRates};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors from the ship command.
#[derive(Debug, Error)]
pub enum ShipCommandError {
    #[error(transparent)]
    Shipping(#[from] ShippingError),

    #[error("weight must not be negative (got {0})")]
    NegativeWeight(Decimal),

    #[error("cannot write output: {0}")]
    Output(#[from] std::io::Error),
}

/// Print a quote with the default rate card.
///
/// # Errors
///
/// Returns an error if the ZIP or state is rejected.
pub fn quote(
    zip: &str,
    state: &str,
    weight: Decimal,
    out: &mut impl Write,
) -> Result<(), ShipCommandError> {
    if weight.is_sign_negative() {
        return Err(ShipCommandError::NegativeWeight(weight));
    }

    let quote = ShippingRates::default().estimate(zip, state, CartWeight::pounds(weight))?;
    writeln!(out, "ZIP {} ({}), {}", quote.zip, quote.state, quote.zone)?;
    writeln!(out, "base      {}", quote.base)?;
    writeln!(out, "surcharge {}", quote.surcharge)?;
    writeln!(out, "total     {}", quote.total)?;
    writeln!(out, "weight    {} lb", quote.weight_lbs.normalize())?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn run(zip: &str, state: &str, weight: i64) -> Result<String, ShipCommandError> {
        let mut out = Vec::new();
        quote(zip, state, Decimal::from(weight), &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_local_quote() {
        let text = run("83201", "id", 1).unwrap();
        assert!(text.contains("ZIP 83201 (ID), Local"));
        assert!(text.contains("total     $8.00"));
    }

    #[test]
    fn test_heavy_quote_adds_surcharge() {
        let text = run("83201", "ID", 5).unwrap();
        assert!(text.contains("surcharge $5.00"));
        assert!(text.contains("total     $13.00"));
    }

    #[test]
    fn test_alaska_rejected() {
        let err = run("99501", "AK", 1).unwrap_err();
        assert!(matches!(
            err,
            ShipCommandError::Shipping(ShippingError::UnsupportedRegion { .. })
        ));
    }

    #[test]
    fn test_negative_weight_rejected() {
        assert!(matches!(
            run("83201", "ID", -1),
            Err(ShipCommandError::NegativeWeight(_))
        ));
    }
}
