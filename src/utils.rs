// Utility helpers shared by fetchers, caches and the aggregator.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::{
    constants::USD_DECIMALS,
    error::{AppError, Result},
};

/// Time source for TTL checks; swapped for a manual clock in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Converts an integer minor-unit amount (`"1000000"`) into display units.
/// Fractional minor units (reward DecCoins) are truncated.
pub fn minor_to_display(raw: &str, decimals: u32) -> Result<Decimal> {
    let integer = raw.trim().split('.').next().unwrap_or_default();
    let minor: i128 = integer
        .parse()
        .map_err(|e| AppError::Validation(format!("Invalid amount '{}': {}", raw, e)))?;
    Decimal::try_from_i128_with_scale(minor, decimals)
        .map_err(|e| AppError::Validation(format!("Amount '{}' out of range: {}", raw, e)))
}

/// Renders with exactly `decimals` fraction digits.
pub fn format_fixed(value: Decimal, decimals: u32) -> String {
    let mut fixed = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    fixed.rescale(decimals);
    fixed.to_string()
}

pub fn parse_display_amount(value: &str) -> Decimal {
    Decimal::from_str(value.trim()).unwrap_or(Decimal::ZERO)
}

/// `amount * price` rounded to cents, as a decimal string.
pub fn usd_value(amount: Decimal, price: f64) -> String {
    let price = if price.is_finite() && price > 0.0 {
        Decimal::from_f64(price).unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };
    let value = amount.checked_mul(price).unwrap_or_else(|| {
        tracing::warn!("USD valuation overflow for amount {} at price {}", amount, price);
        Decimal::ZERO
    });
    format_fixed(value, USD_DECIMALS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minor_units_convert_exactly() {
        let value = minor_to_display("1000000", 6).unwrap();
        assert_eq!(format_fixed(value, 6), "1.000000");

        let value = minor_to_display("5000000", 6).unwrap();
        assert_eq!(value.to_string(), "5.000000");
    }

    #[test]
    fn eighteen_decimal_amounts_keep_precision() {
        let value = minor_to_display("1500000000000000000", 18).unwrap();
        assert_eq!(format_fixed(value, 18), "1.500000000000000000");
    }

    #[test]
    fn reward_fractions_are_truncated() {
        let value = minor_to_display("1234567.891000000000000000", 6).unwrap();
        assert_eq!(value.to_string(), "1.234567");
    }

    #[test]
    fn invalid_amount_is_validation_error() {
        assert!(matches!(
            minor_to_display("abc", 6),
            Err(AppError::Validation(_))
        ));
        assert!(minor_to_display("", 6).is_err());
    }

    #[test]
    fn usd_value_rounds_to_cents() {
        let amount = minor_to_display("5000000", 6).unwrap();
        assert_eq!(usd_value(amount, 0.5), "2.50");
        assert_eq!(usd_value(Decimal::ZERO, 7.25), "0.00");
        assert_eq!(usd_value(Decimal::new(1, 3), 5.0), "0.01");
    }

    #[test]
    fn usd_value_ignores_bad_prices() {
        assert_eq!(usd_value(Decimal::ONE, f64::NAN), "0.00");
        assert_eq!(usd_value(Decimal::ONE, -3.0), "0.00");
    }

    #[test]
    fn parse_display_amount_defaults_to_zero() {
        assert_eq!(parse_display_amount("0"), Decimal::ZERO);
        assert_eq!(parse_display_amount("garbage"), Decimal::ZERO);
        assert_eq!(parse_display_amount("1.50"), Decimal::new(15, 1));
    }
}
