//! Cent-precision money helpers.
//!
//! Every amount that leaves the planner is quantized to two decimal places
//! with round-half-up, and minor units are always derived from the quantized
//! value so `amount_minor == total_price * 100` holds exactly.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer};

/// Number of fractional digits carried by every money amount.
pub const MONEY_SCALE: u32 = 2;

/// Round to cents using round-half-up and pin the scale to two digits.
#[must_use]
pub fn quantize_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Convert a major-unit amount to integer cents.
///
/// Saturates at `i64::MAX` for amounts that cannot be represented, which no
/// realistic travel price reaches.
#[must_use]
pub fn to_minor_units(value: Decimal) -> i64 {
    (quantize_money(value) * Decimal::from(100))
        .to_i64()
        .unwrap_or(i64::MAX)
}

#[must_use]
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, MONEY_SCALE)
}

/// Render an amount with exactly two decimals, e.g. `"640.00"`.
#[must_use]
pub fn format_money(value: Decimal) -> String {
    quantize_money(value).to_string()
}

/// Parse a money string, accepting plain and scientific notation.
///
/// Returns `None` for empty, malformed, or negative input.
#[must_use]
pub fn parse_money_str(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parsed = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()?;
    if parsed.is_sign_negative() {
        return None;
    }
    Some(quantize_money(parsed))
}

/// Parse a loosely-typed JSON value (string or number) into money.
#[must_use]
pub fn parse_money_value(raw: &serde_json::Value) -> Option<Decimal> {
    match raw {
        serde_json::Value::String(s) => parse_money_str(s),
        serde_json::Value::Number(n) => parse_money_str(&n.to_string()),
        _ => None,
    }
}

/// Parse money from an optional value, falling back to `fallback` on any failure.
///
/// This is the single coercion point for provider-supplied price points; it
/// never fails.
#[must_use]
pub fn parse_money(raw: Option<&serde_json::Value>, fallback: Decimal) -> Decimal {
    raw.and_then(parse_money_value).unwrap_or(fallback)
}

/// Serde adapter: deserialize an optional money field leniently.
///
/// Malformed values deserialize to `None` instead of failing the whole record.
///
/// # Errors
///
/// Only fails if the underlying deserializer cannot produce any JSON value.
pub fn lenient_money<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(parse_money_value))
}
