//! Numeric helpers shared by the fusion and finance engines.
//!
//! Every figure that leaves the engine goes through [`round_cents`] (or
//! [`ceil_cents`] where a strict floor must survive rounding), which
//! rounds through `Decimal` and maps anything non-finite to zero.

use rust_decimal::prelude::*;
use rust_decimal::RoundingStrategy;

/// Round to two decimal places (cents, or hundredths of a percent).
/// Non-finite or unrepresentable input becomes 0.
pub fn round_cents(value: f64) -> f64 {
    to_decimal(value).to_f64().unwrap_or(0.0)
}

/// Two-place `Decimal` for display and exact comparisons.
pub fn to_decimal(value: f64) -> Decimal {
    if !value.is_finite() {
        return Decimal::ZERO;
    }
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        .unwrap_or(Decimal::ZERO)
}

/// Round up to the next cent. Float noise below a millionth is dropped first
/// so an exact figure such as `353999.99999999994` stays at `354000.00`.
pub fn ceil_cents(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    Decimal::from_f64(value)
        .map(|d| {
            d.round_dp(6)
                .round_dp_with_strategy(2, RoundingStrategy::ToPositiveInfinity)
        })
        .and_then(|d| d.to_f64())
        .unwrap_or(0.0)
}

/// `numerator / denominator`, or 0 when the denominator is zero or the
/// result would not be finite.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if !denominator.is_finite() || denominator.abs() < 1e-9 {
        return 0.0;
    }
    let r = numerator / denominator;
    if r.is_finite() {
        r
    } else {
        0.0
    }
}

/// `numerator / denominator * 100`, guarded like [`ratio`].
pub fn percent(numerator: f64, denominator: f64) -> f64 {
    ratio(numerator, denominator) * 100.0
}
