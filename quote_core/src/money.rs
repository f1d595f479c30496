//! # Money Helpers
//!
//! Amounts are plain `f64` euros. Every monetary figure that leaves a
//! calculation passes through [`round_money`] so that aggregates built from
//! rounded parts never drift by a cent between runs.
//!
//! ## Example
//!
//! ```rust
//! use quote_core::money::{round_money, clamp_percent};
//!
//! assert_eq!(round_money(2.8056), 2.81);
//! assert_eq!(round_money(1.005), 1.01);
//! assert_eq!(clamp_percent(150.0), 100.0);
//! ```

/// Round to cents, half away from zero.
///
/// The value is nudged by one machine epsilon away from zero before scaling so
/// that binary representations like `1.005 = 1.00499999…` round up.
pub fn round_money(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let nudged = value + value.signum() * f64::EPSILON;
    (nudged * 100.0).round() / 100.0
}

/// Clamp a percentage to [0, 100]; non-finite input becomes 0.
pub fn clamp_percent(percent: f64) -> f64 {
    if !percent.is_finite() {
        return 0.0;
    }
    percent.clamp(0.0, 100.0)
}

/// Clamp a rate-like value to be non-negative; non-finite input becomes 0.
pub fn non_negative(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    value.max(0.0)
}

/// Format an amount as euros for notes and CLI output (e.g. `€12.50`)
pub fn format_eur(amount: f64) -> String {
    format!("€{:.2}", round_money(amount))
}

/// Format a percentage without trailing zeros (25 → "25", 12.5 → "12.5")
pub fn format_percent(percent: f64) -> String {
    let rounded = round_money(percent);
    if rounded.fract() == 0.0 {
        format!("{:.0}%", rounded)
    } else {
        let text = format!("{:.2}", rounded);
        format!("{}%", text.trim_end_matches('0'))
    }
}
