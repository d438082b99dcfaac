//! Minor-unit price normalization.
//!
//! Every price inside steamwatch is an `i64` count of minor units (cents).
//! Floating-point amounts only appear at the edges (user input) and are
//! rounded exactly once, here.

use crate::error::AmountError;

/// Convert a major-unit amount (`19.99`) into minor units (`1999`).
///
/// Rounds half away from zero, so `19.99` (which is `19.989999…` in binary)
/// still yields `1999`.
pub fn to_minor_units(major: f64) -> Result<i64, AmountError> {
    if !major.is_finite() || major < 0.0 {
        return Err(AmountError(major));
    }
    let minor = (major * 100.0).round();
    if minor > i64::MAX as f64 {
        return Err(AmountError(major));
    }
    Ok(minor as i64)
}

/// Render minor units as `12.34`, followed by the currency code when known.
pub fn format_amount(minor: i64, currency: Option<&str>) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    let amount = format!("{sign}{}.{:02}", abs / 100, abs % 100);
    match currency {
        Some(code) => format!("{amount} {code}"),
        None => amount,
    }
}
