//! Price threshold crossing.

use steamwatch_core::FieldValue;

/// Whether a price change crosses `threshold` downwards.
///
/// True when the new price is at or below the threshold and the previous
/// price was above it or unknown. Staying below the threshold does not
/// fire again.
pub fn crossed(threshold: i64, previous: Option<&FieldValue>, current: &FieldValue) -> bool {
    let FieldValue::Amount(now) = current else {
        return false;
    };
    if *now > threshold {
        return false;
    }
    match previous {
        Some(FieldValue::Amount(before)) => *before > threshold,
        Some(_) | None => true,
    }
}
