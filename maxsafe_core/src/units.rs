//! Weight normalization and kg/lb conversion.
//!
//! The canonical mass used by the engine is never rounded. Rounding to one
//! decimal happens only in [`round_for_display`] and [`convert_weight`], which
//! serve display and edit fields.

use crate::WeightUnit;

/// Pounds per kilogram
pub const LB_PER_KG: f64 = 2.205;

/// Convert an entered weight to canonical kg.
///
/// Returns `None` ("unknown weight") for zero, negative, NaN or infinite
/// input so a bad entry can never act as a dose multiplier.
pub fn normalize_weight(value: f64, unit: WeightUnit) -> Option<f64> {
    if !value.is_finite() || value <= 0.0 {
        tracing::debug!("Rejecting weight {} {} as unknown", value, unit);
        return None;
    }

    let kg = match unit {
        WeightUnit::Kg => value,
        WeightUnit::Lb => value / LB_PER_KG,
    };

    Some(kg)
}

/// Exact conversion between units, no rounding
pub fn convert_exact(value: f64, from: WeightUnit, to: WeightUnit) -> f64 {
    match (from, to) {
        (WeightUnit::Kg, WeightUnit::Lb) => value * LB_PER_KG,
        (WeightUnit::Lb, WeightUnit::Kg) => value / LB_PER_KG,
        _ => value,
    }
}

/// Convert a displayed weight to another unit, rounded to one decimal
pub fn convert_weight(value: f64, from: WeightUnit, to: WeightUnit) -> f64 {
    round_for_display(convert_exact(value, from, to))
}

/// Round to one decimal place
pub fn round_for_display(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
