//! Per-drug maximum dose resolution.

use crate::DrugDefinition;

/// Effective ceiling in mg: the lesser of the weight-based maximum and the
/// absolute labelled maximum.
///
/// With unknown weight the absolute maximum is returned as a nominal ceiling
/// for display; no dose can accrue in that state.
pub fn effective_ceiling_mg(drug: &DrugDefinition, weight_kg: Option<f64>) -> f64 {
    match weight_kg {
        Some(kg) if kg > 0.0 => (drug.max_dose_per_kg_mg * kg).min(drug.absolute_max_mg),
        _ => drug.absolute_max_mg,
    }
}

/// Weight-based maximum before the absolute cap, if the weight is known
pub fn weight_based_max_mg(drug: &DrugDefinition, weight_kg: Option<f64>) -> Option<f64> {
    weight_kg
        .filter(|&kg| kg > 0.0)
        .map(|kg| drug.max_dose_per_kg_mg * kg)
}
