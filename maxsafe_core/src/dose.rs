//! Dose accumulation: administered unit counts to delivered mass.
//!
//! Everything here is derived from [`AdministeredUnits`] on demand and never
//! stored.

use crate::{AdministeredUnits, DoseLine, DrugDefinition, Formulary};

/// Delivered quantities for `units` cartridges of `drug`
pub fn derive_dose_line(drug: &DrugDefinition, units: u32) -> DoseLine {
    let volume_ml = f64::from(units) * drug.unit_volume_ml;
    DoseLine {
        drug_id: drug.id.clone(),
        units,
        volume_ml,
        delivered_mg: volume_ml * drug.concentration_mg_per_ml,
        vasoconstrictor_mg: volume_ml * drug.vasoconstrictor_mg_per_ml,
    }
}

/// Dose lines for every drug with a non-zero count, in formulary order
pub fn active_dose_lines(formulary: &Formulary, units: &AdministeredUnits) -> Vec<DoseLine> {
    formulary
        .drugs
        .iter()
        .filter_map(|drug| {
            let count = units.get(&drug.id);
            (count > 0).then(|| derive_dose_line(drug, count))
        })
        .collect()
}
