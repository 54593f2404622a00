//! Built-in formulary of dental local anesthetic cartridges.
//!
//! Concentrations: a percentage is g/100 mL, so 2% = 20 mg/mL.
//! Epinephrine ratios: 1:100,000 = 0.01 mg/mL.

use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::path::Path;

/// Cached default formulary - built once and reused across all sessions
static DEFAULT_FORMULARY: Lazy<Formulary> = Lazy::new(build_default_formulary);

/// Get a reference to the cached default formulary
pub fn get_default_formulary() -> &'static Formulary {
    &DEFAULT_FORMULARY
}

/// Builds the default formulary.
///
/// **Note**: prefer `get_default_formulary()` which returns a cached
/// reference. This function is retained for tests and custom tables.
pub fn build_default_formulary() -> Formulary {
    let drugs = vec![
        DrugDefinition {
            id: "lidocaine-2-epi-100k".into(),
            name: "Lidocaine 2%".into(),
            vasoconstrictor_ratio: "1:100,000".into(),
            concentration_mg_per_ml: 20.0,
            max_dose_per_kg_mg: 7.0,
            absolute_max_mg: 500.0,
            vasoconstrictor_mg_per_ml: 0.01,
            unit_volume_ml: 1.7,
            class: Some(AnestheticClass::Amide),
            onset: Some("2-4 min".into()),
            duration: Some("2.5-3.5 hrs".into()),
            half_life: None,
        },
        DrugDefinition {
            id: "articaine-4-epi-100k".into(),
            name: "Articaine 4%".into(),
            vasoconstrictor_ratio: "1:100,000".into(),
            concentration_mg_per_ml: 40.0,
            max_dose_per_kg_mg: 7.0,
            // conservative ceiling
            absolute_max_mg: 500.0,
            vasoconstrictor_mg_per_ml: 0.01,
            unit_volume_ml: 1.7,
            class: Some(AnestheticClass::Amide),
            onset: Some("1-9 min".into()),
            duration: Some("1-2 hrs".into()),
            half_life: Some("44 min".into()),
        },
        DrugDefinition {
            id: "bupivacaine-05-epi-100k".into(),
            name: "Bupivacaine 0.5%".into(),
            vasoconstrictor_ratio: "1:100,000".into(),
            concentration_mg_per_ml: 5.0,
            max_dose_per_kg_mg: 2.0,
            absolute_max_mg: 90.0,
            vasoconstrictor_mg_per_ml: 0.01,
            // 1.8 mL cartridges
            unit_volume_ml: 1.8,
            class: Some(AnestheticClass::Amide),
            onset: Some("2-10 min".into()),
            duration: Some("up to 7 hrs".into()),
            half_life: Some("2.7 hrs".into()),
        },
        DrugDefinition {
            id: "mepivacaine-3-plain".into(),
            name: "Mepivacaine 3%".into(),
            vasoconstrictor_ratio: "Plain".into(),
            concentration_mg_per_ml: 30.0,
            max_dose_per_kg_mg: 6.6,
            absolute_max_mg: 400.0,
            vasoconstrictor_mg_per_ml: 0.0,
            unit_volume_ml: 1.7,
            class: Some(AnestheticClass::Amide),
            onset: Some("0.5-4 min".into()),
            duration: Some("20-40 min".into()),
            half_life: Some("1.9-3.2 hrs".into()),
        },
        DrugDefinition {
            id: "prilocaine-4-plain".into(),
            name: "Prilocaine 4%".into(),
            vasoconstrictor_ratio: "Plain".into(),
            concentration_mg_per_ml: 40.0,
            max_dose_per_kg_mg: 6.0,
            absolute_max_mg: 400.0,
            vasoconstrictor_mg_per_ml: 0.0,
            unit_volume_ml: 1.7,
            class: Some(AnestheticClass::Amide),
            onset: Some("2-3 min".into()),
            duration: Some("20 min - 2.5 hrs".into()),
            half_life: Some("1.6 hrs".into()),
        },
    ];

    Formulary {
        vasoconstrictor_limits: VasoconstrictorLimits {
            standard_mg: 0.2,
            // cardiac / medically compromised
            high_risk_mg: 0.04,
        },
        drugs,
    }
}

impl Formulary {
    /// Parse a formulary from TOML and validate it
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let formulary: Formulary = toml::from_str(contents)?;
        let errors = formulary.validate();
        if !errors.is_empty() {
            return Err(Error::FormularyValidation(errors.join("; ")));
        }
        Ok(formulary)
    }

    /// Load and validate a formulary file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let formulary = Self::from_toml_str(&contents)?;
        tracing::info!(
            "Loaded formulary with {} drugs from {:?}",
            formulary.drugs.len(),
            path
        );
        Ok(formulary)
    }

    pub fn get(&self, drug_id: &str) -> Option<&DrugDefinition> {
        self.drugs.iter().find(|d| d.id == drug_id)
    }

    pub fn contains(&self, drug_id: &str) -> bool {
        self.get(drug_id).is_some()
    }

    /// Check the drug invariants, returning every violation found
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.drugs.is_empty() {
            errors.push("Formulary has no drugs".to_string());
        }

        let mut seen = HashSet::new();
        for drug in &self.drugs {
            let id = &drug.id;
            if id.trim().is_empty() {
                errors.push(format!("Drug '{}' has an empty id", drug.name));
            } else if !seen.insert(id.as_str()) {
                errors.push(format!("Duplicate drug id '{}'", id));
            }

            let positive = [
                ("concentration_mg_per_ml", drug.concentration_mg_per_ml),
                ("max_dose_per_kg_mg", drug.max_dose_per_kg_mg),
                ("absolute_max_mg", drug.absolute_max_mg),
                ("unit_volume_ml", drug.unit_volume_ml),
            ];
            for (field, value) in positive {
                if !(value.is_finite() && value > 0.0) {
                    errors.push(format!("Drug '{}': {} must be > 0, got {}", id, field, value));
                }
            }

            let vaso = drug.vasoconstrictor_mg_per_ml;
            if !(vaso.is_finite() && vaso >= 0.0) {
                errors.push(format!(
                    "Drug '{}': vasoconstrictor_mg_per_ml must be >= 0, got {}",
                    id, vaso
                ));
            }
        }

        let limits = &self.vasoconstrictor_limits;
        for (field, value) in [
            ("standard_mg", limits.standard_mg),
            ("high_risk_mg", limits.high_risk_mg),
        ] {
            if !(value.is_finite() && value > 0.0) {
                errors.push(format!(
                    "Vasoconstrictor limit {} must be > 0, got {}",
                    field, value
                ));
            }
        }

        errors
    }
}
