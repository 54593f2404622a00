//! Core domain types for the MaxSafe toxicity engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Drug definitions and the formulary that holds them
//! - Patient profile (weight, unit, risk class)
//! - Administered unit counts (the single source of truth)
//! - Derived dose lines and the toxicity summary snapshot

use crate::{units, Error};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Drug Types
// ============================================================================

/// Chemical class of a local anesthetic
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnestheticClass {
    Amide,
    Ester,
}

/// A single formulary entry (e.g., "Lidocaine 2% 1:100,000")
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DrugDefinition {
    pub id: String,
    pub name: String,
    /// Vasoconstrictor label shown next to the name, e.g. "1:100,000" or "Plain"
    pub vasoconstrictor_ratio: String,
    pub concentration_mg_per_ml: f64,
    pub max_dose_per_kg_mg: f64,
    pub absolute_max_mg: f64,
    /// 0.0 means the cartridge carries no vasoconstrictor
    #[serde(default)]
    pub vasoconstrictor_mg_per_ml: f64,
    /// Volume of one dispensing unit (cartridge)
    pub unit_volume_ml: f64,
    #[serde(default)]
    pub class: Option<AnestheticClass>,
    #[serde(default)]
    pub onset: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub half_life: Option<String>,
}

impl DrugDefinition {
    /// Name with the vasoconstrictor label, e.g. "Lidocaine 2% (1:100,000)"
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.name, self.vasoconstrictor_ratio)
    }

    pub fn has_vasoconstrictor(&self) -> bool {
        self.vasoconstrictor_mg_per_ml > 0.0
    }
}

/// Vasoconstrictor (epinephrine) ceilings per patient class, in mg
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct VasoconstrictorLimits {
    pub standard_mg: f64,
    pub high_risk_mg: f64,
}

impl VasoconstrictorLimits {
    /// Pick the limit for the patient class. There is no interpolation.
    pub fn for_patient(&self, high_risk: bool) -> f64 {
        if high_risk {
            self.high_risk_mg
        } else {
            self.standard_mg
        }
    }
}

impl Default for VasoconstrictorLimits {
    fn default() -> Self {
        Self {
            standard_mg: 0.2,
            high_risk_mg: 0.04,
        }
    }
}

// ============================================================================
// Formulary Type
// ============================================================================

/// Read-only table of drug definitions.
///
/// Declaration order of `drugs` is significant: every derived list and every
/// floating-point accumulation walks the table in this order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Formulary {
    #[serde(default)]
    pub vasoconstrictor_limits: VasoconstrictorLimits,
    pub drugs: Vec<DrugDefinition>,
}

// ============================================================================
// Patient Types
// ============================================================================

/// Unit a weight was entered in
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    Kg,
    Lb,
}

impl WeightUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightUnit::Kg => "kg",
            WeightUnit::Lb => "lb",
        }
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeightUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kg" | "kgs" => Ok(WeightUnit::Kg),
            "lb" | "lbs" => Ok(WeightUnit::Lb),
            other => Err(Error::Other(format!(
                "Unknown weight unit '{}' (expected kg or lb)",
                other
            ))),
        }
    }
}

/// Patient data that feeds the dose calculation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct PatientProfile {
    /// Weight as entered, in `weight_unit`. `None` means unknown.
    pub weight_value: Option<f64>,
    pub weight_unit: WeightUnit,
    /// Cardiac or medically compromised patient
    pub high_risk: bool,
}

impl PatientProfile {
    /// Canonical weight in kg, or `None` while the weight is unknown
    pub fn weight_kg(&self) -> Option<f64> {
        self.weight_value
            .and_then(|value| units::normalize_weight(value, self.weight_unit))
    }

    pub fn is_weight_known(&self) -> bool {
        self.weight_kg().is_some()
    }

    /// Entered weight rounded for display
    pub fn display_weight(&self) -> Option<f64> {
        self.weight_kg()?;
        self.weight_value.map(units::round_for_display)
    }
}

// ============================================================================
// Administered Units
// ============================================================================

/// Count of dispensed units per drug id.
///
/// Counts only change through [`crate::Session`], which enforces the zero
/// floor and the weight-known precondition.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct AdministeredUnits {
    counts: BTreeMap<String, u32>,
}

impl AdministeredUnits {
    /// Zero counts for every drug in the formulary
    pub fn for_formulary(formulary: &Formulary) -> Self {
        Self {
            counts: formulary
                .drugs
                .iter()
                .map(|drug| (drug.id.clone(), 0))
                .collect(),
        }
    }

    pub fn get(&self, drug_id: &str) -> u32 {
        self.counts.get(drug_id).copied().unwrap_or(0)
    }

    pub(crate) fn set(&mut self, drug_id: &str, count: u32) {
        self.counts.insert(drug_id.to_string(), count);
    }

    pub(crate) fn clear(&mut self) {
        for count in self.counts.values_mut() {
            *count = 0;
        }
    }

    /// Cartridges administered across all drugs
    pub fn total(&self) -> u64 {
        self.counts.values().map(|&c| u64::from(c)).sum()
    }

    /// True when no drug has a non-zero count
    pub fn is_empty(&self) -> bool {
        self.counts.values().all(|&c| c == 0)
    }
}

// ============================================================================
// Derived Types
// ============================================================================

/// Delivered quantities for one drug with a non-zero count
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DoseLine {
    pub drug_id: String,
    pub units: u32,
    pub volume_ml: f64,
    pub delivered_mg: f64,
    pub vasoconstrictor_mg: f64,
}

/// One drug's share of its own ceiling
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DrugFraction {
    pub drug_id: String,
    pub ceiling_mg: f64,
    /// delivered / ceiling, dimensionless and unclamped
    pub fraction: f64,
}

impl DrugFraction {
    pub fn percent(&self) -> f64 {
        self.fraction * 100.0
    }

    pub fn band(&self) -> ToxicityBand {
        crate::toxicity::classify(self.percent())
    }
}

/// Threshold band used by consumers for colour and alert decisions
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ToxicityBand {
    WithinRange,
    ApproachingLimit,
    OverLimit,
}

impl ToxicityBand {
    pub fn label(&self) -> &'static str {
        match self {
            ToxicityBand::WithinRange => "within range",
            ToxicityBand::ApproachingLimit => "approaching limit",
            ToxicityBand::OverLimit => "OVER LIMIT",
        }
    }
}

impl fmt::Display for ToxicityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Immutable snapshot produced by [`crate::toxicity::evaluate`]
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToxicitySummary {
    /// Active dose lines in formulary order
    pub lines: Vec<DoseLine>,
    /// Per-drug fractions, parallel to `lines`
    pub fractions: Vec<DrugFraction>,
    /// Fractional-rule sum x 100, unclamped
    pub cumulative_fraction_percent: f64,
    pub total_vasoconstrictor_mg: f64,
    pub vasoconstrictor_limit_mg: f64,
    /// Unclamped
    pub vasoconstrictor_load_percent: f64,
}

impl ToxicitySummary {
    /// Empty summary: nothing administered (or weight unknown)
    pub fn baseline(vasoconstrictor_limit_mg: f64) -> Self {
        Self {
            lines: Vec::new(),
            fractions: Vec::new(),
            cumulative_fraction_percent: 0.0,
            total_vasoconstrictor_mg: 0.0,
            vasoconstrictor_limit_mg,
            vasoconstrictor_load_percent: 0.0,
        }
    }

    pub fn is_baseline(&self) -> bool {
        self.lines.is_empty()
            && self.fractions.is_empty()
            && self.cumulative_fraction_percent == 0.0
            && self.total_vasoconstrictor_mg == 0.0
            && self.vasoconstrictor_load_percent == 0.0
    }

    pub fn cumulative_band(&self) -> ToxicityBand {
        crate::toxicity::classify(self.cumulative_fraction_percent)
    }

    pub fn vasoconstrictor_band(&self) -> ToxicityBand {
        crate::toxicity::classify(self.vasoconstrictor_load_percent)
    }

    /// Worst band across the cumulative fraction and the vasoconstrictor load
    pub fn overall_band(&self) -> ToxicityBand {
        self.cumulative_band().max(self.vasoconstrictor_band())
    }

    pub fn line(&self, drug_id: &str) -> Option<&DoseLine> {
        self.lines.iter().find(|l| l.drug_id == drug_id)
    }

    pub fn fraction(&self, drug_id: &str) -> Option<&DrugFraction> {
        self.fractions.iter().find(|f| f.drug_id == drug_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_unit_parse() {
        assert_eq!("kg".parse::<WeightUnit>().unwrap(), WeightUnit::Kg);
        assert_eq!("LBS".parse::<WeightUnit>().unwrap(), WeightUnit::Lb);
        assert!("stone".parse::<WeightUnit>().is_err());
    }

    #[test]
    fn test_profile_unknown_weight() {
        let mut profile = PatientProfile::default();
        assert!(!profile.is_weight_known());

        profile.weight_value = Some(0.0);
        assert_eq!(profile.weight_kg(), None);
        assert_eq!(profile.display_weight(), None);

        profile.weight_value = Some(-3.0);
        assert_eq!(profile.weight_kg(), None);
    }

    #[test]
    fn test_profile_lb_weight() {
        let profile = PatientProfile {
            weight_value: Some(154.4),
            weight_unit: WeightUnit::Lb,
            high_risk: false,
        };
        let kg = profile.weight_kg().unwrap();
        assert!((kg - 154.4 / 2.205).abs() < 1e-12);
        assert!((kg - 70.0).abs() < 0.1);
        assert_eq!(profile.display_weight(), Some(154.4));
    }

    #[test]
    fn test_vasoconstrictor_limit_selection() {
        let limits = VasoconstrictorLimits::default();
        assert_eq!(limits.for_patient(false), 0.2);
        assert_eq!(limits.for_patient(true), 0.04);
    }

    #[test]
    fn test_band_ordering() {
        assert!(ToxicityBand::WithinRange < ToxicityBand::ApproachingLimit);
        assert!(ToxicityBand::ApproachingLimit < ToxicityBand::OverLimit);
    }

    #[test]
    fn test_baseline_summary() {
        let summary = ToxicitySummary::baseline(0.2);
        assert!(summary.is_baseline());
        assert_eq!(summary.overall_band(), ToxicityBand::WithinRange);
    }
}
