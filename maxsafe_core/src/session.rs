//! Calculation session: the mutable state behind the engine.
//!
//! A session owns the patient profile and the administered unit counts for
//! one patient. Every mutation builds the candidate state, evaluates it, and
//! only then commits profile, counts and summary together, so a failure can
//! never leave a partially updated summary behind.

use crate::ceiling::effective_ceiling_mg;
use crate::toxicity::evaluate;
use crate::units;
use crate::{
    AdministeredUnits, Error, Formulary, PatientProfile, Result, ToxicitySummary, WeightUnit,
};
use uuid::Uuid;

/// What happened to a count after [`Session::increment_drug`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IncrementOutcome {
    /// Count moved from `previous` to `current`
    Applied { previous: u32, current: u32 },
    /// The decrement would have gone below zero; count is now 0
    ClampedAtZero { previous: u32 },
    /// Nothing to do (zero delta, or decrement at zero)
    Unchanged { count: u32 },
    /// Rejected: counts cannot change while the weight is unknown
    WeightUnknown,
}

impl IncrementOutcome {
    pub fn changed(&self) -> bool {
        matches!(
            self,
            IncrementOutcome::Applied { .. } | IncrementOutcome::ClampedAtZero { .. }
        )
    }
}

/// Single-patient calculation session over a read-only formulary
#[derive(Clone, Debug)]
pub struct Session<'f> {
    id: Uuid,
    formulary: &'f Formulary,
    profile: PatientProfile,
    units: AdministeredUnits,
    summary: ToxicitySummary,
}

impl<'f> Session<'f> {
    /// Start a session with unknown weight and nothing administered
    pub fn new(formulary: &'f Formulary) -> Self {
        let profile = PatientProfile::default();
        let summary =
            ToxicitySummary::baseline(formulary.vasoconstrictor_limits.for_patient(false));
        let id = Uuid::new_v4();
        tracing::debug!("Started session {}", id);

        Self {
            id,
            formulary,
            profile,
            units: AdministeredUnits::for_formulary(formulary),
            summary,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn formulary(&self) -> &'f Formulary {
        self.formulary
    }

    pub fn profile(&self) -> &PatientProfile {
        &self.profile
    }

    pub fn units(&self) -> &AdministeredUnits {
        &self.units
    }

    /// Administered count for a drug (0 for drugs never given)
    pub fn count(&self, drug_id: &str) -> u32 {
        self.units.get(drug_id)
    }

    /// Current snapshot. Never recomputes; reading has no side effects.
    pub fn summary(&self) -> &ToxicitySummary {
        &self.summary
    }

    /// Ceiling for a drug at the current weight (nominal when unknown)
    pub fn ceiling_mg(&self, drug_id: &str) -> Result<f64> {
        let drug = self.drug(drug_id)?;
        Ok(effective_ceiling_mg(drug, self.profile.weight_kg()))
    }

    /// Set the patient weight.
    ///
    /// Zero, negative or non-finite values leave the weight unknown rather
    /// than failing. Returns the canonical kg value, if known.
    pub fn set_weight(&mut self, value: f64, unit: WeightUnit) -> Result<Option<f64>> {
        let weight_kg = units::normalize_weight(value, unit);
        if weight_kg.is_none() {
            tracing::warn!("Invalid weight {} {}, treating weight as unknown", value, unit);
        }

        let mut profile = self.profile.clone();
        profile.weight_value = weight_kg.map(|_| value);
        profile.weight_unit = unit;
        self.commit(profile, self.units.clone())?;

        Ok(weight_kg)
    }

    /// Forget the weight; counts are kept but the summary drops to baseline
    pub fn clear_weight(&mut self) -> Result<()> {
        let mut profile = self.profile.clone();
        profile.weight_value = None;
        self.commit(profile, self.units.clone())
    }

    /// Switch the entry unit, converting the entered value exactly.
    ///
    /// The canonical kg weight is unaffected; only the displayed value
    /// changes (see [`PatientProfile::display_weight`]).
    pub fn set_weight_unit(&mut self, unit: WeightUnit) -> Result<()> {
        if unit == self.profile.weight_unit {
            return Ok(());
        }

        let mut profile = self.profile.clone();
        let from = profile.weight_unit;
        profile.weight_value = profile
            .weight_value
            .map(|value| units::convert_exact(value, from, unit));
        profile.weight_unit = unit;
        self.commit(profile, self.units.clone())
    }

    pub fn set_high_risk(&mut self, high_risk: bool) -> Result<()> {
        let mut profile = self.profile.clone();
        profile.high_risk = high_risk;
        self.commit(profile, self.units.clone())
    }

    /// Add `delta` units (negative to remove) of a drug.
    ///
    /// The count never drops below zero, and no count changes while the
    /// weight is unknown. An id missing from the formulary is an error.
    pub fn increment_drug(&mut self, drug_id: &str, delta: i64) -> Result<IncrementOutcome> {
        self.drug(drug_id)?;

        if !self.profile.is_weight_known() {
            tracing::warn!(
                "Ignoring {:+} units of {}: patient weight unknown",
                delta,
                drug_id
            );
            return Ok(IncrementOutcome::WeightUnknown);
        }

        let previous = self.units.get(drug_id);
        let requested = i64::from(previous).saturating_add(delta);
        let current = requested.clamp(0, i64::from(u32::MAX)) as u32;

        if current == previous {
            tracing::debug!("Count for {} unchanged at {}", drug_id, previous);
            return Ok(IncrementOutcome::Unchanged { count: previous });
        }

        let mut units = self.units.clone();
        units.set(drug_id, current);
        self.commit(self.profile.clone(), units)?;

        tracing::debug!("Count for {}: {} -> {}", drug_id, previous, current);
        if requested < 0 {
            Ok(IncrementOutcome::ClampedAtZero { previous })
        } else {
            Ok(IncrementOutcome::Applied { previous, current })
        }
    }

    /// Zero every count in one step. Weight and risk class are kept.
    pub fn reset_all(&mut self) -> Result<()> {
        let mut units = self.units.clone();
        units.clear();
        self.commit(self.profile.clone(), units)?;
        tracing::info!("Cleared all administered units");
        Ok(())
    }

    /// Full patient-record reset: counts, weight and risk class together
    pub fn reset_patient(&mut self) -> Result<()> {
        let mut units = self.units.clone();
        units.clear();
        let profile = PatientProfile {
            weight_unit: self.profile.weight_unit,
            ..PatientProfile::default()
        };
        self.commit(profile, units)?;
        tracing::info!("Reset patient record for session {}", self.id);
        Ok(())
    }

    fn drug(&self, drug_id: &str) -> Result<&'f crate::DrugDefinition> {
        self.formulary.get(drug_id).ok_or_else(|| {
            tracing::error!("Drug id '{}' is not in the formulary", drug_id);
            Error::UnknownDrug {
                id: drug_id.to_string(),
            }
        })
    }

    /// Evaluate the candidate state and publish it only if evaluation succeeds
    fn commit(&mut self, profile: PatientProfile, units: AdministeredUnits) -> Result<()> {
        let summary = evaluate(self.formulary, &profile, &units)?;
        self.profile = profile;
        self.units = units;
        self.summary = summary;
        Ok(())
    }
}
