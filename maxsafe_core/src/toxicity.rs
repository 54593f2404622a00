//! Cumulative toxicity aggregation.
//!
//! This module implements the fractional rule:
//! - Each active drug contributes `delivered / ceiling` to a shared budget
//! - Contributions are summed across drugs regardless of chemical class
//! - Vasoconstrictor mass is summed separately and judged against a limit
//!   selected by the patient's risk class
//!
//! All percentages are returned raw (possibly above 100). Clamping for
//! gauges and progress bars is left to the consumer.

use crate::ceiling::effective_ceiling_mg;
use crate::dose::active_dose_lines;
use crate::{
    AdministeredUnits, DoseLine, DrugFraction, Error, Formulary, PatientProfile, Result,
    ToxicityBand, ToxicitySummary,
};

/// Upper bound (inclusive) of the within-range band, in percent
pub const WARNING_THRESHOLD_PERCENT: f64 = 80.0;

/// Upper bound (inclusive) of the approaching-limit band, in percent
pub const LIMIT_THRESHOLD_PERCENT: f64 = 100.0;

/// Classify a raw percentage of a limit.
///
/// `<= 80` is within range, `> 80 && <= 100` is approaching the limit and
/// `> 100` is over, including `+inf`. NaN is treated as zero.
pub fn classify(percent: f64) -> ToxicityBand {
    if percent.is_nan() {
        return ToxicityBand::WithinRange;
    }

    if percent > LIMIT_THRESHOLD_PERCENT {
        ToxicityBand::OverLimit
    } else if percent > WARNING_THRESHOLD_PERCENT {
        ToxicityBand::ApproachingLimit
    } else {
        ToxicityBand::WithinRange
    }
}

/// Combine active dose lines into a summary.
///
/// Lines are accumulated in the order given, which callers keep as formulary
/// declaration order so the floating-point sum is reproducible.
pub fn aggregate(
    lines: &[DoseLine],
    formulary: &Formulary,
    weight_kg: Option<f64>,
    high_risk: bool,
) -> Result<ToxicitySummary> {
    let limit_mg = formulary.vasoconstrictor_limits.for_patient(high_risk);

    if weight_kg.is_none() || lines.is_empty() {
        return Ok(ToxicitySummary::baseline(limit_mg));
    }

    let mut total_fraction = 0.0;
    let mut total_vaso_mg = 0.0;
    let mut fractions = Vec::with_capacity(lines.len());

    for line in lines {
        let drug = formulary.get(&line.drug_id).ok_or_else(|| Error::UnknownDrug {
            id: line.drug_id.clone(),
        })?;

        let ceiling_mg = effective_ceiling_mg(drug, weight_kg);
        // a ceiling that underflows to zero makes any delivered dose infinite
        let fraction = if line.delivered_mg > 0.0 {
            line.delivered_mg / ceiling_mg
        } else {
            0.0
        };

        total_fraction += fraction;
        total_vaso_mg += line.vasoconstrictor_mg;

        fractions.push(DrugFraction {
            drug_id: line.drug_id.clone(),
            ceiling_mg,
            fraction,
        });
    }

    let vaso_percent = if limit_mg > 0.0 {
        total_vaso_mg / limit_mg * 100.0
    } else {
        0.0
    };

    Ok(ToxicitySummary {
        lines: lines.to_vec(),
        fractions,
        cumulative_fraction_percent: total_fraction * 100.0,
        total_vasoconstrictor_mg: total_vaso_mg,
        vasoconstrictor_limit_mg: limit_mg,
        vasoconstrictor_load_percent: vaso_percent,
    })
}

/// Run the full pipeline: accumulate doses, resolve ceilings, aggregate.
///
/// With unknown weight the result is the empty baseline even if counts are
/// non-zero.
pub fn evaluate(
    formulary: &Formulary,
    profile: &PatientProfile,
    units: &AdministeredUnits,
) -> Result<ToxicitySummary> {
    let weight_kg = profile.weight_kg();
    let lines = match weight_kg {
        Some(_) => active_dose_lines(formulary, units),
        None => Vec::new(),
    };

    let summary = aggregate(&lines, formulary, weight_kg, profile.high_risk)?;
    tracing::debug!(
        "Evaluated {} active drugs: cumulative {:.1}%, vasoconstrictor {:.1}%",
        summary.lines.len(),
        summary.cumulative_fraction_percent,
        summary.vasoconstrictor_load_percent
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        build_default_formulary, dose::derive_dose_line, DrugDefinition, VasoconstrictorLimits,
        WeightUnit,
    };

    fn test_drug(id: &str, conc: f64, per_kg: f64, abs_max: f64, vaso: f64) -> DrugDefinition {
        DrugDefinition {
            id: id.into(),
            name: id.into(),
            vasoconstrictor_ratio: "Plain".into(),
            concentration_mg_per_ml: conc,
            max_dose_per_kg_mg: per_kg,
            absolute_max_mg: abs_max,
            vasoconstrictor_mg_per_ml: vaso,
            unit_volume_ml: 1.0,
            class: None,
            onset: None,
            duration: None,
            half_life: None,
        }
    }

    fn two_drug_formulary() -> Formulary {
        Formulary {
            vasoconstrictor_limits: VasoconstrictorLimits::default(),
            drugs: vec![
                // 100 kg -> ceiling 100 mg (weight-limited)
                test_drug("alpha", 10.0, 1.0, 1000.0, 0.01),
                // 100 kg -> 1000 mg capped at 40 mg (absolute-limited)
                test_drug("beta", 20.0, 10.0, 40.0, 0.0),
            ],
        }
    }

    fn profile_kg(kg: f64, high_risk: bool) -> PatientProfile {
        PatientProfile {
            weight_value: Some(kg),
            weight_unit: WeightUnit::Kg,
            high_risk,
        }
    }

    #[test]
    fn test_classify_bands() {
        assert_eq!(classify(0.0), ToxicityBand::WithinRange);
        assert_eq!(classify(80.0), ToxicityBand::WithinRange);
        assert_eq!(classify(80.0001), ToxicityBand::ApproachingLimit);
        assert_eq!(classify(100.0001), ToxicityBand::OverLimit);
        assert_eq!(classify(250.0), ToxicityBand::OverLimit);
        assert_eq!(classify(f64::NAN), ToxicityBand::WithinRange);
        assert_eq!(classify(f64::INFINITY), ToxicityBand::OverLimit);
    }

    #[test]
    fn test_exactly_one_hundred_is_approaching_not_over() {
        assert_eq!(classify(100.0), ToxicityBand::ApproachingLimit);
    }

    #[test]
    fn test_end_to_end_lidocaine() {
        let formulary = build_default_formulary();
        let mut units = AdministeredUnits::for_formulary(&formulary);
        units.set("lidocaine-2-epi-100k", 2);

        let summary = evaluate(&formulary, &profile_kg(70.0, false), &units).unwrap();

        let line = summary.line("lidocaine-2-epi-100k").unwrap();
        assert!((line.delivered_mg - 68.0).abs() < 1e-9);

        let fraction = summary.fraction("lidocaine-2-epi-100k").unwrap();
        assert!((fraction.ceiling_mg - 490.0).abs() < 1e-9);
        assert!((fraction.fraction - 68.0 / 490.0).abs() < 1e-12);
        assert!((summary.cumulative_fraction_percent - 13.877_551).abs() < 1e-4);
        assert_eq!(summary.cumulative_band(), ToxicityBand::WithinRange);

        // 3.4 mL * 0.01 mg/mL = 0.034 mg of 0.2 mg
        assert!((summary.total_vasoconstrictor_mg - 0.034).abs() < 1e-12);
        assert!((summary.vasoconstrictor_load_percent - 17.0).abs() < 1e-9);
    }

    #[test]
    fn test_fractions_are_additive_across_drugs() {
        let formulary = two_drug_formulary();
        let mut units = AdministeredUnits::for_formulary(&formulary);
        // alpha: 5 units = 50 mg of 100 mg
        units.set("alpha", 5);
        // beta: 1 unit = 20 mg of 40 mg
        units.set("beta", 1);

        let summary = evaluate(&formulary, &profile_kg(100.0, false), &units).unwrap();

        assert_eq!(summary.fractions.len(), 2);
        assert_eq!(summary.fraction("alpha").unwrap().fraction, 0.5);
        assert_eq!(summary.fraction("beta").unwrap().fraction, 0.5);
        assert_eq!(summary.cumulative_fraction_percent, 100.0);
        assert_eq!(summary.cumulative_band(), ToxicityBand::ApproachingLimit);

        units.set("beta", 2);
        let summary = evaluate(&formulary, &profile_kg(100.0, false), &units).unwrap();
        assert_eq!(summary.cumulative_fraction_percent, 150.0);
        assert_eq!(summary.cumulative_band(), ToxicityBand::OverLimit);
    }

    #[test]
    fn test_percentages_are_not_clamped() {
        let formulary = build_default_formulary();
        let mut units = AdministeredUnits::for_formulary(&formulary);
        // 10 * 1.8 mL * 5 mg/mL = 90 mg per 10 cartridges; 30 cartridges = 270 mg of 90
        units.set("bupivacaine-05-epi-100k", 30);

        let summary = evaluate(&formulary, &profile_kg(70.0, false), &units).unwrap();
        assert!((summary.cumulative_fraction_percent - 300.0).abs() < 1e-9);
        assert!(summary.vasoconstrictor_load_percent > 100.0);
        assert_eq!(summary.overall_band(), ToxicityBand::OverLimit);
    }

    #[test]
    fn test_vanishing_ceiling_is_over_limit() {
        let formulary = Formulary {
            vasoconstrictor_limits: VasoconstrictorLimits::default(),
            drugs: vec![test_drug("tiny", 10.0, 0.1, 100.0, 0.0)],
        };
        let mut units = AdministeredUnits::for_formulary(&formulary);
        units.set("tiny", 1);

        // 0.1 mg/kg of the smallest subnormal weight underflows to a 0 mg ceiling
        let summary = evaluate(&formulary, &profile_kg(5e-324, false), &units).unwrap();
        assert_eq!(summary.fractions[0].ceiling_mg, 0.0);
        assert_eq!(summary.cumulative_fraction_percent, f64::INFINITY);
        assert_eq!(summary.fractions[0].band(), ToxicityBand::OverLimit);
        assert_eq!(summary.overall_band(), ToxicityBand::OverLimit);
    }

    #[test]
    fn test_high_risk_selects_reduced_vasoconstrictor_limit() {
        let formulary = build_default_formulary();
        let mut units = AdministeredUnits::for_formulary(&formulary);
        units.set("articaine-4-epi-100k", 2);

        let standard = evaluate(&formulary, &profile_kg(70.0, false), &units).unwrap();
        let high_risk = evaluate(&formulary, &profile_kg(70.0, true), &units).unwrap();

        assert_eq!(standard.vasoconstrictor_limit_mg, 0.2);
        assert_eq!(high_risk.vasoconstrictor_limit_mg, 0.04);
        assert_eq!(
            standard.total_vasoconstrictor_mg,
            high_risk.total_vasoconstrictor_mg
        );
        // 0.034 mg: 17% standard, 85% high risk
        assert_eq!(standard.vasoconstrictor_band(), ToxicityBand::WithinRange);
        assert_eq!(high_risk.vasoconstrictor_band(), ToxicityBand::ApproachingLimit);
        // the anesthetic fraction does not depend on risk class
        assert_eq!(
            standard.cumulative_fraction_percent,
            high_risk.cumulative_fraction_percent
        );
    }

    #[test]
    fn test_plain_drugs_add_no_vasoconstrictor_load() {
        let formulary = build_default_formulary();
        let mut units = AdministeredUnits::for_formulary(&formulary);
        units.set("mepivacaine-3-plain", 4);
        units.set("prilocaine-4-plain", 2);

        let summary = evaluate(&formulary, &profile_kg(60.0, true), &units).unwrap();
        assert!(summary.cumulative_fraction_percent > 0.0);
        assert_eq!(summary.total_vasoconstrictor_mg, 0.0);
        assert_eq!(summary.vasoconstrictor_load_percent, 0.0);
    }

    #[test]
    fn test_unknown_weight_yields_baseline() {
        let formulary = build_default_formulary();
        let mut units = AdministeredUnits::for_formulary(&formulary);
        units.set("lidocaine-2-epi-100k", 3);

        let profile = PatientProfile::default();
        let summary = evaluate(&formulary, &profile, &units).unwrap();
        assert!(summary.is_baseline());
        assert_eq!(summary.vasoconstrictor_limit_mg, 0.2);
    }

    #[test]
    fn test_aggregate_rejects_line_outside_formulary() {
        let formulary = two_drug_formulary();
        let stranger = test_drug("gamma", 1.0, 1.0, 1.0, 0.0);
        let lines = vec![derive_dose_line(&stranger, 1)];

        let err = aggregate(&lines, &formulary, Some(70.0), false).unwrap_err();
        assert!(matches!(err, Error::UnknownDrug { ref id } if id == "gamma"));
    }

    #[test]
    fn test_evaluation_is_reproducible() {
        let formulary = build_default_formulary();
        let mut units = AdministeredUnits::for_formulary(&formulary);
        for (i, drug) in formulary.drugs.iter().enumerate() {
            units.set(&drug.id, i as u32 + 1);
        }
        let profile = profile_kg(63.7, false);

        let first = evaluate(&formulary, &profile, &units).unwrap();
        let second = evaluate(&formulary, &profile, &units).unwrap();
        assert_eq!(
            first.cumulative_fraction_percent.to_bits(),
            second.cumulative_fraction_percent.to_bits()
        );
        assert_eq!(first, second);
    }
}
