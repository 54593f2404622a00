//! Report export for a session snapshot (JSON and CSV).
//!
//! Reports are produced on demand from the current summary and are not
//! persisted anywhere by the engine.

use crate::{PatientProfile, Result, Session, ToxicityBand, ToxicitySummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use uuid::Uuid;

/// One row per active drug, flattened for tabular output
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReportLine {
    pub drug_id: String,
    pub drug_name: String,
    pub units: u32,
    pub volume_ml: f64,
    pub delivered_mg: f64,
    pub vasoconstrictor_mg: f64,
    pub ceiling_mg: f64,
    pub percent_of_ceiling: f64,
    pub band: ToxicityBand,
}

/// Serializable view of a session at one point in time
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SummaryReport {
    pub session_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub patient: PatientProfile,
    pub weight_kg: Option<f64>,
    pub drugs: Vec<ReportLine>,
    pub cumulative_fraction_percent: f64,
    pub cumulative_band: ToxicityBand,
    pub total_vasoconstrictor_mg: f64,
    pub vasoconstrictor_limit_mg: f64,
    pub vasoconstrictor_load_percent: f64,
    pub vasoconstrictor_band: ToxicityBand,
}

impl SummaryReport {
    pub fn from_session(session: &Session<'_>) -> Self {
        let summary: &ToxicitySummary = session.summary();
        let formulary = session.formulary();

        let drugs = summary
            .lines
            .iter()
            .zip(&summary.fractions)
            .map(|(line, fraction)| ReportLine {
                drug_id: line.drug_id.clone(),
                drug_name: formulary
                    .get(&line.drug_id)
                    .map(|d| d.display_name())
                    .unwrap_or_else(|| line.drug_id.clone()),
                units: line.units,
                volume_ml: line.volume_ml,
                delivered_mg: line.delivered_mg,
                vasoconstrictor_mg: line.vasoconstrictor_mg,
                ceiling_mg: fraction.ceiling_mg,
                percent_of_ceiling: fraction.percent(),
                band: fraction.band(),
            })
            .collect();

        Self {
            session_id: session.id(),
            generated_at: Utc::now(),
            patient: session.profile().clone(),
            weight_kg: session.profile().weight_kg(),
            drugs,
            cumulative_fraction_percent: summary.cumulative_fraction_percent,
            cumulative_band: summary.cumulative_band(),
            total_vasoconstrictor_mg: summary.total_vasoconstrictor_mg,
            vasoconstrictor_limit_mg: summary.vasoconstrictor_limit_mg,
            vasoconstrictor_load_percent: summary.vasoconstrictor_load_percent,
            vasoconstrictor_band: summary.vasoconstrictor_band(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the per-drug rows as CSV with a header line
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        if self.drugs.is_empty() {
            csv_writer.write_record(REPORT_CSV_HEADER)?;
        }
        for line in &self.drugs {
            csv_writer.serialize(line)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

const REPORT_CSV_HEADER: [&str; 9] = [
    "drug_id",
    "drug_name",
    "units",
    "volume_ml",
    "delivered_mg",
    "vasoconstrictor_mg",
    "ceiling_mg",
    "percent_of_ceiling",
    "band",
];
