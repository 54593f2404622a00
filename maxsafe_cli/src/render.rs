//! Terminal rendering of formulary listings and session summaries.

use maxsafe_core::ceiling::weight_based_max_mg;
use maxsafe_core::{Formulary, Session, ToxicityBand};

pub fn print_formulary(formulary: &Formulary) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  FORMULARY ({} drugs)", formulary.drugs.len());
    println!("╰─────────────────────────────────────────╯");
    println!();

    for (index, drug) in formulary.drugs.iter().enumerate() {
        println!("  [{}] {}", index + 1, drug.display_name());
        println!("      id: {}", drug.id);
        println!(
            "      {}mg/kg (max {}mg) • {}mL cartridges",
            drug.max_dose_per_kg_mg, drug.absolute_max_mg, drug.unit_volume_ml
        );

        let timing: Vec<String> = [
            drug.onset.as_ref().map(|v| format!("Onset: {}", v)),
            drug.duration.as_ref().map(|v| format!("Duration: {}", v)),
            drug.half_life.as_ref().map(|v| format!("t½: {}", v)),
        ]
        .into_iter()
        .flatten()
        .collect();
        if !timing.is_empty() {
            println!("      {}", timing.join(" • "));
        }
    }

    println!();
    println!(
        "  Epinephrine limits: {} mg standard, {} mg high risk",
        formulary.vasoconstrictor_limits.standard_mg,
        formulary.vasoconstrictor_limits.high_risk_mg
    );
    println!();
}

pub fn print_summary(session: &Session<'_>, decimals: usize) {
    let profile = session.profile();
    let summary = session.summary();

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  LOCAL ANESTHETIC TOXICITY");
    println!("╰─────────────────────────────────────────╯");
    println!();

    let class = if profile.high_risk {
        "Cardiac / high risk"
    } else {
        "Healthy"
    };
    match (profile.display_weight(), profile.weight_kg()) {
        (Some(shown), Some(kg)) => println!(
            "  Patient: {:.1} {} (= {:.1} kg), {}",
            shown, profile.weight_unit, kg, class
        ),
        _ => {
            println!("  Patient: weight unknown, {}", class);
            println!("  Enter patient weight to enable calculations.");
        }
    }
    println!();

    println!(
        "  Cumulative LA toxicity: {:.*}% {}",
        decimals,
        summary.cumulative_fraction_percent,
        band_marker(summary.cumulative_band())
    );
    println!(
        "  Epinephrine load:       {:.*}% {} of {} mg",
        decimals,
        summary.vasoconstrictor_load_percent,
        band_marker(summary.vasoconstrictor_band()),
        summary.vasoconstrictor_limit_mg
    );
    println!(
        "    {:.3} mg ({:.0} mcg)",
        summary.total_vasoconstrictor_mg,
        summary.total_vasoconstrictor_mg * 1000.0
    );

    if !summary.lines.is_empty() {
        println!("    {} cartridges in total", session.units().total());
    }

    for (line, fraction) in summary.lines.iter().zip(&summary.fractions) {
        let drug = session.formulary().get(&line.drug_id);
        let name = drug
            .map(|d| d.display_name())
            .unwrap_or_else(|| line.drug_id.clone());

        println!();
        println!("  {}", name);
        let mut detail = format!(
            "    {} cartridges • {:.1} mL • {:.0} mg",
            line.units, line.volume_ml, line.delivered_mg
        );
        if line.vasoconstrictor_mg > 0.0 {
            detail.push_str(&format!(" • {:.0} mcg epi", line.vasoconstrictor_mg * 1000.0));
        }
        println!("{}", detail);
        println!(
            "    {:.*}% of {:.0} mg max {}",
            decimals,
            fraction.percent(),
            fraction.ceiling_mg,
            band_marker(fraction.band())
        );
        if let Some(by_weight) = drug.and_then(|d| weight_based_max_mg(d, profile.weight_kg())) {
            if by_weight > fraction.ceiling_mg {
                println!("    (absolute cap; {:.0} mg by weight)", by_weight);
            }
        }
    }

    println!();
}

/// One-line status printed after each interactive command
pub fn status_line(session: &Session<'_>, decimals: usize) -> String {
    let summary = session.summary();
    format!(
        "Cumulative {:.*}% [{}] | Epinephrine {:.*}% [{}]",
        decimals,
        summary.cumulative_fraction_percent,
        summary.cumulative_band(),
        decimals,
        summary.vasoconstrictor_load_percent,
        summary.vasoconstrictor_band()
    )
}

fn band_marker(band: ToxicityBand) -> String {
    match band {
        ToxicityBand::WithinRange => format!("✓ {}", band),
        ToxicityBand::ApproachingLimit => format!("⚠ {}", band),
        ToxicityBand::OverLimit => format!("✗ {}", band),
    }
}
