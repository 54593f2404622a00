//! Line-oriented interactive session.
//!
//! Each input line is one command. Mistyped commands and unknown drug ids
//! print an error and the session carries on; I/O errors end it.

use crate::render;
use maxsafe_core::*;
use std::io::{self, BufRead, Write};

const HELP: &str = "\
Commands:
  weight <value> [kg|lb]   set patient weight
  weight clear             forget the weight (counts are kept)
  unit <kg|lb>             switch the weight unit
  risk <high|standard>     set patient class
  add <drug> [n]           add n cartridges (default 1)
  remove <drug> [n]        remove n cartridges (default 1)
  clear                    zero all cartridge counts
  reset                    reset the whole patient record
  show                     print the full summary
  drugs                    list the formulary
  help                     show this help
  quit                     leave the session
<drug> is a formulary id or its number from 'drugs'.";

enum Step {
    Continue,
    Quit,
}

pub fn run(formulary: &Formulary, config: &Config, input: impl BufRead) -> Result<()> {
    let mut session = Session::new(formulary);
    apply_patient_defaults(&mut session, config)?;

    println!("MaxSafe session {} (type 'help' for commands)", session.id());
    println!("{}", render::status_line(&session, config.display.decimals));
    prompt()?;

    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            match execute(&mut session, config, line) {
                Ok(Step::Quit) => return Ok(()),
                Ok(Step::Continue) => {}
                Err(e @ (Error::UnknownDrug { .. } | Error::Other(_))) => {
                    eprintln!("error: {}", e);
                }
                Err(e) => return Err(e),
            }
        }
        prompt()?;
    }

    println!();
    Ok(())
}

fn prompt() -> Result<()> {
    print!("> ");
    io::stdout().flush()?;
    Ok(())
}

fn apply_patient_defaults(session: &mut Session<'_>, config: &Config) -> Result<()> {
    if let Some(weight) = config.patient.default_weight {
        session.set_weight(weight, config.patient.default_unit)?;
    }
    Ok(())
}

fn execute(session: &mut Session<'_>, config: &Config, line: &str) -> Result<Step> {
    let decimals = config.display.decimals;
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default().to_lowercase();
    let args: Vec<&str> = parts.collect();

    match command.as_str() {
        "weight" | "w" => {
            let value_arg = args
                .first()
                .ok_or_else(|| Error::Other("usage: weight <value> [kg|lb]".into()))?;
            if value_arg.eq_ignore_ascii_case("clear") {
                session.clear_weight()?;
                println!("Weight cleared; calculations disabled.");
                println!("{}", render::status_line(session, decimals));
                return Ok(Step::Continue);
            }
            let unit = match args.get(1) {
                Some(u) => u.parse::<WeightUnit>()?,
                None => session.profile().weight_unit,
            };
            // unparseable input counts as unknown weight
            let value = value_arg.parse::<f64>().unwrap_or(f64::NAN);
            if session.set_weight(value, unit)?.is_none() {
                println!("Weight is unknown; calculations disabled.");
            }
        }
        "unit" => {
            let unit = args
                .first()
                .ok_or_else(|| Error::Other("usage: unit <kg|lb>".into()))?
                .parse::<WeightUnit>()?;
            session.set_weight_unit(unit)?;
            if let Some(shown) = session.profile().display_weight() {
                println!("Weight: {:.1} {}", shown, unit);
            }
        }
        "risk" => {
            let high_risk = match args.first().map(|s| s.to_lowercase()).as_deref() {
                Some("high" | "cardiac" | "on" | "yes") => true,
                Some("standard" | "healthy" | "off" | "no") => false,
                _ => return Err(Error::Other("usage: risk <high|standard>".into())),
            };
            session.set_high_risk(high_risk)?;
        }
        "add" | "+" | "remove" | "-" => {
            let drug_arg = args
                .first()
                .ok_or_else(|| Error::Other(format!("usage: {} <drug> [n]", command)))?;
            let n = match args.get(1) {
                Some(n) => n
                    .parse::<i64>()
                    .map_err(|_| Error::Other(format!("invalid count '{}'", n)))?,
                None => 1,
            };
            let delta = if matches!(command.as_str(), "remove" | "-") {
                n.saturating_neg()
            } else {
                n
            };

            let drug_id = resolve_drug(session.formulary(), drug_arg);
            match session.increment_drug(&drug_id, delta)? {
                IncrementOutcome::WeightUnknown => {
                    println!("Enter patient weight before adding cartridges.");
                }
                IncrementOutcome::Unchanged { count } if delta < 0 && count == 0 => {
                    println!("Nothing to remove.");
                }
                _ => {}
            }
        }
        "clear" => session.reset_all()?,
        "reset" => {
            session.reset_patient()?;
            apply_patient_defaults(session, config)?;
            println!("Patient record reset.");
        }
        "show" => {
            render::print_summary(session, decimals);
            return Ok(Step::Continue);
        }
        "drugs" => {
            render::print_formulary(session.formulary());
            return Ok(Step::Continue);
        }
        "help" | "?" => {
            println!("{}", HELP);
            return Ok(Step::Continue);
        }
        "quit" | "exit" | "q" => return Ok(Step::Quit),
        other => {
            return Err(Error::Other(format!(
                "unknown command '{}' (type 'help')",
                other
            )))
        }
    }

    println!("{}", render::status_line(session, decimals));
    Ok(Step::Continue)
}

/// Accept either a formulary id or its 1-based listing number
fn resolve_drug(formulary: &Formulary, arg: &str) -> String {
    arg.parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| formulary.drugs.get(index))
        .map(|drug| drug.id.clone())
        .unwrap_or_else(|| arg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_drug_by_number_or_id() {
        let formulary = get_default_formulary();
        assert_eq!(resolve_drug(formulary, "1"), "lidocaine-2-epi-100k");
        assert_eq!(resolve_drug(formulary, "5"), "prilocaine-4-plain");
        assert_eq!(resolve_drug(formulary, "0"), "0");
        assert_eq!(resolve_drug(formulary, "9"), "9");
        assert_eq!(
            resolve_drug(formulary, "articaine-4-epi-100k"),
            "articaine-4-epi-100k"
        );
    }

    #[test]
    fn test_execute_flow() {
        let formulary = get_default_formulary();
        let config = Config::default();
        let mut session = Session::new(formulary);

        execute(&mut session, &config, "add 1").unwrap();
        assert_eq!(session.count("lidocaine-2-epi-100k"), 0);

        execute(&mut session, &config, "weight 70 kg").unwrap();
        execute(&mut session, &config, "add 1 2").unwrap();
        assert_eq!(session.count("lidocaine-2-epi-100k"), 2);

        execute(&mut session, &config, "remove lidocaine-2-epi-100k 5").unwrap();
        assert_eq!(session.count("lidocaine-2-epi-100k"), 0);

        execute(&mut session, &config, "add 2 1").unwrap();
        execute(&mut session, &config, "weight clear").unwrap();
        assert!(!session.profile().is_weight_known());
        assert_eq!(session.count("articaine-4-epi-100k"), 1);
        execute(&mut session, &config, "weight 70").unwrap();

        execute(&mut session, &config, "risk high").unwrap();
        assert!(session.profile().high_risk);

        execute(&mut session, &config, "reset").unwrap();
        assert!(!session.profile().high_risk);
        assert!(!session.profile().is_weight_known());

        assert!(matches!(
            execute(&mut session, &config, "quit"),
            Ok(Step::Quit)
        ));
    }

    #[test]
    fn test_execute_errors_are_recoverable() {
        let formulary = get_default_formulary();
        let config = Config::default();
        let mut session = Session::new(formulary);
        execute(&mut session, &config, "weight 70").unwrap();

        assert!(matches!(
            execute(&mut session, &config, "add nothing"),
            Err(Error::UnknownDrug { .. })
        ));
        assert!(matches!(
            execute(&mut session, &config, "dance"),
            Err(Error::Other(_))
        ));
        assert!(matches!(
            execute(&mut session, &config, "unit stone"),
            Err(Error::Other(_))
        ));
    }
}
