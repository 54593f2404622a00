use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use maxsafe_core::units::{convert_weight, normalize_weight};
use maxsafe_core::*;
use std::io;
use std::path::PathBuf;

mod render;
mod repl;

#[derive(Parser)]
#[command(name = "maxsafe")]
#[command(about = "Local anesthetic cumulative toxicity calculator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Use this formulary TOML instead of the configured one
    #[arg(long, global = true)]
    formulary: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (repeatable)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Less log output (repeatable)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    quiet: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a set of administered cartridges once
    Calc {
        /// Patient weight
        #[arg(long, allow_negative_numbers = true)]
        weight: Option<f64>,

        /// Unit of --weight (kg or lb)
        #[arg(long, default_value = "kg")]
        unit: WeightUnit,

        /// Cardiac or medically compromised patient
        #[arg(long)]
        high_risk: bool,

        /// Administered cartridges, e.g. --dose lidocaine-2-epi-100k=2
        #[arg(long = "dose", value_name = "ID=UNITS", value_parser = parse_dose)]
        doses: Vec<(String, i64)>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List the drugs in the formulary
    Drugs,

    /// Convert a weight between kg and lb (display rounding)
    Convert {
        #[arg(long, allow_negative_numbers = true)]
        weight: f64,

        #[arg(long)]
        from: WeightUnit,

        #[arg(long)]
        to: WeightUnit,
    },

    /// Interactive session reading commands from stdin (default)
    Session,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

fn parse_dose(s: &str) -> std::result::Result<(String, i64), String> {
    let (id, units) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid dose '{}': expected ID=UNITS", s))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(format!("invalid dose '{}': empty drug id", s));
    }
    let units = units
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("invalid unit count in '{}': {}", s, e))?;
    Ok((id.to_string(), units))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    maxsafe_core::logging::init_with_level(maxsafe_core::logging::level_for_verbosity(
        cli.verbose,
        cli.quiet,
    ));

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let formulary = config.resolve_formulary(cli.formulary.as_deref())?;
    let errors = formulary.validate();
    if !errors.is_empty() {
        eprintln!("Formulary validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::FormularyValidation("Invalid formulary".into()));
    }

    match cli.command {
        Some(Commands::Calc {
            weight,
            unit,
            high_risk,
            doses,
            format,
        }) => cmd_calc(&formulary, &config, weight, unit, high_risk, &doses, format),
        Some(Commands::Drugs) => {
            render::print_formulary(&formulary);
            Ok(())
        }
        Some(Commands::Convert { weight, from, to }) => cmd_convert(weight, from, to),
        Some(Commands::Session) | None => {
            let stdin = io::stdin();
            repl::run(&formulary, &config, stdin.lock())
        }
    }
}

fn cmd_calc(
    formulary: &Formulary,
    config: &Config,
    weight: Option<f64>,
    unit: WeightUnit,
    high_risk: bool,
    doses: &[(String, i64)],
    format: OutputFormat,
) -> Result<()> {
    let mut session = Session::new(formulary);
    session.set_high_risk(high_risk)?;

    match weight.or(config.patient.default_weight) {
        Some(value) => {
            let unit = if weight.is_some() {
                unit
            } else {
                config.patient.default_unit
            };
            session.set_weight(value, unit)?;
        }
        None => tracing::info!("No weight given, calculations disabled"),
    }

    let mut rejected = false;
    for (drug_id, units) in doses {
        if session.increment_drug(drug_id, *units)? == IncrementOutcome::WeightUnknown {
            rejected = true;
        }
    }

    match format {
        OutputFormat::Text => {
            render::print_summary(&session, config.display.decimals);
            if rejected {
                println!("  Doses were ignored: patient weight is unknown.");
            }
        }
        OutputFormat::Json => {
            println!("{}", SummaryReport::from_session(&session).to_json()?);
        }
        OutputFormat::Csv => {
            SummaryReport::from_session(&session).write_csv(io::stdout().lock())?;
        }
    }

    Ok(())
}

fn cmd_convert(weight: f64, from: WeightUnit, to: WeightUnit) -> Result<()> {
    if normalize_weight(weight, from).is_none() {
        return Err(Error::Other(format!(
            "Weight must be a positive number, got {}",
            weight
        )));
    }

    println!("{:.1} {}", convert_weight(weight, from, to), to);
    Ok(())
}
