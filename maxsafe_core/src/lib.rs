#![forbid(unsafe_code)]

//! Core dose and toxicity engine for MaxSafe.
//!
//! This crate provides:
//! - Domain types (drug definitions, patient profile, unit counts, summaries)
//! - The built-in local anesthetic formulary
//! - Weight normalization, dose accumulation and ceiling resolution
//! - Fractional-rule toxicity aggregation and threshold bands
//! - A per-patient calculation session
//! - Report export, configuration and logging

pub mod types;
pub mod error;
pub mod formulary;
pub mod config;
pub mod logging;
pub mod units;
pub mod dose;
pub mod ceiling;
pub mod toxicity;
pub mod session;
pub mod report;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use formulary::{build_default_formulary, get_default_formulary};
pub use config::Config;
pub use session::{IncrementOutcome, Session};
pub use toxicity::{classify, evaluate};
pub use report::SummaryReport;
