//! Error types for the maxsafe_core library.
//!
//! Recoverable input problems (unknown weight, decrements below zero) are not
//! errors; see [`crate::session::IncrementOutcome`].

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for maxsafe_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Formulary failed validation
    #[error("Formulary validation error: {0}")]
    FormularyValidation(String),

    /// A mutation named a drug the formulary does not contain.
    /// This is a caller/formulary mismatch, not a user-input problem.
    #[error("Unknown drug id '{id}'")]
    UnknownDrug { id: String },

    /// Generic error
    #[error("{0}")]
    Other(String),
}
