//! Error types for the dosis_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for dosis_core operations
///
/// Expected clinical outcomes (no dosing tier, missing presentation, a rejected
/// selection) are values, not errors. These variants cover I/O, bad reference
/// data and caller mistakes.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog validation error
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),

    /// Unknown drug, condition or symptom id
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid patient parameters
    #[error("Invalid patient: {0}")]
    Patient(String),

    /// Preset store error
    #[error("Preset error: {0}")]
    Preset(String),

    /// Label lookup error (only ever surfaced by a label source)
    #[error("Label lookup error: {0}")]
    Label(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
