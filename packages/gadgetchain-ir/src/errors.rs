//! Error types for gadgetchain-ir
//!
//! Only loading (program model, rule table, options) and report output can fail.
//! The analysis itself never returns an error: unresolvable targets are skipped.

use crate::config::ConfigError;
use thiserror::Error;

/// Main error type for gadgetchain-ir operations
#[derive(Debug, Error)]
pub enum GadgetError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration / rule table error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Program model is internally inconsistent
    #[error("Program model error: {0}")]
    Program(String),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Analysis error
    #[error("Analysis error: {0}")]
    Analysis(String),
}

impl GadgetError {
    /// Create a program model error
    pub fn program(msg: impl Into<String>) -> Self {
        GadgetError::Program(msg.into())
    }

    /// Create an analysis error
    pub fn analysis(msg: impl Into<String>) -> Self {
        GadgetError::Analysis(msg.into())
    }
}

/// Result type alias for gadgetchain operations
pub type Result<T> = std::result::Result<T, GadgetError>;
