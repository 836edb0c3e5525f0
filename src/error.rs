//! This module defines all error types used throughout the application.

use crate::state_machine::State;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    /// IO errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Malformed or cyclic transition catalog, bad configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Snapshot length differs from the unit count of the run
    #[error("Shape error on day {day}: expected {expected} units, found {found}")]
    Shape {
        expected: usize,
        found: usize,
        day: usize,
    },

    /// An observed state change has no compiled path in the transition graph
    #[error("No transition path from state {from} to state {to} (unit {unit}, day {day})")]
    MissingTransition {
        from: State,
        to: State,
        day: usize,
        unit: usize,
    },

    /// Query for a state or state pair the graph does not know
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed trace text
    #[error("Trace error at line {line}: {message}")]
    Trace { line: usize, message: String },

    /// Catalog file parsing errors
    #[error("Catalog parsing error in {file:?}: {message}")]
    CatalogParse { file: PathBuf, message: String },

    /// Generic error with custom message
    #[error("{0}")]
    Custom(String),

    /// Wrapped anyhow errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a custom error with a message
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a trace error for the given 1-based line number
    pub fn trace(line: usize, msg: impl Into<String>) -> Self {
        Self::Trace {
            line,
            message: msg.into(),
        }
    }

    /// Check if error signals a catalog/trajectory mismatch
    pub fn is_missing_transition(&self) -> bool {
        matches!(self, Error::MissingTransition { .. })
    }
}

// Implement From traits for common external error types

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::CatalogParse {
            file: PathBuf::from("unknown"),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Custom(format!("JSON error: {}", err))
    }
}

// Helper macros for creating errors

/// Create a custom error with formatting
#[macro_export]
macro_rules! custom_error {
    ($($arg:tt)*) => {
        $crate::error::Error::Custom(format!($($arg)*))
    };
}
