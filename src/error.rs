//! Error types for ceteris-paribus profiling

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for ceteris operations
pub type Result<T> = std::result::Result<T, CeterisError>;

/// Boxed cause carried by prediction failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for the ceteris crate
#[derive(Error, Debug)]
pub enum CeterisError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Unsupported variable '{variable}': {reason}")]
    UnsupportedVariable { variable: String, reason: String },

    #[error("Prediction failed in explainer '{label}'{}: {source}", record_suffix(.index))]
    PredictionError {
        label: String,
        index: Option<usize>,
        #[source]
        source: BoxError,
    },

    #[error("Schema mismatch for variable '{variable}': {reason}")]
    SchemaMismatch { variable: String, reason: String },

    #[error("Grid mismatch for variable '{variable}' in group '{group}': profiles were built from different grids")]
    GridMismatch { variable: String, group: String },

    #[error("No finite responses for variable '{variable}' in group '{group}' at {value}")]
    EmptyGroup {
        variable: String,
        group: String,
        value: String,
    },

    #[error("Computation cancelled")]
    Cancelled,

    #[error("Data error: {0}")]
    DataError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

fn record_suffix(index: &Option<usize>) -> String {
    match index {
        Some(i) => format!(" at record {}", i),
        None => String::new(),
    }
}

/// Coarse classification of [`CeterisError`], used to filter diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    UnsupportedVariable,
    Prediction,
    SchemaMismatch,
    GridMismatch,
    EmptyGroup,
    Cancelled,
    Data,
    Io,
    Serialization,
}

impl CeterisError {
    /// Shorthand for an unsupported-variable error
    pub fn unsupported(variable: impl Into<String>, reason: impl Into<String>) -> Self {
        CeterisError::UnsupportedVariable {
            variable: variable.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CeterisError::ConfigurationError(_) => ErrorKind::Configuration,
            CeterisError::UnsupportedVariable { .. } => ErrorKind::UnsupportedVariable,
            CeterisError::PredictionError { .. } => ErrorKind::Prediction,
            CeterisError::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            CeterisError::GridMismatch { .. } => ErrorKind::GridMismatch,
            CeterisError::EmptyGroup { .. } => ErrorKind::EmptyGroup,
            CeterisError::Cancelled => ErrorKind::Cancelled,
            CeterisError::DataError(_) => ErrorKind::Data,
            CeterisError::IoError(_) => ErrorKind::Io,
            CeterisError::SerializationError(_) => ErrorKind::Serialization,
        }
    }
}

impl From<polars::error::PolarsError> for CeterisError {
    fn from(err: polars::error::PolarsError) -> Self {
        CeterisError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for CeterisError {
    fn from(err: serde_json::Error) -> Self {
        CeterisError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for CeterisError {
    fn from(err: ndarray::ShapeError) -> Self {
        CeterisError::DataError(format!("invalid shape: {}", err))
    }
}
