//! Per-call diagnostics
//!
//! Profile runs and aggregations never drop anything silently: each skipped
//! variable, dropped grid point, omitted group or cancelled pair is reported
//! here alongside the partial results.

use super::ProfileCollection;
use crate::data::Value;
use crate::error::{CeterisError, ErrorKind};
use std::fmt;

/// A recoverable failure recorded during a run
#[derive(Debug)]
pub struct Diagnostic {
    /// Explainer label, or group key for aggregation diagnostics
    pub scope: String,
    pub observation_id: Option<String>,
    pub variable: Option<String>,
    /// Grid value concerned, for dropped points and omitted groups
    pub value: Option<Value>,
    pub error: CeterisError,
}

impl Diagnostic {
    pub fn new(scope: impl Into<String>, error: CeterisError) -> Self {
        Self {
            scope: scope.into(),
            observation_id: None,
            variable: None,
            value: None,
            error,
        }
    }

    pub fn with_observation(mut self, id: impl Into<String>) -> Self {
        self.observation_id = Some(id.into());
        self
    }

    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = Some(variable.into());
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.scope)?;
        if let Some(id) = &self.observation_id {
            write!(f, " observation={}", id)?;
        }
        if let Some(variable) = &self.variable {
            write!(f, " variable={}", variable)?;
        }
        if let Some(value) = &self.value {
            write!(f, " value={}", value)?;
        }
        write!(f, ": {}", self.error)
    }
}

/// Output of a what-if run: partial results plus what was skipped
#[derive(Debug, Default)]
pub struct ProfileRun {
    pub profiles: ProfileCollection,
    pub diagnostics: Vec<Diagnostic>,
}

impl ProfileRun {
    /// True when nothing was skipped or dropped
    pub fn is_complete(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Diagnostics of a given kind
    pub fn diagnostics_of(&self, kind: ErrorKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind() == kind)
    }

    /// Grid points dropped because the model failed on them
    pub fn dropped_points(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics_of(ErrorKind::Prediction)
    }

    /// Variables skipped because no grid could be built for them
    pub fn skipped_variables(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics_of(ErrorKind::UnsupportedVariable)
    }

    /// Merge another run into this one
    pub fn merge(&mut self, other: ProfileRun) {
        self.profiles.extend(other.profiles);
        self.diagnostics.extend(other.diagnostics);
    }
}
