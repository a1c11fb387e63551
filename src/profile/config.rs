//! What-if run configuration

use crate::error::Result;
use crate::grid::GridConfig;
use crate::utils::ParallelConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a profile run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatIfConfig {
    /// Grid construction settings
    pub grid: GridConfig,

    /// Variables to profile (None = every variable of each observation)
    pub variables: Option<Vec<String>>,

    /// Worker pool settings
    pub parallel: ParallelConfig,
}

impl WhatIfConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set grid settings
    pub fn with_grid(mut self, grid: GridConfig) -> Self {
        self.grid = grid;
        self
    }

    /// Builder method to restrict the profiled variables
    pub fn with_variables<I, S>(mut self, variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variables = Some(variables.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }

    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
