//! Grid configuration

use crate::data::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default number of points of a continuous grid (percentiles 0..=100)
pub const DEFAULT_GRID_POINTS: usize = 101;

/// How continuous grid points are placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridStrategy {
    /// Evenly spaced quantiles of the observed values
    #[default]
    Quantile,
    /// Evenly spaced values between observed min and max
    Uniform,
}

/// Configuration for grid construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Number of points for continuous variables
    pub resolution: usize,

    /// Point placement for continuous variables
    pub strategy: GridStrategy,

    /// Per-variable resolution overrides
    pub resolutions: BTreeMap<String, usize>,

    /// Per-variable explicit split points, replacing the derived grid
    pub splits: BTreeMap<String, Vec<Value>>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_GRID_POINTS,
            strategy: GridStrategy::Quantile,
            resolutions: BTreeMap::new(),
            splits: BTreeMap::new(),
        }
    }
}

impl GridConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the default resolution
    pub fn with_resolution(mut self, resolution: usize) -> Self {
        self.resolution = resolution;
        self
    }

    /// Builder method to set the resolution of one variable
    pub fn with_variable_resolution(
        mut self,
        variable: impl Into<String>,
        resolution: usize,
    ) -> Self {
        self.resolutions.insert(variable.into(), resolution);
        self
    }

    pub fn with_strategy(mut self, strategy: GridStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Builder method to probe explicit values for one variable
    pub fn with_splits(mut self, variable: impl Into<String>, splits: Vec<Value>) -> Self {
        self.splits.insert(variable.into(), splits);
        self
    }

    /// Effective resolution for a variable
    pub fn resolution_for(&self, variable: &str) -> usize {
        self.resolutions
            .get(variable)
            .copied()
            .unwrap_or(self.resolution)
            .max(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_overrides() {
        let config = GridConfig::new()
            .with_resolution(50)
            .with_variable_resolution("age", 10)
            .with_variable_resolution("tiny", 1);

        assert_eq!(config.resolution_for("age"), 10);
        assert_eq!(config.resolution_for("fare"), 50);
        assert_eq!(config.resolution_for("tiny"), 2);
    }

    #[test]
    fn test_partial_json() {
        let config: GridConfig = serde_json::from_str(r#"{"resolution": 20}"#).unwrap();
        assert_eq!(config.resolution, 20);
        assert_eq!(config.strategy, GridStrategy::Quantile);
        assert!(config.splits.is_empty());
    }
}
