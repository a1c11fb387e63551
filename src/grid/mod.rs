//! Variable grids
//!
//! A grid is the ordered set of values probed for one variable:
//! - continuous variables: quantiles (or evenly spaced points) spanning the
//!   observed range of the reference data, min and max included
//! - categorical variables: every observed level, sorted
//!
//! Grids are derived once per explainer and shared by every observation; the
//! observation's own value is inserted afterwards with
//! [`VariableGrid::with_observed`].

mod config;

pub use config::{GridConfig, GridStrategy, DEFAULT_GRID_POINTS};

use crate::data::{Dataset, Value, VariableKind};
use crate::error::{CeterisError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Ordered probe values for one variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableGrid {
    variable: String,
    kind: VariableKind,
    values: Vec<Value>,
    /// Position of the observation's value when it was not part of the shared grid
    inserted: Option<usize>,
    fingerprint: u64,
}

impl VariableGrid {
    fn new(variable: &str, kind: VariableKind, values: Vec<Value>) -> Self {
        let fingerprint = fingerprint(kind, &values);
        Self {
            variable: variable.to_string(),
            kind,
            values,
            inserted: None,
            fingerprint,
        }
    }

    /// Grid from caller-supplied split points
    ///
    /// Continuous splits must be finite numbers; they are sorted and
    /// de-duplicated. Categorical splits keep their order, duplicates dropped.
    pub fn from_splits(variable: &str, kind: VariableKind, splits: Vec<Value>) -> Result<Self> {
        if splits.is_empty() {
            return Err(CeterisError::ConfigurationError(format!(
                "empty split list for variable '{}'",
                variable
            )));
        }

        let values = match kind {
            VariableKind::Continuous => {
                let mut xs = splits
                    .iter()
                    .map(|v| match v {
                        Value::Number(x) if x.is_finite() => Ok(*x),
                        other => Err(CeterisError::ConfigurationError(format!(
                            "split '{}' for continuous variable '{}' is not a finite number",
                            other, variable
                        ))),
                    })
                    .collect::<Result<Vec<f64>>>()?;
                xs.sort_by(|a, b| a.total_cmp(b));
                xs.dedup();
                xs.into_iter().map(Value::Number).collect()
            }
            VariableKind::Categorical => {
                let mut values: Vec<Value> = Vec::with_capacity(splits.len());
                for v in splits {
                    if v.is_missing() {
                        return Err(CeterisError::ConfigurationError(format!(
                            "missing value among splits for variable '{}'",
                            variable
                        )));
                    }
                    if !values.contains(&v) {
                        values.push(v);
                    }
                }
                values
            }
        };

        Ok(Self::new(variable, kind, values))
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn position(&self, value: &Value) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }

    /// Index of the point added by [`with_observed`](Self::with_observed), if any
    pub fn inserted_index(&self) -> Option<usize> {
        self.inserted
    }

    /// Identity of the shared grid this one derives from
    ///
    /// Inserting an observation's value does not change the fingerprint.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Copy of the grid guaranteed to contain `observed`
    ///
    /// Returns the grid and the index of the observed value. Continuous values
    /// are inserted at their sorted position, new categorical levels are
    /// appended. A missing observed value leaves the grid unchanged with no
    /// observed index.
    pub fn with_observed(&self, observed: &Value) -> Result<(VariableGrid, Option<usize>)> {
        let mut grid = self.clone();
        grid.inserted = None;

        match (self.kind, observed) {
            (_, Value::Missing) => Ok((grid, None)),
            (VariableKind::Continuous, Value::Number(x)) if x.is_finite() => {
                // numeric order, so -0.0 lands on an existing 0.0
                let idx = match self.values.binary_search_by(|v| {
                    v.as_number()
                        .and_then(|g| g.partial_cmp(x))
                        .unwrap_or(Ordering::Less)
                }) {
                    Ok(idx) => idx,
                    Err(idx) => {
                        let x = if *x == 0.0 { 0.0 } else { *x };
                        grid.values.insert(idx, Value::Number(x));
                        grid.inserted = Some(idx);
                        idx
                    }
                };
                Ok((grid, Some(idx)))
            }
            (VariableKind::Continuous, other) => Err(CeterisError::unsupported(
                &self.variable,
                format!("observed value '{}' is not a finite number", other),
            )),
            (VariableKind::Categorical, level) => {
                let idx = match self.position(level) {
                    Some(idx) => idx,
                    None => {
                        grid.values.push(level.clone());
                        grid.inserted = Some(grid.values.len() - 1);
                        grid.values.len() - 1
                    }
                };
                Ok((grid, Some(idx)))
            }
        }
    }
}

fn fingerprint(kind: VariableKind, values: &[Value]) -> u64 {
    let mut hasher = DefaultHasher::new();
    kind.hash(&mut hasher);
    for v in values {
        v.key().hash(&mut hasher);
    }
    hasher.finish()
}

/// Builds grids from a reference dataset
#[derive(Debug, Clone, Copy)]
pub struct GridBuilder {
    resolution: usize,
    strategy: GridStrategy,
}

impl Default for GridBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_GRID_POINTS)
    }
}

impl GridBuilder {
    pub fn new(resolution: usize) -> Self {
        Self {
            resolution: resolution.max(2),
            strategy: GridStrategy::Quantile,
        }
    }

    pub fn with_strategy(mut self, strategy: GridStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Derive the grid of `variable` from `data`
    pub fn build(&self, data: &Dataset, variable: &str) -> Result<VariableGrid> {
        match data.schema().kind(variable)? {
            VariableKind::Continuous => {
                let mut xs = data.numeric_column(variable);
                if xs.is_empty() {
                    return Err(CeterisError::unsupported(variable, "no finite values observed"));
                }
                xs.sort_by(|a, b| a.total_cmp(b));

                let mut points = match self.strategy {
                    GridStrategy::Quantile => quantiles(&xs, self.resolution),
                    GridStrategy::Uniform => uniform(xs[0], xs[xs.len() - 1], self.resolution),
                };
                points.sort_by(|a, b| a.total_cmp(b));
                points.dedup();

                let values = points.into_iter().map(Value::Number).collect();
                Ok(VariableGrid::new(variable, VariableKind::Continuous, values))
            }
            VariableKind::Categorical => {
                let mut levels: Vec<Value> = data
                    .column(variable)
                    .filter(|v| !v.is_missing())
                    .cloned()
                    .collect();
                if levels.is_empty() {
                    return Err(CeterisError::unsupported(variable, "no levels observed"));
                }
                levels.sort_by(|a, b| a.total_cmp(b));
                levels.dedup();
                Ok(VariableGrid::new(variable, VariableKind::Categorical, levels))
            }
        }
    }
}

/// Grid for `variable` with `resolution` quantile points (default 101)
pub fn build_grid(
    data: &Dataset,
    variable: &str,
    resolution: Option<usize>,
) -> Result<VariableGrid> {
    GridBuilder::new(resolution.unwrap_or(DEFAULT_GRID_POINTS)).build(data, variable)
}

// Linearly interpolated quantiles at n evenly spaced probabilities; `sorted` is non-empty.
fn quantiles(sorted: &[f64], n: usize) -> Vec<f64> {
    let last = sorted.len() - 1;
    (0..n)
        .map(|i| {
            let h = last as f64 * i as f64 / (n - 1) as f64;
            let lo = h.floor() as usize;
            if lo >= last {
                sorted[last]
            } else {
                sorted[lo] + (h - lo as f64) * (sorted[lo + 1] - sorted[lo])
            }
        })
        .collect()
}

fn uniform(min: f64, max: f64, n: usize) -> Vec<f64> {
    let step = (max - min) / (n - 1) as f64;
    (0..n)
        .map(|i| if i == n - 1 { max } else { min + i as f64 * step })
        .collect()
}
