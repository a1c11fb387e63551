//! Explainer: a model bound to its reference data

use super::predictor::{Concurrency, Predictor};
use crate::data::{Dataset, Record, VariableKind};
use crate::error::{CeterisError, Result};
use crate::grid::{GridBuilder, GridConfig, GridStrategy, VariableGrid};
use crate::profile::Observation;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GridKey {
    variable: String,
    resolution: usize,
    strategy: GridStrategy,
}

/// Uniform adapter around a model, its reference data and an optional
/// response vector
///
/// Immutable once built; share it across threads behind an `Arc` or a plain
/// reference. Grids derived from the reference data are cached inside the
/// explainer, so every observation explained through it is probed on the
/// same grid.
pub struct Explainer {
    label: String,
    model: Arc<dyn Predictor>,
    data: Arc<Dataset>,
    response: Option<Vec<f64>>,
    /// Present when the model declared [`Concurrency::Serialized`]
    serial: Option<Mutex<()>>,
    grids: RwLock<HashMap<GridKey, Arc<VariableGrid>>>,
}

impl fmt::Debug for Explainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Explainer")
            .field("label", &self.label)
            .field("rows", &self.data.len())
            .field("has_response", &self.response.is_some())
            .field("serialized", &self.serial.is_some())
            .finish()
    }
}

impl Explainer {
    pub fn builder(label: impl Into<String>) -> ExplainerBuilder {
        ExplainerBuilder::new(label)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn data(&self) -> &Dataset {
        &self.data
    }

    pub fn response(&self) -> Option<&[f64]> {
        self.response.as_deref()
    }

    pub fn concurrency(&self) -> Concurrency {
        if self.serial.is_some() {
            Concurrency::Serialized
        } else {
            Concurrency::Parallel
        }
    }

    /// Declared kind of a variable of the reference data
    pub fn kind(&self, variable: &str) -> Result<VariableKind> {
        self.data.schema().kind(variable)
    }

    /// Score a batch of records
    ///
    /// Model failures are wrapped as [`CeterisError::PredictionError`] with the
    /// offending record index when it is known.
    pub fn predict(&self, records: &[Record]) -> Result<Vec<f64>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let scores = {
            let _guard = self.serial.as_ref().map(|m| m.lock());
            self.model.predict(records)
        }
        .map_err(|failure| CeterisError::PredictionError {
            label: self.label.clone(),
            index: failure.index.or(if records.len() == 1 { Some(0) } else { None }),
            source: failure.source,
        })?;

        if scores.len() != records.len() {
            return Err(CeterisError::PredictionError {
                label: self.label.clone(),
                index: None,
                source: format!(
                    "predictor returned {} scores for {} records",
                    scores.len(),
                    records.len()
                )
                .into(),
            });
        }
        Ok(scores)
    }

    /// Predictions on the reference data
    pub fn predict_reference(&self) -> Result<Vec<f64>> {
        self.predict(self.data.rows())
    }

    /// Response minus prediction for each reference row (None without a response vector)
    pub fn residuals(&self) -> Result<Option<Vec<f64>>> {
        let response = match &self.response {
            Some(r) => r,
            None => return Ok(None),
        };
        let predictions = self.predict_reference()?;
        Ok(Some(
            response
                .iter()
                .zip(predictions)
                .map(|(y, p)| y - p)
                .collect(),
        ))
    }

    /// A reference row as an observation, with its response attached when known
    pub fn observation(&self, index: usize) -> Result<Observation> {
        let record = self.data.row(index).ok_or_else(|| {
            CeterisError::DataError(format!(
                "row {} out of bounds (n_rows={})",
                index,
                self.data.len()
            ))
        })?;
        let mut observation = Observation::new(index.to_string(), record.clone());
        if let Some(y) = self.response.as_ref().map(|r| r[index]) {
            observation = observation.with_response(y);
        }
        Ok(observation)
    }

    /// Shared grid for a variable
    ///
    /// Derived grids are cached per (variable, resolution, strategy); explicit
    /// splits are validated and returned as is.
    pub fn grid(&self, variable: &str, config: &GridConfig) -> Result<Arc<VariableGrid>> {
        if let Some(splits) = config.splits.get(variable) {
            let kind = self.kind(variable)?;
            return Ok(Arc::new(VariableGrid::from_splits(variable, kind, splits.clone())?));
        }

        let key = GridKey {
            variable: variable.to_string(),
            resolution: config.resolution_for(variable),
            strategy: config.strategy,
        };

        if let Some(grid) = self.grids.read().get(&key) {
            return Ok(Arc::clone(grid));
        }

        let grid = GridBuilder::new(key.resolution)
            .with_strategy(key.strategy)
            .build(&self.data, variable)?;
        debug!(label = %self.label, variable, points = grid.len(), "Built variable grid");

        let mut grids = self.grids.write();
        Ok(Arc::clone(grids.entry(key).or_insert_with(|| Arc::new(grid))))
    }

    /// Number of cached grids
    pub fn cached_grids(&self) -> usize {
        self.grids.read().len()
    }
}

/// Builder for [`Explainer`]
pub struct ExplainerBuilder {
    label: String,
    model: Option<Arc<dyn Predictor>>,
    data: Option<Arc<Dataset>>,
    response: Option<Vec<f64>>,
}

impl ExplainerBuilder {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            model: None,
            data: None,
            response: None,
        }
    }

    /// Set the model
    pub fn with_model<P: Predictor + 'static>(mut self, model: P) -> Self {
        self.model = Some(Arc::new(model));
        self
    }

    /// Set a model shared with other explainers
    pub fn with_shared_model(mut self, model: Arc<dyn Predictor>) -> Self {
        self.model = Some(model);
        self
    }

    /// Set the reference dataset
    pub fn with_data(mut self, data: Dataset) -> Self {
        self.data = Some(Arc::new(data));
        self
    }

    /// Set a reference dataset shared with other explainers
    pub fn with_shared_data(mut self, data: Arc<Dataset>) -> Self {
        self.data = Some(data);
        self
    }

    /// Set the response vector, aligned with the reference rows
    pub fn with_response(mut self, response: Vec<f64>) -> Self {
        self.response = Some(response);
        self
    }

    pub fn build(self) -> Result<Explainer> {
        if self.label.is_empty() {
            return Err(CeterisError::ConfigurationError(
                "explainer label must not be empty".to_string(),
            ));
        }
        let model = self.model.ok_or_else(|| {
            CeterisError::ConfigurationError(format!(
                "explainer '{}' has no prediction function",
                self.label
            ))
        })?;
        let data = self.data.ok_or_else(|| {
            CeterisError::ConfigurationError(format!(
                "explainer '{}' has no reference data",
                self.label
            ))
        })?;

        if let Some(response) = &self.response {
            if response.len() != data.len() {
                return Err(CeterisError::ConfigurationError(format!(
                    "response length {} does not match reference data length {}",
                    response.len(),
                    data.len()
                )));
            }
        }

        let serial = match model.concurrency() {
            Concurrency::Serialized => Some(Mutex::new(())),
            Concurrency::Parallel => None,
        };

        Ok(Explainer {
            label: self.label,
            model,
            data,
            response: self.response,
            serial,
            grids: RwLock::new(HashMap::new()),
        })
    }
}
