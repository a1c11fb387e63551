//! Model adapters
//!
//! Concrete models are wrapped to satisfy [`Predictor`]: a serializable
//! linear model, a matrix adapter for `ndarray`-based prediction functions and
//! a per-class adapter for probabilistic classifiers.

use super::predictor::{Concurrency, PredictFailure, Predictor};
use crate::data::{Record, Value};
use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Link function applied to the linear predictor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Link {
    #[default]
    Identity,
    /// Logistic link: scores are probabilities
    Logistic,
}

/// Linear (or logistic) model over named variables
///
/// Continuous variables contribute `coefficient * value`; categorical variables
/// contribute the offset of their level, unseen levels contribute zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearModel {
    #[serde(default)]
    pub intercept: f64,
    #[serde(default)]
    pub coefficients: BTreeMap<String, f64>,
    #[serde(default)]
    pub levels: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(default)]
    pub link: Link,
}

impl LinearModel {
    pub fn new(intercept: f64) -> Self {
        Self {
            intercept,
            ..Default::default()
        }
    }

    pub fn with_coefficient(mut self, variable: impl Into<String>, coefficient: f64) -> Self {
        self.coefficients.insert(variable.into(), coefficient);
        self
    }

    pub fn with_level(
        mut self,
        variable: impl Into<String>,
        level: impl Into<String>,
        offset: f64,
    ) -> Self {
        self.levels
            .entry(variable.into())
            .or_default()
            .insert(level.into(), offset);
        self
    }

    pub fn with_link(mut self, link: Link) -> Self {
        self.link = link;
        self
    }

    /// Load a model description from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn score(&self, record: &Record) -> std::result::Result<f64, String> {
        let mut eta = self.intercept;

        for (name, coef) in &self.coefficients {
            match record.get(name) {
                Some(Value::Number(x)) => eta += coef * x,
                Some(other) => {
                    return Err(format!("variable '{}' must be numeric, got '{}'", name, other))
                }
                None => return Err(format!("variable '{}' is absent", name)),
            }
        }

        for (name, offsets) in &self.levels {
            let level = match record.get(name) {
                Some(Value::Missing) | None => {
                    return Err(format!("variable '{}' is missing", name))
                }
                Some(v) => v.to_string(),
            };
            eta += offsets.get(&level).copied().unwrap_or(0.0);
        }

        Ok(match self.link {
            Link::Identity => eta,
            Link::Logistic => 1.0 / (1.0 + (-eta).exp()),
        })
    }
}

impl Predictor for LinearModel {
    fn predict(&self, batch: &[Record]) -> std::result::Result<Vec<f64>, PredictFailure> {
        batch
            .iter()
            .enumerate()
            .map(|(i, r)| self.score(r).map_err(|e| PredictFailure::at(i, e)))
            .collect()
    }
}

/// Adapter for prediction functions over a dense feature matrix
///
/// Records are encoded row-wise in `features` order; every feature must be
/// numeric.
pub struct MatrixPredictor<F>
where
    F: Fn(&Array2<f64>) -> Result<Array1<f64>> + Send + Sync,
{
    predict_fn: F,
    features: Vec<String>,
}

impl<F> MatrixPredictor<F>
where
    F: Fn(&Array2<f64>) -> Result<Array1<f64>> + Send + Sync,
{
    pub fn new(features: Vec<String>, predict_fn: F) -> Self {
        Self {
            predict_fn,
            features,
        }
    }

    /// Encode a batch of records into a matrix
    pub fn encode(&self, batch: &[Record]) -> std::result::Result<Array2<f64>, PredictFailure> {
        let mut x = Array2::zeros((batch.len(), self.features.len()));
        for (i, record) in batch.iter().enumerate() {
            for (j, name) in self.features.iter().enumerate() {
                x[[i, j]] = record.number(name).ok_or_else(|| {
                    PredictFailure::at(i, format!("feature '{}' is not numeric", name))
                })?;
            }
        }
        Ok(x)
    }
}

impl<F> Predictor for MatrixPredictor<F>
where
    F: Fn(&Array2<f64>) -> Result<Array1<f64>> + Send + Sync,
{
    fn predict(&self, batch: &[Record]) -> std::result::Result<Vec<f64>, PredictFailure> {
        let x = self.encode(batch)?;
        let scores = (self.predict_fn)(&x).map_err(PredictFailure::new)?;
        Ok(scores.to_vec())
    }
}

/// Per-record class probabilities of a classifier
pub trait ProbabilityPredictor: Send + Sync {
    fn predict_proba(
        &self,
        batch: &[Record],
    ) -> std::result::Result<Vec<BTreeMap<String, f64>>, PredictFailure>;

    fn concurrency(&self) -> Concurrency {
        Concurrency::Parallel
    }
}

/// Scores one fixed class of a [`ProbabilityPredictor`]
///
/// Build one explainer per class of interest.
pub struct ClassProbability<P: ?Sized> {
    model: Arc<P>,
    class: String,
}

impl<P: ProbabilityPredictor + ?Sized> ClassProbability<P> {
    pub fn new(model: Arc<P>, class: impl Into<String>) -> Self {
        Self {
            model,
            class: class.into(),
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }
}

impl<P: ProbabilityPredictor + ?Sized> Predictor for ClassProbability<P> {
    fn predict(&self, batch: &[Record]) -> std::result::Result<Vec<f64>, PredictFailure> {
        let probas = self.model.predict_proba(batch)?;
        probas
            .iter()
            .enumerate()
            .map(|(i, p)| {
                p.get(&self.class).copied().ok_or_else(|| {
                    PredictFailure::at(i, format!("class '{}' not in model output", self.class))
                })
            })
            .collect()
    }

    fn concurrency(&self) -> Concurrency {
        self.model.concurrency()
    }
}
