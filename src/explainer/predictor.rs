//! The single-capability model interface

use crate::data::Record;
use crate::error::BoxError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Failure raised by a [`Predictor`]
///
/// `index` points at the offending record of the batch when the model knows it.
#[derive(Debug)]
pub struct PredictFailure {
    pub index: Option<usize>,
    pub source: BoxError,
}

impl PredictFailure {
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self {
            index: None,
            source: source.into(),
        }
    }

    /// Failure attributed to a specific record of the batch
    pub fn at(index: usize, source: impl Into<BoxError>) -> Self {
        Self {
            index: Some(index),
            source: source.into(),
        }
    }
}

impl fmt::Display for PredictFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "record {}: {}", i, self.source),
            None => write!(f, "{}", self.source),
        }
    }
}

/// Whether a predictor may be called from several threads at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Concurrency {
    /// Concurrent calls with different batches are safe
    #[default]
    Parallel,
    /// Calls must be serialized by the explainer
    Serialized,
}

/// Anything that scores a batch of records
///
/// Implementations must return exactly one score per record, in record order,
/// and must not rely on the batch composition (scoring a record alone or in a
/// batch yields the same score).
pub trait Predictor: Send + Sync {
    fn predict(&self, batch: &[Record]) -> Result<Vec<f64>, PredictFailure>;

    fn concurrency(&self) -> Concurrency {
        Concurrency::Parallel
    }
}

impl<P: Predictor + ?Sized> Predictor for Arc<P> {
    fn predict(&self, batch: &[Record]) -> Result<Vec<f64>, PredictFailure> {
        (**self).predict(batch)
    }

    fn concurrency(&self) -> Concurrency {
        (**self).concurrency()
    }
}

impl<P: Predictor + ?Sized> Predictor for Box<P> {
    fn predict(&self, batch: &[Record]) -> Result<Vec<f64>, PredictFailure> {
        (**self).predict(batch)
    }

    fn concurrency(&self) -> Concurrency {
        (**self).concurrency()
    }
}

/// Closure-backed predictor
pub struct FnPredictor<F> {
    predict_fn: F,
    concurrency: Concurrency,
}

impl<F> FnPredictor<F>
where
    F: Fn(&[Record]) -> Result<Vec<f64>, PredictFailure> + Send + Sync,
{
    pub fn new(predict_fn: F) -> Self {
        Self {
            predict_fn,
            concurrency: Concurrency::Parallel,
        }
    }

    /// Declare that the wrapped model is not thread-safe
    pub fn serialized(mut self) -> Self {
        self.concurrency = Concurrency::Serialized;
        self
    }
}

impl<F> Predictor for FnPredictor<F>
where
    F: Fn(&[Record]) -> Result<Vec<f64>, PredictFailure> + Send + Sync,
{
    fn predict(&self, batch: &[Record]) -> Result<Vec<f64>, PredictFailure> {
        (self.predict_fn)(batch)
    }

    fn concurrency(&self) -> Concurrency {
        self.concurrency
    }
}

/// Per-record scoring for closures that score one record at a time
///
/// The failing record's index is attached automatically.
pub fn row_predictor<F, E>(
    score: F,
) -> FnPredictor<impl Fn(&[Record]) -> Result<Vec<f64>, PredictFailure> + Send + Sync>
where
    F: Fn(&Record) -> Result<f64, E> + Send + Sync,
    E: Into<BoxError>,
{
    FnPredictor::new(move |batch: &[Record]| {
        batch
            .iter()
            .enumerate()
            .map(|(i, record)| score(record).map_err(|e| PredictFailure::at(i, e)))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_predictor() {
        let model = FnPredictor::new(|batch: &[Record]| {
            Ok(batch.iter().map(|r| r.number("x").unwrap_or(0.0) * 2.0).collect())
        });
        let batch = vec![Record::new().with("x", 1.0), Record::new().with("x", 4.0)];
        assert_eq!(model.predict(&batch).unwrap(), vec![2.0, 8.0]);
        assert_eq!(model.concurrency(), Concurrency::Parallel);
        assert_eq!(model.serialized().concurrency(), Concurrency::Serialized);
    }

    #[test]
    fn test_row_predictor_reports_index() {
        let model = row_predictor(|r: &Record| {
            r.number("x").ok_or_else(|| "x is not numeric".to_string())
        });
        let batch = vec![
            Record::new().with("x", 1.0),
            Record::new().with("x", "oops"),
        ];
        let failure = model.predict(&batch).unwrap_err();
        assert_eq!(failure.index, Some(1));
        assert_eq!(failure.to_string(), "record 1: x is not numeric");
    }
}
