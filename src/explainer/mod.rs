//! Explainers
//!
//! An [`Explainer`] binds any model exposing the [`Predictor`] capability to
//! its reference data, an optional response vector and a display label.
//! Models are never inspected; adapters in [`models`] cover common shapes.

mod explainer;
pub mod models;
mod predictor;

pub use explainer::{Explainer, ExplainerBuilder};
pub use models::{ClassProbability, LinearModel, Link, MatrixPredictor, ProbabilityPredictor};
pub use predictor::{row_predictor, Concurrency, FnPredictor, PredictFailure, Predictor};
