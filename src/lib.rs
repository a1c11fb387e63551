//! Ceteris - what-if profiles for predictive models
//!
//! Ceteris-paribus profiles answer "what would the prediction be if exactly one
//! input variable changed, all others held fixed?" over a grid of values, for
//! any model that can score a batch of records.
//!
//! # Modules
//!
//! ## Core
//! - [`explainer`] - Uniform adapter around a model, its reference data and label
//! - [`grid`] - Probe values per variable (quantile, uniform, categorical levels)
//! - [`profile`] - The what-if engine producing one profile per (observation, variable)
//! - [`compose`] - Concatenation of profiles from several explainers
//! - [`aggregate`] - Reduction of profiles into partial-dependence style curves
//!
//! ## Data and output
//! - [`data`] - Typed values, records, schema inference, polars interop
//! - [`sampling`] - Random and nearest-neighbour observation selection
//! - [`export`] - Renderer-facing rows (JSON, CSV)
//!
//! ## Services
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use ceteris::prelude::*;
//!
//! # fn main() -> ceteris::Result<()> {
//! let data = Dataset::new(vec![
//!     Record::new().with("age", 25.0).with("class", "1st"),
//!     Record::new().with("age", 61.0).with("class", "3rd"),
//! ]);
//! let model = LinearModel::new(0.5)
//!     .with_coefficient("age", -0.01)
//!     .with_level("class", "3rd", -0.3);
//!
//! let explainer = Explainer::builder("lm").with_model(model).with_data(data).build()?;
//! let observations = vec![explainer.observation(0)?];
//! let run = what_if(&explainer, &observations, None)?;
//!
//! let curves = aggregate(&run.profiles, &AggregateOptions::new())?;
//! println!("{}", export::to_json(&export::aggregated_rows(&curves.profiles))?);
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Data model
pub mod data;

// Core modules
pub mod explainer;
pub mod grid;
pub mod profile;
pub mod compose;
pub mod aggregate;

// Observation selection and output
pub mod sampling;
pub mod export;

// Utilities
pub mod utils;

// Services
pub mod cli;

pub use error::{CeterisError, ErrorKind, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{CeterisError, ErrorKind, Result};

    // Data
    pub use crate::data::{Dataset, Record, Value, VariableKind};

    // Explainers
    pub use crate::explainer::{
        ClassProbability, Explainer, FnPredictor, LinearModel, PredictFailure, Predictor,
    };

    // Grids
    pub use crate::grid::{build_grid, GridConfig, GridStrategy, VariableGrid};

    // Profiles
    pub use crate::profile::{
        what_if, Observation, Profile, ProfileCollection, ProfileGenerator, ProfileRun,
        WhatIfConfig,
    };

    // Composition and aggregation
    pub use crate::aggregate::{aggregate, AggregateOptions, Aggregation, GroupBy, Reduction};
    pub use crate::compose::compose;

    // Export
    pub use crate::export;

    // Parallelism
    pub use crate::utils::ParallelConfig;
}
