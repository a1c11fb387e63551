//! Observation selection
//!
//! Helpers choosing which reference rows to profile: a seeded random sample
//! (the usual input for aggregated profiles) and the nearest neighbours of an
//! observation under Gower distance.

use crate::data::{Record, VariableKind};
use crate::error::{CeterisError, Result};
use crate::explainer::Explainer;
use crate::profile::Observation;
use rand::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

/// Random sample of `n` reference rows, without replacement
///
/// Rows come back in dataset order, identified by their row index. `n` larger
/// than the dataset selects every row. The same seed always selects the same
/// rows.
pub fn select_sample(
    explainer: &Explainer,
    n: usize,
    seed: Option<u64>,
) -> Result<Vec<Observation>> {
    if n == 0 {
        return Err(CeterisError::ConfigurationError(
            "sample size must be at least 1".to_string(),
        ));
    }

    let n_rows = explainer.data().len();
    let mut indices: Vec<usize> = if n >= n_rows {
        (0..n_rows).collect()
    } else {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        rand::seq::index::sample(&mut rng, n_rows, n).into_vec()
    };
    indices.sort_unstable();

    debug!(
        label = %explainer.label(),
        requested = n,
        selected = indices.len(),
        "Sampled observations"
    );
    indices.into_iter().map(|i| explainer.observation(i)).collect()
}

/// The `n` reference rows closest to `record`
///
/// Distance is Gower's: range-scaled absolute difference for continuous
/// variables, 0/1 mismatch for categorical ones, 1 when either side is
/// missing, averaged over `variables` (all typed variables of the reference
/// data by default). Ties keep dataset order.
pub fn select_neighbours(
    explainer: &Explainer,
    record: &Record,
    variables: Option<&[&str]>,
    n: usize,
) -> Result<Vec<Observation>> {
    let data = explainer.data();
    let variables: Vec<&str> = match variables {
        Some(vars) => vars.to_vec(),
        None => data
            .schema()
            .fields()
            .iter()
            .filter(|f| f.kind.is_some())
            .map(|f| f.name.as_str())
            .collect(),
    };
    if variables.is_empty() {
        return Err(CeterisError::ConfigurationError(
            "no variables to measure distance on".to_string(),
        ));
    }

    let mut ranges = BTreeMap::new();
    for &variable in &variables {
        if explainer.kind(variable)? == VariableKind::Continuous {
            let xs = data.numeric_column(variable);
            let (lo, hi) = xs
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)));
            ranges.insert(variable, hi - lo);
        }
    }

    let mut distances: Vec<(usize, f64)> = data
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let total: f64 = variables
                .iter()
                .map(|&v| gower_term(record, row, v, ranges.get(v).copied()))
                .sum();
            (i, total / variables.len() as f64)
        })
        .collect();
    distances.sort_by(|a, b| a.1.total_cmp(&b.1));

    distances
        .into_iter()
        .take(n)
        .map(|(i, _)| explainer.observation(i))
        .collect()
}

// `range` is Some for continuous variables.
fn gower_term(a: &Record, b: &Record, variable: &str, range: Option<f64>) -> f64 {
    let (Some(x), Some(y)) = (a.get(variable), b.get(variable)) else {
        return 1.0;
    };
    if x.is_missing() || y.is_missing() {
        return 1.0;
    }
    match range {
        Some(range) => match (x.as_number(), y.as_number()) {
            (Some(x), Some(y)) if range > 0.0 => ((x - y).abs() / range).min(1.0),
            (Some(x), Some(y)) => {
                if x == y {
                    0.0
                } else {
                    1.0
                }
            }
            _ => 1.0,
        },
        None => {
            if x == y {
                0.0
            } else {
                1.0
            }
        }
    }
}
