//! Reduction functions applied to grouped responses

use crate::error::CeterisError;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// User-supplied reduction over the (sorted, NaN-free) responses of a group
pub type ReduceFn = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// How the responses sharing a probed value are combined
#[derive(Clone, Default)]
pub enum Reduction {
    #[default]
    Mean,
    Median,
    Min,
    Max,
    Sum,
    Custom(ReduceFn),
}

impl Reduction {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        Reduction::Custom(Arc::new(f))
    }

    /// Reduce `values`, ignoring NaN; None when nothing is left
    ///
    /// Values are sorted before reduction so the result does not depend on the
    /// order in which profiles were collected.
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        let mut xs: Vec<f64> = values.iter().copied().filter(|x| !x.is_nan()).collect();
        if xs.is_empty() {
            return None;
        }
        xs.sort_by(|a, b| a.total_cmp(b));

        let n = xs.len();
        let reduced = match self {
            Reduction::Mean => xs.iter().sum::<f64>() / n as f64,
            Reduction::Median => {
                if n % 2 == 1 {
                    xs[n / 2]
                } else {
                    (xs[n / 2 - 1] + xs[n / 2]) / 2.0
                }
            }
            Reduction::Min => xs[0],
            Reduction::Max => xs[n - 1],
            Reduction::Sum => xs.iter().sum(),
            Reduction::Custom(f) => f(&xs),
        };
        Some(reduced)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Reduction::Mean => "mean",
            Reduction::Median => "median",
            Reduction::Min => "min",
            Reduction::Max => "max",
            Reduction::Sum => "sum",
            Reduction::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for Reduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reduction::{}", self.name())
    }
}

impl FromStr for Reduction {
    type Err = CeterisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mean" | "average" => Ok(Reduction::Mean),
            "median" => Ok(Reduction::Median),
            "min" => Ok(Reduction::Min),
            "max" => Ok(Reduction::Max),
            "sum" => Ok(Reduction::Sum),
            other => Err(CeterisError::ConfigurationError(format!(
                "unknown reduction '{}' (expected mean, median, min, max or sum)",
                other
            ))),
        }
    }
}
