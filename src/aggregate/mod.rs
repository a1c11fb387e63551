//! Aggregated profiles
//!
//! Many single-observation profiles are reduced into one summary curve per
//! (variable, group): with the default mean reduction grouped by explainer
//! label this is the partial-dependence curve of each model.
//!
//! Points are grouped by exact probed value. Continuous profiles of a group
//! must come from the same shared grid, which every explainer guarantees for
//! its own profiles through its grid cache.

mod aggregator;
mod reduce;

pub use aggregator::{
    aggregate, AggregateOptions, AggregatedPoint, AggregatedProfile, Aggregation, GroupBy,
};
pub use reduce::{ReduceFn, Reduction};
