//! Multi-source composition
//!
//! Profiles produced by different explainers (or by separate runs of the same
//! one) are concatenated into a single collection. Nothing is merged or
//! re-labelled: each profile keeps the label of the explainer that produced it
//! so downstream grouping and plotting can tell the sources apart.

use crate::profile::{ProfileCollection, ProfileRun};
use tracing::debug;

/// Concatenate collections in the order given
pub fn compose<I>(collections: I) -> ProfileCollection
where
    I: IntoIterator<Item = ProfileCollection>,
{
    let mut composed = ProfileCollection::new();
    let mut parts = 0usize;
    for collection in collections {
        composed.extend(collection);
        parts += 1;
    }
    debug!(parts, profiles = composed.len(), "Composed profile collections");
    composed
}

/// Concatenate runs, keeping every diagnostic
pub fn compose_runs<I>(runs: I) -> ProfileRun
where
    I: IntoIterator<Item = ProfileRun>,
{
    let mut composed = ProfileRun::default();
    for run in runs {
        composed.merge(run);
    }
    composed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Record, Value, VariableKind};
    use crate::error::CeterisError;
    use crate::profile::{Diagnostic, Profile, ProfilePoint};

    fn profile(label: &str, variable: &str) -> Profile {
        Profile {
            label: label.to_string(),
            observation_id: "0".to_string(),
            variable: variable.to_string(),
            kind: VariableKind::Continuous,
            grid_fingerprint: 7,
            observation: Record::new().with(variable, 1.0),
            observed_prediction: Some(2.0),
            observed_response: None,
            points: vec![ProfilePoint {
                variable: variable.to_string(),
                value: Value::from(1.0),
                response: 2.0,
                is_observed: true,
                on_grid: true,
            }],
        }
    }

    #[test]
    fn test_compose_keeps_labels_and_order() {
        let a: ProfileCollection = vec![profile("M1", "x"), profile("M1", "y")]
            .into_iter()
            .collect();
        let b: ProfileCollection = vec![profile("M2", "x")].into_iter().collect();

        let composed = compose(vec![a, b]);
        let tags: Vec<(&str, &str)> = composed
            .iter()
            .map(|p| (p.label.as_str(), p.variable.as_str()))
            .collect();
        assert_eq!(tags, vec![("M1", "x"), ("M1", "y"), ("M2", "x")]);
        assert_eq!(composed.labels(), vec!["M1", "M2"]);
        assert_eq!(composed.sources().len(), 2);
    }

    #[test]
    fn test_compose_nothing() {
        let composed = compose(Vec::<ProfileCollection>::new());
        assert!(composed.is_empty());
    }

    #[test]
    fn test_compose_runs_keeps_diagnostics() {
        let first = ProfileRun {
            profiles: vec![profile("M1", "x")].into_iter().collect(),
            diagnostics: vec![Diagnostic::new("M1", CeterisError::Cancelled)],
        };
        let second = ProfileRun {
            profiles: vec![profile("M2", "x")].into_iter().collect(),
            diagnostics: Vec::new(),
        };
        let composed = compose_runs(vec![first, second]);
        assert_eq!(composed.profiles.len(), 2);
        assert_eq!(composed.diagnostics.len(), 1);
    }
}
