//! Ceteris-paribus profiles
//!
//! A profile records the model response while one variable of an observation
//! moves over its grid and every other variable keeps its observed value.

mod config;
mod diagnostics;
mod generator;

pub use config::WhatIfConfig;
pub use diagnostics::{Diagnostic, ProfileRun};
pub use generator::{what_if, ProfileGenerator};

use crate::data::{Record, Value, VariableKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An observation to explain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Identifier used to tag the profiles of this observation
    pub id: String,
    pub record: Record,
    /// Observed response, when known
    pub response: Option<f64>,
}

impl Observation {
    pub fn new(id: impl Into<String>, record: Record) -> Self {
        Self {
            id: id.into(),
            record,
            response: None,
        }
    }

    pub fn with_response(mut self, response: f64) -> Self {
        self.response = Some(response);
        self
    }
}

/// One probe of a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfilePoint {
    pub variable: String,
    /// Value substituted for `variable`
    pub value: Value,
    /// Model response at the substituted record
    pub response: f64,
    /// Whether `value` is the observation's own value
    pub is_observed: bool,
    /// False for the observation's value inserted into the shared grid
    pub on_grid: bool,
}

/// Profile of one (observation, variable) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Label of the explainer that produced the profile
    pub label: String,
    pub observation_id: String,
    pub variable: String,
    pub kind: VariableKind,
    /// Fingerprint of the shared grid the points were probed on
    pub grid_fingerprint: u64,
    /// The unmodified observation
    pub observation: Record,
    /// Model response at the unmodified observation
    pub observed_prediction: Option<f64>,
    pub observed_response: Option<f64>,
    pub points: Vec<ProfilePoint>,
}

impl Profile {
    pub fn observed_point(&self) -> Option<&ProfilePoint> {
        self.points.iter().find(|p| p.is_observed)
    }

    pub fn probed_values(&self) -> impl Iterator<Item = &Value> {
        self.points.iter().map(|p| &p.value)
    }

    pub fn responses(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.response)
    }

    /// Observed response minus the prediction at the observation
    pub fn residual(&self) -> Option<f64> {
        Some(self.observed_response? - self.observed_prediction?)
    }

    /// Range of responses over the profile (a crude sensitivity measure)
    pub fn amplitude(&self) -> Option<f64> {
        let (min, max) = self
            .responses()
            .filter(|r| !r.is_nan())
            .fold(None, |acc: Option<(f64, f64)>, r| match acc {
                None => Some((r, r)),
                Some((lo, hi)) => Some((lo.min(r), hi.max(r))),
            })?;
        Some(max - min)
    }
}

/// Variables a source (explainer label) was asked to profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceSchema {
    pub label: String,
    pub variables: BTreeMap<String, VariableKind>,
}

/// Profiles from any number of explainers and observations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileCollection {
    profiles: Vec<Profile>,
    sources: Vec<SourceSchema>,
}

impl ProfileCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(profiles: Vec<Profile>, sources: Vec<SourceSchema>) -> Self {
        Self { profiles, sources }
    }

    /// Add a profile, registering its variable under its source
    pub fn push(&mut self, profile: Profile) {
        self.register(&profile.label, &profile.variable, profile.kind);
        self.profiles.push(profile);
    }

    fn register(&mut self, label: &str, variable: &str, kind: VariableKind) {
        let idx = match self.sources.iter().position(|s| s.label == label) {
            Some(idx) => idx,
            None => {
                self.sources.push(SourceSchema {
                    label: label.to_string(),
                    variables: BTreeMap::new(),
                });
                self.sources.len() - 1
            }
        };
        self.sources[idx]
            .variables
            .entry(variable.to_string())
            .or_insert(kind);
    }

    /// Append another collection, keeping every profile's provenance
    pub fn extend(&mut self, other: ProfileCollection) {
        self.profiles.extend(other.profiles);
        self.sources.extend(other.sources);
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn into_profiles(self) -> Vec<Profile> {
        self.profiles
    }

    /// Source schemas, one entry per contributing collection and label
    pub fn sources(&self) -> &[SourceSchema] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Profile> {
        self.profiles.iter()
    }

    /// Distinct explainer labels, in first-seen order
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        for p in &self.profiles {
            if !labels.contains(&p.label.as_str()) {
                labels.push(&p.label);
            }
        }
        labels
    }

    /// Profiles of one variable
    pub fn for_variable<'a>(&'a self, variable: &'a str) -> impl Iterator<Item = &'a Profile> + 'a {
        self.profiles.iter().filter(move |p| p.variable == variable)
    }

    /// Re-tag every profile and source with a new label
    pub fn relabel(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        for p in &mut self.profiles {
            p.label = label.clone();
        }
        for s in &mut self.sources {
            s.label = label.clone();
        }
        self
    }
}

impl IntoIterator for ProfileCollection {
    type Item = Profile;
    type IntoIter = std::vec::IntoIter<Profile>;

    fn into_iter(self) -> Self::IntoIter {
        self.profiles.into_iter()
    }
}

impl<'a> IntoIterator for &'a ProfileCollection {
    type Item = &'a Profile;
    type IntoIter = std::slice::Iter<'a, Profile>;

    fn into_iter(self) -> Self::IntoIter {
        self.profiles.iter()
    }
}

impl FromIterator<Profile> for ProfileCollection {
    fn from_iter<I: IntoIterator<Item = Profile>>(iter: I) -> Self {
        let mut collection = Self::new();
        for p in iter {
            collection.push(p);
        }
        collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(label: &str, variable: &str, responses: &[f64]) -> Profile {
        Profile {
            label: label.to_string(),
            observation_id: "0".to_string(),
            variable: variable.to_string(),
            kind: VariableKind::Continuous,
            grid_fingerprint: 1,
            observation: Record::new().with(variable, 0.0),
            observed_prediction: Some(responses[0]),
            observed_response: Some(responses[0] + 1.5),
            points: responses
                .iter()
                .enumerate()
                .map(|(i, &r)| ProfilePoint {
                    variable: variable.to_string(),
                    value: Value::from(i as f64),
                    response: r,
                    is_observed: i == 0,
                    on_grid: true,
                })
                .collect(),
        }
    }

    #[test]
    fn test_profile_helpers() {
        let p = profile("M1", "x", &[3.0, 1.0, 4.0]);
        assert_eq!(p.observed_point().map(|pt| pt.response), Some(3.0));
        assert_eq!(p.residual(), Some(1.5));
        assert_eq!(p.amplitude(), Some(3.0));
    }

    #[test]
    fn test_collection_sources_and_relabel() {
        let collection: ProfileCollection = vec![
            profile("M1", "x", &[1.0]),
            profile("M1", "y", &[1.0]),
            profile("M2", "x", &[1.0]),
        ]
        .into_iter()
        .collect();

        assert_eq!(collection.labels(), vec!["M1", "M2"]);
        assert_eq!(collection.sources().len(), 2);
        assert_eq!(collection.sources()[0].variables.len(), 2);
        assert_eq!(collection.for_variable("x").count(), 2);

        let relabeled = collection.relabel("all");
        assert_eq!(relabeled.labels(), vec!["all"]);
        assert!(relabeled.sources().iter().all(|s| s.label == "all"));
    }
}
