//! Aggregation of profile collections

use super::Reduction;
use crate::data::{Record, Value, ValueKey, VariableKind};
use crate::error::{CeterisError, Result};
use crate::profile::{Diagnostic, Profile, ProfileCollection, ProfilePoint};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{info, warn};

/// Partition of profiles before reduction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    /// Explainer label
    #[default]
    Label,
    /// One group per (label, observation); useful to keep curves apart in exports
    Observation,
    /// Observation's value of a variable, e.g. a demographic column
    Attribute(String),
    /// Everything in one group under the given key
    Constant(String),
}

impl GroupBy {
    /// Group key of a profile
    pub fn key(&self, profile: &Profile) -> String {
        match self {
            GroupBy::Label => profile.label.clone(),
            GroupBy::Observation => format!(
                "{}:{}",
                escape_key_part(&profile.label),
                escape_key_part(&profile.observation_id)
            ),
            GroupBy::Attribute(name) => profile
                .observation
                .get(name)
                .map_or_else(|| Value::Missing.to_string(), Value::to_string),
            GroupBy::Constant(key) => key.clone(),
        }
    }
}

// Escapes `\` and `:` within one part of a "label:id" key
fn escape_key_part(part: &str) -> String {
    let mut escaped = String::with_capacity(part.len());
    for c in part.chars() {
        if c == '\\' || c == ':' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl FromStr for GroupBy {
    type Err = CeterisError;

    /// `label`, `observation`, `const:<key>`, or any other name as an attribute
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "" => Err(CeterisError::ConfigurationError("empty group-by key".to_string())),
            "label" => Ok(GroupBy::Label),
            "observation" => Ok(GroupBy::Observation),
            other => match other.strip_prefix("const:") {
                Some(key) => Ok(GroupBy::Constant(key.to_string())),
                None => Ok(GroupBy::Attribute(other.to_string())),
            },
        }
    }
}

/// Options for [`aggregate`]
#[derive(Debug, Clone, Default)]
pub struct AggregateOptions {
    pub reduction: Reduction,
    pub group_by: GroupBy,
    /// Variables to aggregate (None = every profiled variable)
    pub variables: Option<Vec<String>>,
}

impl AggregateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reduction(mut self, reduction: Reduction) -> Self {
        self.reduction = reduction;
        self
    }

    pub fn with_group_by(mut self, group_by: GroupBy) -> Self {
        self.group_by = group_by;
        self
    }

    pub fn with_variables<I, S>(mut self, variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variables = Some(variables.into_iter().map(Into::into).collect());
        self
    }

    fn includes(&self, variable: &str) -> bool {
        self.variables
            .as_ref()
            .map_or(true, |vars| vars.iter().any(|v| v == variable))
    }
}

/// One reduced point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedPoint {
    pub value: Value,
    pub response: f64,
    /// Number of finite responses reduced into this point
    pub count: usize,
}

/// Summary curve for one (variable, group)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedProfile {
    pub variable: String,
    pub group: String,
    pub kind: VariableKind,
    /// Shared grid of the contributing profiles (continuous variables only)
    pub grid_fingerprint: Option<u64>,
    /// Number of contributing profiles
    pub profiles: usize,
    pub points: Vec<AggregatedPoint>,
}

/// Output of [`aggregate`]
#[derive(Debug, Default)]
pub struct Aggregation {
    pub profiles: Vec<AggregatedProfile>,
    /// Omitted (variable, group, value) cells
    pub diagnostics: Vec<Diagnostic>,
}

impl Aggregation {
    /// Aggregated curves as a profile collection, ready to be re-aggregated
    pub fn to_collection(&self) -> ProfileCollection {
        ProfileCollection::from_aggregated(&self.profiles)
    }
}

impl ProfileCollection {
    /// Treat aggregated curves as profiles labelled by their group
    pub fn from_aggregated(aggregated: &[AggregatedProfile]) -> Self {
        aggregated
            .iter()
            .map(|a| Profile {
                label: a.group.clone(),
                observation_id: a.group.clone(),
                variable: a.variable.clone(),
                kind: a.kind,
                grid_fingerprint: a.grid_fingerprint.unwrap_or_default(),
                observation: Record::new(),
                observed_prediction: None,
                observed_response: None,
                points: a
                    .points
                    .iter()
                    .map(|p| ProfilePoint {
                        variable: a.variable.clone(),
                        value: p.value.clone(),
                        response: p.response,
                        is_observed: false,
                        on_grid: true,
                    })
                    .collect(),
            })
            .collect()
    }
}

/// Reduce a collection to one curve per (variable, group)
///
/// Fails with [`CeterisError::SchemaMismatch`] when a requested variable was
/// not profiled by every source or a group mixes variable kinds, and with
/// [`CeterisError::GridMismatch`] when continuous profiles of one group were
/// built from different grids. No partial output is produced on failure.
pub fn aggregate(
    collection: &ProfileCollection,
    options: &AggregateOptions,
) -> Result<Aggregation> {
    if let Some(variables) = &options.variables {
        check_sources(collection, variables)?;
    }

    let mut groups: BTreeMap<(String, String), Vec<&Profile>> = BTreeMap::new();
    for profile in collection.iter().filter(|p| options.includes(&p.variable)) {
        let key = (profile.variable.clone(), options.group_by.key(profile));
        groups.entry(key).or_default().push(profile);
    }

    for ((variable, group), members) in &groups {
        check_group(variable, group, members)?;
    }

    let mut aggregation = Aggregation::default();
    for ((variable, group), members) in groups {
        let kind = members[0].kind;

        let mut cells: BTreeMap<ValueKey, (Value, Vec<f64>)> = BTreeMap::new();
        for point in members.iter().flat_map(|p| &p.points) {
            // inserted observation values are not shared by the other profiles
            if kind == VariableKind::Continuous && !point.on_grid {
                continue;
            }
            cells
                .entry(point.value.key())
                .or_insert_with(|| (point.value.clone(), Vec::new()))
                .1
                .push(point.response);
        }

        let mut points = Vec::with_capacity(cells.len());
        for (value, responses) in cells.into_values() {
            match options.reduction.apply(&responses) {
                Some(response) => points.push(AggregatedPoint {
                    value,
                    response,
                    count: responses.iter().filter(|r| !r.is_nan()).count(),
                }),
                None => {
                    warn!(
                        variable = %variable,
                        group = %group,
                        value = %value,
                        "Omitting empty group"
                    );
                    let error = CeterisError::EmptyGroup {
                        variable: variable.clone(),
                        group: group.clone(),
                        value: value.to_string(),
                    };
                    aggregation.diagnostics.push(
                        Diagnostic::new(group.clone(), error)
                            .with_variable(variable.clone())
                            .with_value(value),
                    );
                }
            }
        }

        if points.is_empty() {
            continue;
        }

        aggregation.profiles.push(AggregatedProfile {
            grid_fingerprint: (kind == VariableKind::Continuous)
                .then(|| members[0].grid_fingerprint),
            profiles: members.len(),
            variable,
            group,
            kind,
            points,
        });
    }

    info!(
        reduction = options.reduction.name(),
        input = collection.len(),
        curves = aggregation.profiles.len(),
        omitted = aggregation.diagnostics.len(),
        "Aggregated profiles"
    );
    Ok(aggregation)
}

fn check_sources(collection: &ProfileCollection, variables: &[String]) -> Result<()> {
    for source in collection.sources() {
        if let Some(missing) = variables.iter().find(|v| !source.variables.contains_key(*v)) {
            return Err(CeterisError::SchemaMismatch {
                variable: missing.clone(),
                reason: format!("source '{}' did not profile it", source.label),
            });
        }
    }
    Ok(())
}

fn check_group(variable: &str, group: &str, members: &[&Profile]) -> Result<()> {
    let first = members[0];
    for other in &members[1..] {
        if other.kind != first.kind {
            return Err(CeterisError::SchemaMismatch {
                variable: variable.to_string(),
                reason: format!(
                    "group '{}' mixes {:?} profiles from '{}' with {:?} profiles from '{}'",
                    group, first.kind, first.label, other.kind, other.label
                ),
            });
        }
        if first.kind == VariableKind::Continuous
            && other.grid_fingerprint != first.grid_fingerprint
        {
            return Err(CeterisError::GridMismatch {
                variable: variable.to_string(),
                group: group.to_string(),
            });
        }
    }
    Ok(())
}
