//! Renderer-facing export
//!
//! Profiles and aggregated profiles are flattened into one row per point:
//!
//! ```text
//! { kind, variable, probed_value, response, group_key, is_observed, label, observation_id }
//! ```
//!
//! Rows serialize with serde (JSON) or convert to a polars `DataFrame` for CSV
//! and Parquet output. Rendering itself is left to the consumer.

use crate::aggregate::{AggregatedProfile, Aggregation, GroupBy};
use crate::data::Value;
use crate::error::Result;
use crate::profile::ProfileCollection;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Origin of an exported row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    /// Point of a single-observation profile
    Profile,
    /// Point of an aggregated curve
    Aggregate,
}

impl RowKind {
    fn as_str(&self) -> &'static str {
        match self {
            RowKind::Profile => "profile",
            RowKind::Aggregate => "aggregate",
        }
    }
}

/// One exported point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub kind: RowKind,
    pub variable: String,
    pub probed_value: Value,
    pub response: f64,
    pub group_key: String,
    pub is_observed: bool,
    /// Explainer label (profile rows only)
    pub label: Option<String>,
    /// Observation identifier (profile rows only)
    pub observation_id: Option<String>,
}

/// What goes into a plot export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Include the raw per-observation rows alongside aggregated curves
    pub show_profiles: bool,
    /// Group key written on profile rows
    pub group_by: GroupBy,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            show_profiles: true,
            group_by: GroupBy::Label,
        }
    }
}

impl ExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_show_profiles(mut self, show: bool) -> Self {
        self.show_profiles = show;
        self
    }

    pub fn with_group_by(mut self, group_by: GroupBy) -> Self {
        self.group_by = group_by;
        self
    }
}

/// Rows of every profile point, tagged with its group key
pub fn profile_rows(collection: &ProfileCollection, group_by: &GroupBy) -> Vec<ProfileRow> {
    collection
        .iter()
        .flat_map(|profile| {
            let group_key = group_by.key(profile);
            profile.points.iter().map(move |point| ProfileRow {
                kind: RowKind::Profile,
                variable: point.variable.clone(),
                probed_value: point.value.clone(),
                response: point.response,
                group_key: group_key.clone(),
                is_observed: point.is_observed,
                label: Some(profile.label.clone()),
                observation_id: Some(profile.observation_id.clone()),
            })
        })
        .collect()
}

/// Rows of aggregated curves
pub fn aggregated_rows(aggregated: &[AggregatedProfile]) -> Vec<ProfileRow> {
    aggregated
        .iter()
        .flat_map(|curve| {
            curve.points.iter().map(move |point| ProfileRow {
                kind: RowKind::Aggregate,
                variable: curve.variable.clone(),
                probed_value: point.value.clone(),
                response: point.response,
                group_key: curve.group.clone(),
                is_observed: false,
                label: None,
                observation_id: None,
            })
        })
        .collect()
}

/// Rows for a plot: aggregated curves, plus raw profiles unless hidden
///
/// Without an aggregation the raw profile rows are always returned.
pub fn plot_rows(
    collection: &ProfileCollection,
    aggregation: Option<&Aggregation>,
    options: &ExportOptions,
) -> Vec<ProfileRow> {
    let mut rows = Vec::new();
    if options.show_profiles || aggregation.is_none() {
        rows.extend(profile_rows(collection, &options.group_by));
    }
    if let Some(aggregation) = aggregation {
        rows.extend(aggregated_rows(&aggregation.profiles));
    }
    rows
}

/// Rows as pretty JSON
pub fn to_json(rows: &[ProfileRow]) -> Result<String> {
    Ok(serde_json::to_string_pretty(rows)?)
}

pub fn write_json(rows: &[ProfileRow], path: impl AsRef<Path>) -> Result<()> {
    std::fs::write(path, to_json(rows)?)?;
    Ok(())
}

/// Rows as a DataFrame; probed values are rendered as strings
pub fn to_dataframe(rows: &[ProfileRow]) -> Result<DataFrame> {
    let kind: Vec<&str> = rows.iter().map(|r| r.kind.as_str()).collect();
    let variable: Vec<&str> = rows.iter().map(|r| r.variable.as_str()).collect();
    let probed_value: Vec<String> = rows.iter().map(|r| r.probed_value.to_string()).collect();
    let response: Vec<f64> = rows.iter().map(|r| r.response).collect();
    let group_key: Vec<&str> = rows.iter().map(|r| r.group_key.as_str()).collect();
    let is_observed: Vec<bool> = rows.iter().map(|r| r.is_observed).collect();
    let label: Vec<Option<&str>> = rows.iter().map(|r| r.label.as_deref()).collect();
    let observation_id: Vec<Option<&str>> =
        rows.iter().map(|r| r.observation_id.as_deref()).collect();

    Ok(DataFrame::new(vec![
        Series::new("kind".into(), kind).into(),
        Series::new("variable".into(), variable).into(),
        Series::new("probed_value".into(), probed_value).into(),
        Series::new("response".into(), response).into(),
        Series::new("group_key".into(), group_key).into(),
        Series::new("is_observed".into(), is_observed).into(),
        Series::new("label".into(), label).into(),
        Series::new("observation_id".into(), observation_id).into(),
    ])?)
}

/// Write rows as CSV (with header)
pub fn write_csv(rows: &[ProfileRow], path: impl AsRef<Path>) -> Result<()> {
    let mut df = to_dataframe(rows)?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, AggregateOptions};
    use crate::data::{Record, VariableKind};
    use crate::profile::{Profile, ProfilePoint};

    fn collection() -> ProfileCollection {
        let profile = |obs: &str, responses: [f64; 2]| Profile {
            label: "M1".to_string(),
            observation_id: obs.to_string(),
            variable: "feature2".to_string(),
            kind: VariableKind::Categorical,
            grid_fingerprint: 3,
            observation: Record::new().with("feature2", "x"),
            observed_prediction: Some(responses[0]),
            observed_response: None,
            points: ["x", "y"]
                .iter()
                .zip(responses)
                .map(|(level, response)| ProfilePoint {
                    variable: "feature2".to_string(),
                    value: Value::from(*level),
                    response,
                    is_observed: *level == "x",
                    on_grid: true,
                })
                .collect(),
        };
        vec![profile("0", [1.0, 2.0]), profile("1", [3.0, 4.0])]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_profile_rows() {
        let rows = profile_rows(&collection(), &GroupBy::Observation);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].group_key, "M1:0");
        assert!(rows[0].is_observed);
        assert_eq!(rows[3].observation_id.as_deref(), Some("1"));
    }

    #[test]
    fn test_plot_rows_can_hide_profiles() {
        let collection = collection();
        let aggregation = aggregate(&collection, &AggregateOptions::new()).unwrap();

        let all = plot_rows(&collection, Some(&aggregation), &ExportOptions::new());
        assert_eq!(all.len(), 6);

        let hidden = plot_rows(
            &collection,
            Some(&aggregation),
            &ExportOptions::new().with_show_profiles(false),
        );
        assert_eq!(hidden.len(), 2);
        assert!(hidden.iter().all(|r| r.kind == RowKind::Aggregate && r.group_key == "M1"));
        assert_eq!(hidden[0].response, 2.0);
        assert_eq!(hidden[1].response, 3.0);
    }

    #[test]
    fn test_json_schema() {
        let aggregation = aggregate(&collection(), &AggregateOptions::new()).unwrap();
        let rows = aggregated_rows(&aggregation.profiles);
        let json: serde_json::Value = serde_json::from_str(&to_json(&rows).unwrap()).unwrap();
        let first = &json[0];
        assert_eq!(first["kind"], "aggregate");
        assert_eq!(first["variable"], "feature2");
        assert_eq!(first["probed_value"], "x");
        assert_eq!(first["group_key"], "M1");
        assert_eq!(first["is_observed"], false);
    }

    #[test]
    fn test_csv_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        let rows = profile_rows(&collection(), &GroupBy::Label);
        write_csv(&rows, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("kind,variable,probed_value,response,group_key,is_observed,label,observation_id")
        );
        assert_eq!(lines.count(), 4);
    }
}
