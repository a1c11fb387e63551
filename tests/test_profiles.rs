//! Integration test: what-if profiles end-to-end

use ceteris::compose::compose;
use ceteris::data::{Dataset, Record, Value, VariableKind};
use ceteris::error::{CeterisError, ErrorKind};
use ceteris::explainer::{
    ClassProbability, Explainer, FnPredictor, LinearModel, MatrixPredictor, PredictFailure,
    ProbabilityPredictor,
};
use ceteris::grid::{GridConfig, GridStrategy};
use ceteris::profile::{what_if, Observation, ProfileGenerator, WhatIfConfig};
use ceteris::utils::ParallelConfig;
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn reference_df() -> DataFrame {
    df!(
        "feature1" => &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
        "feature2" => &["x", "y", "x", "y", "x", "y", "x", "y", "x", "y", "x"]
    )
    .unwrap()
}

fn reference_data() -> Dataset {
    Dataset::from_dataframe(&reference_df()).unwrap()
}

fn linear_explainer(label: &str) -> Explainer {
    Explainer::builder(label)
        .with_model(
            LinearModel::new(10.0)
                .with_coefficient("feature1", 2.0)
                .with_level("feature2", "y", 1.0),
        )
        .with_data(reference_data())
        .build()
        .unwrap()
}

fn sequential(grid: GridConfig) -> WhatIfConfig {
    WhatIfConfig::new()
        .with_grid(grid)
        .with_parallel(ParallelConfig::sequential())
}

fn splits() -> GridConfig {
    GridConfig::new().with_splits(
        "feature1",
        vec![Value::from(0.0), Value::from(5.0), Value::from(10.0)],
    )
}

#[test]
fn test_schema_from_dataframe() {
    let data = reference_data();
    assert_eq!(data.len(), 11);
    assert_eq!(data.schema().kind("feature1").unwrap(), VariableKind::Continuous);
    assert_eq!(data.schema().kind("feature2").unwrap(), VariableKind::Categorical);
}

#[test]
fn test_linear_profile_on_explicit_grid() {
    let explainer = linear_explainer("M1");
    let obs = Observation::new("a", Record::new().with("feature1", 5.0).with("feature2", "x"));

    let run = ProfileGenerator::new(sequential(splits()).with_variables(["feature1"]))
        .what_if(&explainer, &[obs])
        .unwrap();

    assert!(run.is_complete(), "unexpected diagnostics: {:?}", run.diagnostics);
    assert_eq!(run.profiles.len(), 1);

    let profile = &run.profiles.profiles()[0];
    let points: Vec<(f64, f64, bool)> = profile
        .points
        .iter()
        .map(|p| (p.value.as_number().unwrap(), p.response, p.is_observed))
        .collect();
    assert_eq!(points, vec![(0.0, 10.0, false), (5.0, 20.0, true), (10.0, 30.0, false)]);
}

#[test]
fn test_observed_point_matches_direct_prediction() {
    let explainer = linear_explainer("M1");
    let observations: Vec<Observation> = [0usize, 3, 7]
        .iter()
        .map(|&i| explainer.observation(i).unwrap())
        .chain(std::iter::once(Observation::new(
            "off-grid",
            Record::new().with("feature1", 3.3).with("feature2", "z"),
        )))
        .collect();

    let run = what_if(&explainer, &observations, None).unwrap();
    assert_eq!(run.profiles.len(), observations.len() * 2);

    for profile in &run.profiles {
        let direct = explainer.predict(std::slice::from_ref(&profile.observation)).unwrap()[0];
        let observed = profile.observed_point().expect("observed point present");
        assert!((observed.response - direct).abs() < 1e-12);
        assert_eq!(profile.observed_prediction, Some(direct));
        assert_eq!(Some(&observed.value), profile.observation.get(&profile.variable));
    }
}

#[test]
fn test_default_grid_properties() {
    let explainer = linear_explainer("M1");
    let obs = Observation::new("a", Record::new().with("feature1", 2.25).with("feature2", "z"));
    let config = sequential(GridConfig::new().with_resolution(21));
    let run = ProfileGenerator::new(config).what_if(&explainer, &[obs]).unwrap();

    let continuous = run.profiles.for_variable("feature1").next().unwrap();
    let xs: Vec<f64> = continuous.probed_values().map(|v| v.as_number().unwrap()).collect();
    assert!(xs.windows(2).all(|w| w[0] < w[1]), "grid must be strictly increasing");
    assert_eq!(xs.len(), 22);
    assert_eq!(xs[0], 0.0);
    assert_eq!(xs[xs.len() - 1], 10.0);

    let categorical = run.profiles.for_variable("feature2").next().unwrap();
    let levels: Vec<&Value> = categorical.probed_values().collect();
    assert_eq!(levels, vec![&Value::from("x"), &Value::from("y"), &Value::from("z")]);
    assert!(categorical.points[2].is_observed);
    assert!(!categorical.points[2].on_grid);
}

#[test]
fn test_uniform_strategy() {
    let explainer = linear_explainer("M1");
    let obs = explainer.observation(0).unwrap();
    let config = sequential(
        GridConfig::new()
            .with_resolution(5)
            .with_strategy(GridStrategy::Uniform),
    )
    .with_variables(["feature1"]);
    let run = ProfileGenerator::new(config).what_if(&explainer, &[obs]).unwrap();

    let xs: Vec<f64> = run.profiles.profiles()[0]
        .probed_values()
        .map(|v| v.as_number().unwrap())
        .collect();
    assert_eq!(xs, vec![0.0, 2.5, 5.0, 7.5, 10.0]);
}

#[test]
fn test_failing_grid_value_is_isolated() {
    let explainer = Explainer::builder("M1")
        .with_model(FnPredictor::new(|batch: &[Record]| {
            batch
                .iter()
                .enumerate()
                .map(|(i, r)| match r.number("feature1") {
                    Some(x) if x == 10.0 => Err(PredictFailure::at(i, "cannot score 10")),
                    Some(x) => Ok(2.0 * x + 10.0),
                    None => Err(PredictFailure::at(i, "feature1 missing")),
                })
                .collect()
        }))
        .with_data(reference_data())
        .build()
        .unwrap();
    let obs = Observation::new("a", Record::new().with("feature1", 5.0).with("feature2", "x"));

    let run = ProfileGenerator::new(sequential(splits()).with_variables(["feature1"]))
        .what_if(&explainer, &[obs])
        .unwrap();

    let profile = &run.profiles.profiles()[0];
    let values: Vec<f64> = profile.probed_values().map(|v| v.as_number().unwrap()).collect();
    assert_eq!(values, vec![0.0, 5.0]);

    assert_eq!(run.diagnostics.len(), 1);
    let diagnostic = &run.diagnostics[0];
    assert_eq!(diagnostic.kind(), ErrorKind::Prediction);
    assert_eq!(diagnostic.value, Some(Value::from(10.0)));
    assert_eq!(diagnostic.observation_id.as_deref(), Some("a"));
    assert!(diagnostic.to_string().contains("cannot score 10"));
}

#[test]
fn test_wrong_output_length_is_reported() {
    let explainer = Explainer::builder("broken")
        .with_model(FnPredictor::new(|_: &[Record]| Ok(vec![1.0])))
        .with_data(reference_data())
        .build()
        .unwrap();
    let obs = explainer.observation(0).unwrap();

    let run = ProfileGenerator::new(sequential(splits()).with_variables(["feature1"]))
        .what_if(&explainer, &[obs])
        .unwrap();

    // single-record retries succeed, so only the batch was malformed
    assert_eq!(run.profiles.profiles()[0].points.len(), 3);
    assert!(run.is_complete());

    let err = explainer.predict(&reference_data().rows()[..2]).unwrap_err();
    assert!(matches!(err, CeterisError::PredictionError { index: None, .. }));
}

#[test]
fn test_serialized_predictor_under_parallel_run() {
    let active = Arc::new(AtomicUsize::new(0));
    let overlap = Arc::new(AtomicUsize::new(0));
    let (a, o) = (Arc::clone(&active), Arc::clone(&overlap));

    let explainer = Explainer::builder("serial")
        .with_model(
            FnPredictor::new(move |batch: &[Record]| {
                if a.fetch_add(1, Ordering::SeqCst) > 0 {
                    o.fetch_add(1, Ordering::SeqCst);
                }
                std::thread::sleep(std::time::Duration::from_millis(1));
                a.fetch_sub(1, Ordering::SeqCst);
                Ok(batch.iter().map(|r| r.number("feature1").unwrap_or(0.0)).collect())
            })
            .serialized(),
        )
        .with_data(reference_data())
        .build()
        .unwrap();

    let observations: Vec<Observation> =
        (0..8).map(|i| explainer.observation(i).unwrap()).collect();
    let config = WhatIfConfig::new()
        .with_grid(GridConfig::new().with_resolution(5))
        .with_parallel(ParallelConfig::new().with_threads(4));
    let run = ProfileGenerator::new(config).what_if(&explainer, &observations).unwrap();

    assert_eq!(run.profiles.len(), 16);
    assert_eq!(overlap.load(Ordering::SeqCst), 0);
}

#[test]
fn test_matrix_predictor() {
    let data = Dataset::new(
        (0..5)
            .map(|i| Record::new().with("a", i as f64).with("b", 1.0))
            .collect(),
    );
    let model = MatrixPredictor::new(vec!["a".to_string(), "b".to_string()], |x: &Array2<f64>| {
        Ok(x.rows().into_iter().map(|row| row[0] * row[1] + 1.0).collect::<Array1<f64>>())
    });
    let explainer = Explainer::builder("matrix")
        .with_model(model)
        .with_data(data)
        .build()
        .unwrap();

    let obs = explainer.observation(2).unwrap();
    let config = sequential(GridConfig::new().with_resolution(5)).with_variables(["a"]);
    let run = ProfileGenerator::new(config).what_if(&explainer, &[obs]).unwrap();
    let responses: Vec<f64> = run.profiles.profiles()[0].responses().collect();
    assert_eq!(responses.len(), 5);
    assert_eq!(responses[0], 1.0);
    assert_eq!(responses[4], 5.0);
}

struct Threshold;

impl ProbabilityPredictor for Threshold {
    fn predict_proba(
        &self,
        batch: &[Record],
    ) -> Result<Vec<BTreeMap<String, f64>>, PredictFailure> {
        Ok(batch
            .iter()
            .map(|r| {
                let p = (r.number("feature1").unwrap_or(0.0) / 10.0).clamp(0.0, 1.0);
                BTreeMap::from([("yes".to_string(), p), ("no".to_string(), 1.0 - p)])
            })
            .collect())
    }
}

#[test]
fn test_one_explainer_per_class() {
    let model = Arc::new(Threshold);
    let explainers: Vec<Explainer> = ["yes", "no"]
        .iter()
        .map(|class| {
            Explainer::builder(*class)
                .with_model(ClassProbability::new(Arc::clone(&model), *class))
                .with_data(reference_data())
                .build()
                .unwrap()
        })
        .collect();

    let obs = Observation::new("a", Record::new().with("feature1", 5.0).with("feature2", "x"));
    let generator = ProfileGenerator::new(sequential(splits()).with_variables(["feature1"]));
    let refs: Vec<&Explainer> = explainers.iter().collect();
    let run = generator.what_if_all(&refs, &[obs]).unwrap();

    assert_eq!(run.profiles.labels(), vec!["yes", "no"]);
    let yes: Vec<f64> = run.profiles.profiles()[0].responses().collect();
    let no: Vec<f64> = run.profiles.profiles()[1].responses().collect();
    assert_eq!(yes, vec![0.0, 0.5, 1.0]);
    assert_eq!(no, vec![1.0, 0.5, 0.0]);
}

#[test]
fn test_compose_preserves_provenance() {
    let m1 = linear_explainer("M1");
    let m2 = linear_explainer("M2");
    let obs = vec![m1.observation(4).unwrap()];

    let a = what_if(&m1, &obs, Some(&["feature2"][..])).unwrap();
    let b = what_if(&m2, &obs, Some(&["feature2"][..])).unwrap();
    let composed = compose(vec![a.profiles, b.profiles]);

    assert_eq!(composed.len(), 2);
    assert_eq!(composed.labels(), vec!["M1", "M2"]);
    assert!(composed.iter().all(|p| p.observation_id == "4"));
}

#[test]
fn test_response_vector_and_residuals() {
    let mut data = Dataset::from_dataframe(
        &df!(
            "x" => &[1.0, 2.0, 3.0],
            "y" => &[12.5, 14.0, 16.5]
        )
        .unwrap(),
    )
    .unwrap();
    let response: Vec<f64> = data
        .take_column("y")
        .unwrap()
        .iter()
        .map(|v| v.as_number().unwrap())
        .collect();

    let explainer = Explainer::builder("M1")
        .with_model(LinearModel::new(10.0).with_coefficient("x", 2.0))
        .with_data(data)
        .with_response(response)
        .build()
        .unwrap();

    let residuals = explainer.residuals().unwrap().unwrap();
    assert_eq!(residuals, vec![0.5, 0.0, 0.5]);

    let run = what_if(&explainer, &[explainer.observation(1).unwrap()], None).unwrap();
    assert_eq!(run.profiles.len(), 1);
    assert_eq!(run.profiles.profiles()[0].residual(), Some(0.0));
}

#[test]
fn test_construction_errors() {
    let missing_model = Explainer::builder("M1").with_data(reference_data()).build();
    assert_eq!(missing_model.unwrap_err().kind(), ErrorKind::Configuration);

    let short_response = Explainer::builder("M1")
        .with_model(LinearModel::new(0.0))
        .with_data(reference_data())
        .with_response(vec![1.0, 2.0])
        .build();
    assert_eq!(short_response.unwrap_err().kind(), ErrorKind::Configuration);
}
