//! What-if engine
//!
//! For every (observation, variable) pair the engine copies the observation
//! once per grid value, replacing only that variable, and scores all copies in
//! a single batched call. Pairs are independent and run on the worker pool
//! configured in [`WhatIfConfig::parallel`].

use super::{
    Diagnostic, Observation, Profile, ProfileCollection, ProfilePoint, ProfileRun, SourceSchema,
    WhatIfConfig,
};
use crate::data::Record;
use crate::error::{CeterisError, Result};
use crate::explainer::Explainer;
use crate::utils::parallel_map;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of profiling one (observation, variable) pair
#[derive(Default)]
struct PairOutcome {
    profile: Option<Profile>,
    diagnostics: Vec<Diagnostic>,
}

/// Produces ceteris-paribus profiles
#[derive(Debug, Clone, Default)]
pub struct ProfileGenerator {
    config: WhatIfConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl ProfileGenerator {
    pub fn new(config: WhatIfConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// Abandon the run once `flag` is set
    ///
    /// The flag is checked between (observation, variable) pairs; pairs not
    /// started yet are reported as cancelled.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &WhatIfConfig {
        &self.config
    }

    /// Profile every requested variable of every observation
    ///
    /// Only configuration problems (e.g. an unusable thread pool) are returned
    /// as errors; everything else ends up in [`ProfileRun::diagnostics`].
    pub fn what_if(
        &self,
        explainer: &Explainer,
        observations: &[Observation],
    ) -> Result<ProfileRun> {
        let tasks: Vec<(&Observation, String)> = observations
            .iter()
            .flat_map(|obs| {
                self.variables_for(obs)
                    .into_iter()
                    .map(move |variable| (obs, variable))
            })
            .collect();

        let source = source_schema(explainer, tasks.iter().map(|(_, v)| v.as_str()));

        let outcomes = parallel_map(tasks, &self.config.parallel, |(obs, variable)| {
            self.profile_pair(explainer, obs, &variable)
        })?;

        let mut profiles = Vec::new();
        let mut diagnostics = Vec::new();
        for outcome in outcomes {
            profiles.extend(outcome.profile);
            diagnostics.extend(outcome.diagnostics);
        }

        info!(
            label = %explainer.label(),
            observations = observations.len(),
            profiles = profiles.len(),
            diagnostics = diagnostics.len(),
            "What-if run finished"
        );

        Ok(ProfileRun {
            profiles: ProfileCollection::from_parts(profiles, vec![source]),
            diagnostics,
        })
    }

    /// Profile the same observations through several explainers
    pub fn what_if_all(
        &self,
        explainers: &[&Explainer],
        observations: &[Observation],
    ) -> Result<ProfileRun> {
        let mut run = ProfileRun::default();
        for explainer in explainers {
            run.merge(self.what_if(explainer, observations)?);
        }
        Ok(run)
    }

    fn variables_for(&self, obs: &Observation) -> Vec<String> {
        match &self.config.variables {
            Some(vars) => vars.clone(),
            None => obs.record.names().map(str::to_string).collect(),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn profile_pair(
        &self,
        explainer: &Explainer,
        obs: &Observation,
        variable: &str,
    ) -> PairOutcome {
        let mut outcome = PairOutcome::default();

        if self.is_cancelled() {
            outcome.diagnostics.push(
                Diagnostic::new(explainer.label(), CeterisError::Cancelled)
                    .with_observation(&obs.id)
                    .with_variable(variable),
            );
            return outcome;
        }

        match self.probe(explainer, obs, variable, &mut outcome.diagnostics) {
            Ok(profile) => outcome.profile = profile,
            Err(err) => {
                warn!(
                    label = %explainer.label(),
                    observation = %obs.id,
                    variable,
                    error = %err,
                    "Skipping variable"
                );
                outcome.diagnostics.push(
                    Diagnostic::new(explainer.label(), err)
                        .with_observation(&obs.id)
                        .with_variable(variable),
                );
            }
        }
        outcome
    }

    fn probe(
        &self,
        explainer: &Explainer,
        obs: &Observation,
        variable: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Option<Profile>> {
        let observed = obs.record.get(variable).ok_or_else(|| {
            CeterisError::unsupported(
                variable,
                format!("observation '{}' has no value for it", obs.id),
            )
        })?;

        let shared = explainer.grid(variable, &self.config.grid)?;
        let (grid, observed_idx) = shared.with_observed(observed)?;

        let batch: Vec<Record> = grid
            .values()
            .iter()
            .map(|v| obs.record.replaced(variable, v.clone()))
            .collect();

        debug!(
            label = %explainer.label(),
            observation = %obs.id,
            variable,
            points = batch.len(),
            "Probing variable"
        );

        let scores: Vec<Option<f64>> = match explainer.predict(&batch) {
            Ok(scores) => scores.into_iter().map(Some).collect(),
            Err(err) => {
                warn!(
                    label = %explainer.label(),
                    observation = %obs.id,
                    variable,
                    error = %err,
                    "Batch prediction failed, probing grid points one by one"
                );
                let mut scores = Vec::with_capacity(batch.len());
                for (i, record) in batch.iter().enumerate() {
                    match explainer.predict(std::slice::from_ref(record)) {
                        Ok(s) => scores.push(s.first().copied()),
                        Err(err) => {
                            let value = grid.values()[i].clone();
                            warn!(
                                label = %explainer.label(),
                                observation = %obs.id,
                                variable,
                                value = %value,
                                "Dropping grid point"
                            );
                            diagnostics.push(
                                Diagnostic::new(explainer.label(), at_grid_index(err, i))
                                    .with_observation(&obs.id)
                                    .with_variable(variable)
                                    .with_value(value),
                            );
                            scores.push(None);
                        }
                    }
                }
                scores
            }
        };

        let observed_prediction = match observed_idx {
            Some(i) => scores[i],
            // missing observed value: the unmodified record is not on the grid
            None => match explainer.predict(std::slice::from_ref(&obs.record)) {
                Ok(s) => s.first().copied(),
                Err(err) => {
                    diagnostics.push(
                        Diagnostic::new(explainer.label(), err)
                            .with_observation(&obs.id)
                            .with_variable(variable)
                            .with_value(observed.clone()),
                    );
                    None
                }
            },
        };

        let points: Vec<ProfilePoint> = grid
            .values()
            .iter()
            .zip(&scores)
            .enumerate()
            .filter_map(|(i, (value, score))| {
                score.map(|response| ProfilePoint {
                    variable: variable.to_string(),
                    value: value.clone(),
                    response,
                    is_observed: observed_idx == Some(i),
                    on_grid: grid.inserted_index() != Some(i),
                })
            })
            .collect();

        if points.is_empty() {
            return Ok(None);
        }

        Ok(Some(Profile {
            label: explainer.label().to_string(),
            observation_id: obs.id.clone(),
            variable: variable.to_string(),
            kind: grid.kind(),
            grid_fingerprint: grid.fingerprint(),
            observation: obs.record.clone(),
            observed_prediction,
            observed_response: obs.response,
            points,
        }))
    }
}

/// Profile `observations` through `explainer` with default grid settings
///
/// `variables` restricts the profiled variables; `None` profiles every
/// variable of each observation.
pub fn what_if(
    explainer: &Explainer,
    observations: &[Observation],
    variables: Option<&[&str]>,
) -> Result<ProfileRun> {
    let mut config = WhatIfConfig::default();
    if let Some(vars) = variables {
        config = config.with_variables(vars.iter().copied());
    }
    ProfileGenerator::new(config).what_if(explainer, observations)
}

// Single-record failures report index 0; point them at the grid position instead.
fn at_grid_index(err: CeterisError, index: usize) -> CeterisError {
    match err {
        CeterisError::PredictionError { label, source, .. } => CeterisError::PredictionError {
            label,
            index: Some(index),
            source,
        },
        other => other,
    }
}

fn source_schema<'a>(
    explainer: &Explainer,
    variables: impl Iterator<Item = &'a str>,
) -> SourceSchema {
    let mut kinds = BTreeMap::new();
    for variable in variables {
        if let Ok(kind) = explainer.kind(variable) {
            kinds.insert(variable.to_string(), kind);
        }
    }
    SourceSchema {
        label: explainer.label().to_string(),
        variables: kinds,
    }
}
