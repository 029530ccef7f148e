//! Scenario wiring and parallel batch evaluation.
//!
//! Every job owns its engine, source, and strategy, so jobs share no mutable
//! state and one failure never affects another.

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::{EngineConfig, ScenarioConfig, StrategyConfig};
use crate::error::SimError;
use crate::sim::{MetricsSummary, SimulationEngine};
use crate::source::{self, TimeSeriesSource};
use crate::strategy::{self, InverterStrategy};

/// Engine driven by runtime-selected source and strategy.
pub type DynEngine =
    SimulationEngine<Box<dyn TimeSeriesSource + Send>, Box<dyn InverterStrategy + Send>>;

/// One independent simulation to run.
pub struct BatchJob {
    pub label: String,
    pub config: EngineConfig,
    pub source: Box<dyn TimeSeriesSource + Send>,
    pub strategy: Box<dyn InverterStrategy + Send>,
}

/// Result of one job: its metrics and step count, or the error that aborted it.
#[derive(Debug)]
pub struct BatchOutcome {
    pub label: String,
    pub result: Result<(MetricsSummary, usize), SimError>,
}

impl BatchJob {
    /// Builds a job from a full scenario using its configured source and strategy.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Configuration` if the scenario fails validation, and
    /// `SimError::Source` or `SimError::Strategy` (at timestep 0) if either
    /// cannot be constructed.
    pub fn from_scenario(label: impl Into<String>, scenario: &ScenarioConfig) -> Result<Self, SimError> {
        let errors = scenario.validate();
        if !errors.is_empty() {
            return Err(SimError::Configuration(errors));
        }
        let source = source::from_config(&scenario.source).map_err(|e| SimError::from_source(0, e))?;
        let rating_kw = scenario
            .storage
            .max_charge_kw
            .max(scenario.storage.max_discharge_kw);
        let strategy = strategy::from_config(&scenario.strategy, rating_kw)
            .map_err(|source| SimError::Strategy {
                timestep: 0,
                source,
            })?;
        Ok(Self {
            label: label.into(),
            config: scenario.engine_config(),
            source,
            strategy,
        })
    }

    /// Builds the engine for this job.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Configuration` for invalid engine parameters.
    pub fn into_engine(self) -> Result<DynEngine, SimError> {
        SimulationEngine::new(&self.config, self.source, self.strategy)
    }
}

/// One job per built-in strategy, all on the same scenario.
///
/// Each job gets its own freshly built source, so seeded synthetic sources
/// replay identical samples for every strategy.
///
/// # Errors
///
/// See [`BatchJob::from_scenario`].
pub fn compare_jobs(scenario: &ScenarioConfig) -> Result<Vec<BatchJob>, SimError> {
    strategy::BUILTIN
        .iter()
        .map(|kind| {
            let mut variant = scenario.clone();
            variant.strategy = StrategyConfig {
                kind: (*kind).to_string(),
                ..scenario.strategy.clone()
            };
            BatchJob::from_scenario(*kind, &variant)
        })
        .collect()
}

fn run_job(job: BatchJob) -> BatchOutcome {
    let label = job.label.clone();
    let result = job.into_engine().and_then(|mut engine| {
        engine.run()?;
        let (run, summary) = engine.into_parts();
        Ok((summary, run.len()))
    });
    match &result {
        Ok((_, steps)) => info!(job = %label, steps, "batch job finished"),
        Err(e) => warn!(job = %label, error = %e, "batch job failed"),
    }
    BatchOutcome { label, result }
}

/// Runs all jobs on the global rayon pool.
///
/// Outcomes are returned in input order.
pub fn run_batch(jobs: Vec<BatchJob>) -> Vec<BatchOutcome> {
    jobs.into_par_iter().map(run_job).collect()
}

/// Runs all jobs on a dedicated pool of `threads` workers (0 = one per CPU).
///
/// # Errors
///
/// Returns an error if the thread pool cannot be built.
pub fn run_batch_with_threads(
    jobs: Vec<BatchJob>,
    threads: usize,
) -> Result<Vec<BatchOutcome>, rayon::ThreadPoolBuildError> {
    let pool = ThreadPoolBuilder::new().num_threads(threads).build()?;
    Ok(pool.install(|| run_batch(jobs)))
}
