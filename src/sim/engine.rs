//! Simulation engine that drives source, strategy, storage, and power balance.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::config::EngineConfig;
use crate::error::SimError;
use crate::source::{SourceError, TimeSeriesSource};
use crate::strategy::{DecisionContext, InverterStrategy, validate_action};

use super::clock::Clock;
use super::metrics::{MetricsCollector, MetricsSummary};
use super::power_balance::EnergyBalanceResolver;
use super::run::SimulationRun;
use super::storage::StorageModel;
use super::types::{StepRecord, StorageState};

/// Upper bound on records reserved up front; longer runs grow on demand.
const MAX_PREALLOCATED_STEPS: usize = 1 << 16;

/// Lifecycle of a [`SimulationEngine`].
///
/// `Idle -> Running -> Completed | Aborted`; terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    Idle,
    Running,
    Completed,
    Aborted,
}

impl EngineState {
    /// Whether no further steps can run.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

/// Discrete-time simulation of one microgrid run.
///
/// Generic over the source and strategy for static dispatch; boxed trait
/// objects work too when either is chosen at runtime. One engine runs one
/// scenario once. Each step is atomic: a failing step leaves the storage,
/// the run, and the metrics exactly as they were after the previous step.
pub struct SimulationEngine<S: TimeSeriesSource, T: InverterStrategy> {
    source: S,
    strategy: T,
    storage: StorageModel,
    resolver: EnergyBalanceResolver,
    clock: Clock,
    run: SimulationRun,
    metrics: MetricsCollector,
    state: EngineState,
    cancel: Option<Arc<AtomicBool>>,
    span: tracing::Span,
}

impl<S: TimeSeriesSource, T: InverterStrategy> SimulationEngine<S, T> {
    /// Creates an engine in the `Idle` state.
    ///
    /// # Arguments
    ///
    /// * `config` - Timing, storage, and grid parameters
    /// * `source` - Scenario samples, consumed as the run advances
    /// * `strategy` - Control strategy invoked once per step
    ///
    /// # Errors
    ///
    /// Returns `SimError::Configuration` listing every invalid parameter.
    pub fn new(config: &EngineConfig, source: S, strategy: T) -> Result<Self, SimError> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(SimError::Configuration(errors));
        }

        let storage = StorageModel::new(&config.storage)?;
        let resolver = EnergyBalanceResolver::new(&config.grid, config.simulation.tolerance);
        let clock = Clock::new(config.simulation.timestep_hours);
        let run = SimulationRun::with_capacity(source.size_hint().0.min(MAX_PREALLOCATED_STEPS));
        let metrics = MetricsCollector::new(storage.capacity_kwh());
        let span = info_span!("run", strategy = strategy.name());

        Ok(Self {
            source,
            strategy,
            storage,
            resolver,
            clock,
            run,
            metrics,
            state: EngineState::Idle,
            cancel: None,
            span,
        })
    }

    /// Shares a cancellation flag; setting it aborts the run before the next step.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Completes the run after at most `steps` steps even if the source has more.
    pub fn with_step_limit(mut self, steps: usize) -> Self {
        self.clock = self.clock.with_limit(steps);
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Steps recorded so far.
    pub fn history(&self) -> &SimulationRun {
        &self.run
    }

    /// Current storage snapshot.
    pub fn storage(&self) -> StorageState {
        self.storage.state()
    }

    /// Metrics over the steps recorded so far.
    pub fn metrics(&self) -> MetricsSummary {
        self.metrics.summary()
    }

    /// Name of the strategy driving this engine.
    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// Executes one step.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(record))` - The step just completed
    /// * `Ok(None)` - The source is exhausted; the engine is now `Completed`
    ///
    /// # Errors
    ///
    /// Any source, strategy, or balance failure aborts the run and is returned.
    /// Calling this on a `Completed` or `Aborted` engine returns
    /// `SimError::Finished`.
    pub fn advance(&mut self) -> Result<Option<&StepRecord>, SimError> {
        match self.state {
            EngineState::Completed | EngineState::Aborted => {
                return Err(SimError::Finished { state: self.state });
            }
            EngineState::Idle => {
                self.state = EngineState::Running;
                let _enter = self.span.enter();
                info!(
                    soc_kwh = self.storage.soc_kwh(),
                    expected_steps = self.source.size_hint().0,
                    "run started"
                );
            }
            EngineState::Running => {}
        }

        let span = self.span.clone();
        let _enter = span.enter();
        match self.step() {
            Ok(true) => Ok(self.run.last()),
            Ok(false) => {
                self.state = EngineState::Completed;
                let m = self.metrics.summary();
                info!(
                    steps = m.steps,
                    unmet_load_kwh = m.unmet_load_kwh,
                    curtailment_kwh = m.curtailment_kwh,
                    grid_import_kwh = m.grid_import_kwh,
                    grid_export_kwh = m.grid_export_kwh,
                    "run completed"
                );
                Ok(None)
            }
            Err(e) => {
                self.state = EngineState::Aborted;
                warn!(steps = self.run.len(), error = %e, "run aborted");
                Err(e)
            }
        }
    }

    /// Advances until the source is exhausted.
    ///
    /// # Errors
    ///
    /// See [`SimulationEngine::advance`]. The partial run stays available via
    /// [`SimulationEngine::history`].
    pub fn run(&mut self) -> Result<&SimulationRun, SimError> {
        while self.advance()?.is_some() {}
        Ok(&self.run)
    }

    /// Cancels the run between steps. No-op on a terminal engine.
    pub fn abort(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.state = EngineState::Aborted;
        let _enter = self.span.enter();
        warn!(steps = self.run.len(), "run aborted by caller");
    }

    /// Hands out the recorded steps, consuming the engine.
    pub fn into_run(self) -> SimulationRun {
        self.run
    }

    /// Hands out the recorded steps and their metrics, consuming the engine.
    pub fn into_parts(self) -> (SimulationRun, MetricsSummary) {
        let summary = self.metrics.summary();
        (self.run, summary)
    }

    /// One step; `Ok(false)` when there is nothing left to simulate.
    fn step(&mut self) -> Result<bool, SimError> {
        let timestep = self.clock.peek();
        let t = timestep.index;

        if self
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            return Err(SimError::Cancelled { timestep: t });
        }
        if self.clock.is_done() {
            return Ok(false);
        }

        // 1. Scenario input
        let sample = match self.source.next_sample() {
            None => return Ok(false),
            Some(Err(e)) => return Err(SimError::from_source(t, e)),
            Some(Ok(sample)) => sample,
        };
        if let Some(message) = sample.validate() {
            return Err(SimError::Source {
                timestep: t,
                source: SourceError::Invalid(message),
            });
        }

        // 2. Strategy decision over the pre-step state
        let context = DecisionContext::new(timestep, sample, self.storage.state(), self.run.steps());
        let action = self
            .strategy
            .decide(&context)
            .and_then(|action| validate_action(&action).map(|()| action))
            .map_err(|source| SimError::Strategy { timestep: t, source })?;

        // 3. Physics on a working copy; charging never outruns generation plus import
        let headroom_kw = self
            .resolver
            .charge_headroom_kw(sample.generation_kw, sample.load_kw, action.grid);
        let mut storage = self.storage.clone();
        let outcome = storage.apply(action.storage_kw.min(headroom_kw), timestep.duration_hours);
        let flow = self
            .resolver
            .resolve_with_limits(
                sample.generation_kw,
                sample.load_kw,
                outcome.realized_kw,
                action.grid,
            )
            .map_err(|e| e.at_timestep(t))?;

        let record = StepRecord {
            timestep,
            sample,
            action,
            flow,
            storage: storage.state(),
        };
        debug!(
            t,
            generation_kw = flow.generation_kw,
            load_kw = flow.load_kw,
            requested_kw = action.storage_kw,
            storage_kw = flow.storage_kw,
            soc_kwh = outcome.soc_kwh,
            import_kw = flow.grid_import_kw,
            export_kw = flow.grid_export_kw,
            curtailment_kw = flow.curtailment_kw,
            unmet_kw = flow.unmet_load_kw,
            "step"
        );

        // 4. Commit
        self.storage = storage;
        self.metrics.record(&record);
        self.run.push(record);
        self.clock.tick();
        Ok(true)
    }
}
