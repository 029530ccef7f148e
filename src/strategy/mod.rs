//! Control strategies: the pluggable decision point of every step.
//!
//! A strategy sees the current sample, the pre-step storage snapshot and the
//! history of prior steps, and returns an [`ActionRequest`]. It never touches
//! storage or grid state directly.

pub mod idle;
pub mod price_threshold;
pub mod pv_first;
pub mod scripted;

pub use idle::Idle;
pub use price_threshold::PriceThreshold;
pub use pv_first::PvFirst;
pub use scripted::Scripted;

use thiserror::Error;

use crate::config::StrategyConfig;
use crate::sim::types::{ActionRequest, RealizedFlow, ScenarioSample, StepRecord, StorageState, Timestep};

/// Failure reported by, or detected in the output of, a strategy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    /// The strategy itself gave up.
    #[error("{0}")]
    Failed(String),

    /// The returned action carries an unusable value.
    #[error("invalid action: {field} = {value}")]
    InvalidAction { field: &'static str, value: f64 },
}

/// Read-only view handed to a strategy for one decision.
///
/// # Fields
/// * `timestep` - Step being decided
/// * `sample` - Scenario input for this step
/// * `storage` - Storage state before the step
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    pub timestep: Timestep,
    pub sample: ScenarioSample,
    pub storage: StorageState,
    history: &'a [StepRecord],
}

impl<'a> DecisionContext<'a> {
    /// Creates a context over the given history.
    pub fn new(
        timestep: Timestep,
        sample: ScenarioSample,
        storage: StorageState,
        history: &'a [StepRecord],
    ) -> Self {
        Self {
            timestep,
            sample,
            storage,
            history,
        }
    }

    /// All prior steps, oldest first.
    pub fn history(&self) -> &'a [StepRecord] {
        self.history
    }

    /// Realized flows of all prior steps, oldest first.
    pub fn flows(&self) -> impl Iterator<Item = &'a RealizedFlow> + 'a {
        self.history.iter().map(|r| &r.flow)
    }

    /// The most recent completed step, if any.
    pub fn last(&self) -> Option<&'a StepRecord> {
        self.history.last()
    }
}

/// Trait implemented by every control strategy.
///
/// `decide` is called exactly once per step in increasing timestep order.
/// Requests may be infeasible; the engine clips them. Returning `Err` aborts
/// the run.
pub trait InverterStrategy {
    /// Returns the action for the step described by `context`.
    ///
    /// # Errors
    ///
    /// Any `StrategyError` aborts the run.
    fn decide(&mut self, context: &DecisionContext<'_>) -> Result<ActionRequest, StrategyError>;

    /// Human-readable strategy name for logs and reports.
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> InverterStrategy for F
where
    F: FnMut(&DecisionContext<'_>) -> Result<ActionRequest, StrategyError>,
{
    fn decide(&mut self, context: &DecisionContext<'_>) -> Result<ActionRequest, StrategyError> {
        self(context)
    }
}

impl InverterStrategy for Box<dyn InverterStrategy + Send> {
    fn decide(&mut self, context: &DecisionContext<'_>) -> Result<ActionRequest, StrategyError> {
        (**self).decide(context)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Rejects non-finite storage requests and non-finite or negative grid limits.
///
/// # Errors
///
/// Returns `StrategyError::InvalidAction` naming the first offending field.
pub fn validate_action(action: &ActionRequest) -> Result<(), StrategyError> {
    if !action.storage_kw.is_finite() {
        return Err(StrategyError::InvalidAction {
            field: "storage_kw",
            value: action.storage_kw,
        });
    }
    let limits = [
        ("grid_import_limit_kw", action.grid.import_kw),
        ("grid_export_limit_kw", action.grid.export_kw),
    ];
    for (field, limit) in limits {
        if let Some(value) = limit.filter(|kw| !(kw.is_finite() && *kw >= 0.0)) {
            return Err(StrategyError::InvalidAction { field, value });
        }
    }
    Ok(())
}

/// Names accepted by [`from_config`].
pub const BUILTIN: &[&str] = &["idle", "pv_first", "price_threshold"];

/// Builds a built-in strategy from configuration.
///
/// `storage_rating_kw` is the request magnitude used by `price_threshold`
/// when no explicit power is configured.
///
/// # Errors
///
/// Returns `StrategyError::Failed` for an unknown strategy kind.
pub fn from_config(
    config: &StrategyConfig,
    storage_rating_kw: f64,
) -> Result<Box<dyn InverterStrategy + Send>, StrategyError> {
    match config.kind.as_str() {
        "idle" => Ok(Box::new(Idle)),
        "pv_first" => Ok(Box::new(PvFirst::with_own_load(config.own_load_kw))),
        "price_threshold" => Ok(Box::new(PriceThreshold::new(
            config.charge_below,
            config.discharge_above,
            config.power_kw.unwrap_or(storage_rating_kw),
        ))),
        other => Err(StrategyError::Failed(format!(
            "unknown strategy \"{other}\"; expected one of {}",
            BUILTIN.join(", ")
        ))),
    }
}
