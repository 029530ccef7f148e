//! Error taxonomy for simulation runs.
//!
//! Routine physical infeasibility (clipping, curtailment, unmet load) is never
//! an error; it is recorded in the run. Everything here aborts the current run
//! and only that run.

use thiserror::Error;

use crate::config::ConfigError;
use crate::sim::engine::EngineState;
use crate::source::SourceError;
use crate::strategy::StrategyError;

/// Fatal error for a single simulation run.
#[derive(Debug, Error)]
pub enum SimError {
    /// Invalid or missing storage/grid parameters, detected before the run starts.
    #[error("invalid configuration: {}", join_config_errors(.0))]
    Configuration(Vec<ConfigError>),

    /// The strategy failed or issued an unusable action.
    #[error("strategy failed at t={timestep}: {source}")]
    Strategy {
        timestep: usize,
        #[source]
        source: StrategyError,
    },

    /// An auxiliary signal ran out before the primary series did.
    #[error("{signal} signal exhausted at t={timestep} before the primary series")]
    DataExhaustion {
        timestep: usize,
        signal: String,
    },

    /// The source produced a malformed sample or failed to read one.
    #[error("scenario source failed at t={timestep}: {source}")]
    Source {
        timestep: usize,
        #[source]
        source: SourceError,
    },

    /// Energy accounting no longer balances; indicates an internal bug.
    #[error(
        "energy conservation violated at t={timestep}: imbalance {imbalance_kw:e} kW exceeds {tolerance_kw:e} kW"
    )]
    InvariantViolation {
        timestep: usize,
        imbalance_kw: f64,
        tolerance_kw: f64,
    },

    /// The run was cancelled between steps.
    #[error("run cancelled before t={timestep}")]
    Cancelled { timestep: usize },

    /// The engine already reached a terminal state.
    #[error("engine is {state:?}; a new engine is required to run again")]
    Finished { state: EngineState },
}

impl SimError {
    /// Wraps a source error, lifting auxiliary exhaustion into its own variant.
    pub(crate) fn from_source(timestep: usize, source: SourceError) -> Self {
        match source {
            SourceError::Exhausted { signal } => Self::DataExhaustion { timestep, signal },
            other => Self::Source {
                timestep,
                source: other,
            },
        }
    }

    /// Stamps the step index on errors raised outside the engine loop.
    pub(crate) fn at_timestep(self, t: usize) -> Self {
        match self {
            Self::InvariantViolation {
                imbalance_kw,
                tolerance_kw,
                ..
            } => Self::InvariantViolation {
                timestep: t,
                imbalance_kw,
                tolerance_kw,
            },
            other => other,
        }
    }

    /// Timestep at which the run failed, if the error is tied to one.
    pub fn timestep(&self) -> Option<usize> {
        match self {
            Self::Strategy { timestep, .. }
            | Self::DataExhaustion { timestep, .. }
            | Self::Source { timestep, .. }
            | Self::InvariantViolation { timestep, .. }
            | Self::Cancelled { timestep } => Some(*timestep),
            Self::Configuration(_) | Self::Finished { .. } => None,
        }
    }
}

fn join_config_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience alias used throughout the crate.
pub type SimResult<T> = Result<T, SimError>;
