//! Scenario sources: where generation, load, and price samples come from.

pub mod csv;
pub mod profile;
pub mod series;
pub mod synthetic;

pub use self::csv::CsvSource;
pub use series::SeriesSource;
pub use synthetic::SyntheticSource;

use thiserror::Error;

use crate::config::SourceConfig;
use crate::sim::types::ScenarioSample;

/// Failure while producing a scenario sample.
#[derive(Debug, Error)]
pub enum SourceError {
    /// An auxiliary signal ended before the primary series.
    #[error("{signal} signal exhausted")]
    Exhausted { signal: String },

    /// A sample or the source definition is malformed.
    #[error("invalid sample: {0}")]
    Invalid(String),

    /// Reading or parsing CSV input failed.
    #[error("csv error: {0}")]
    Csv(#[from] ::csv::Error),
}

/// Forward-only supplier of one [`ScenarioSample`] per timestep.
///
/// `None` marks the normal end of the scenario. Re-running a scenario
/// requires constructing a fresh source.
pub trait TimeSeriesSource {
    /// Produces the next sample, or `None` when the primary series is done.
    fn next_sample(&mut self) -> Option<Result<ScenarioSample, SourceError>>;

    /// Bounds on the remaining number of samples, like `Iterator::size_hint`.
    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, None)
    }
}

impl TimeSeriesSource for Box<dyn TimeSeriesSource + Send> {
    fn next_sample(&mut self) -> Option<Result<ScenarioSample, SourceError>> {
        (**self).next_sample()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (**self).size_hint()
    }
}

/// Builds the configured source.
///
/// # Errors
///
/// Returns `SourceError::Invalid` for an unknown kind or a CSV source without a
/// path, and `SourceError::Csv` if the CSV file cannot be opened.
pub fn from_config(config: &SourceConfig) -> Result<Box<dyn TimeSeriesSource + Send>, SourceError> {
    match config.kind.as_str() {
        "synthetic" => Ok(Box::new(SyntheticSource::new(config))),
        "csv" => {
            let path = config.path.as_deref().ok_or_else(|| {
                SourceError::Invalid("source.path is required for csv sources".to_string())
            })?;
            Ok(Box::new(CsvSource::from_path(path)?))
        }
        other => Err(SourceError::Invalid(format!("unknown source kind \"{other}\""))),
    }
}
