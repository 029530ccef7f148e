//! CSV scenario input.
//!
//! Expected header: `generation_kw,load_kw[,price][,ambient]`. Optional
//! columns may be omitted entirely; once a row carries a value for one, every
//! later row must too.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use super::{SourceError, TimeSeriesSource};
use crate::sim::types::ScenarioSample;

#[derive(Debug, Deserialize)]
struct CsvRow {
    generation_kw: f64,
    load_kw: f64,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    ambient: Option<f64>,
}

/// Streams samples from CSV, one row per timestep.
pub struct CsvSource<R: Read> {
    rows: csv::DeserializeRecordsIntoIter<R, CsvRow>,
    has_price: bool,
    has_ambient: bool,
}

impl CsvSource<File> {
    /// Opens a CSV file.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::Csv` if the file cannot be opened.
    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;
        Ok(Self::wrap(reader))
    }
}

impl<R: Read> CsvSource<R> {
    /// Reads CSV from any reader.
    pub fn from_reader(reader: R) -> Self {
        Self::wrap(
            csv::ReaderBuilder::new()
                .trim(csv::Trim::All)
                .from_reader(reader),
        )
    }

    fn wrap(reader: csv::Reader<R>) -> Self {
        Self {
            rows: reader.into_deserialize(),
            has_price: false,
            has_ambient: false,
        }
    }
}

impl<R: Read> TimeSeriesSource for CsvSource<R> {
    fn next_sample(&mut self) -> Option<Result<ScenarioSample, SourceError>> {
        let row = match self.rows.next()? {
            Ok(row) => row,
            Err(e) => return Some(Err(e.into())),
        };

        if self.has_price && row.price.is_none() {
            return Some(Err(SourceError::Exhausted {
                signal: "price".to_string(),
            }));
        }
        if self.has_ambient && row.ambient.is_none() {
            return Some(Err(SourceError::Exhausted {
                signal: "ambient".to_string(),
            }));
        }
        self.has_price |= row.price.is_some();
        self.has_ambient |= row.ambient.is_some();

        Some(Ok(ScenarioSample {
            generation_kw: row.generation_kw,
            load_kw: row.load_kw,
            price: row.price,
            ambient: row.ambient,
        }))
    }
}
