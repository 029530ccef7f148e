use super::{SourceError, TimeSeriesSource};
use crate::sim::types::ScenarioSample;

/// In-memory scenario built from equal-length generation and load columns.
///
/// Price and ambient columns are optional. When present they must cover the
/// whole primary series; a shorter auxiliary column yields
/// `SourceError::Exhausted` at the first step it cannot serve.
///
/// # Examples
///
/// ```
/// use microgrid_sim::source::{SeriesSource, TimeSeriesSource};
///
/// let mut src = SeriesSource::new(vec![2.0, 0.0], vec![1.0, 1.5])
///     .expect("equal lengths")
///     .with_price(vec![0.10, 0.30]);
///
/// let first = src.next_sample().and_then(Result::ok).expect("sample");
/// assert_eq!(first.price, Some(0.10));
/// ```
#[derive(Debug, Clone)]
pub struct SeriesSource {
    generation_kw: Vec<f64>,
    load_kw: Vec<f64>,
    price: Option<Vec<f64>>,
    ambient: Option<Vec<f64>>,
    cursor: usize,
}

impl SeriesSource {
    /// Creates a source from the primary columns.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::Invalid` if the columns differ in length.
    pub fn new(generation_kw: Vec<f64>, load_kw: Vec<f64>) -> Result<Self, SourceError> {
        if generation_kw.len() != load_kw.len() {
            return Err(SourceError::Invalid(format!(
                "generation has {} samples but load has {}",
                generation_kw.len(),
                load_kw.len()
            )));
        }
        Ok(Self {
            generation_kw,
            load_kw,
            price: None,
            ambient: None,
            cursor: 0,
        })
    }

    /// Builds a source from `(generation_kw, load_kw)` pairs.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Self {
        Self {
            generation_kw: pairs.iter().map(|p| p.0).collect(),
            load_kw: pairs.iter().map(|p| p.1).collect(),
            price: None,
            ambient: None,
            cursor: 0,
        }
    }

    /// Attaches a price column.
    pub fn with_price(mut self, price: Vec<f64>) -> Self {
        self.price = Some(price);
        self
    }

    /// Attaches an ambient column.
    pub fn with_ambient(mut self, ambient: Vec<f64>) -> Self {
        self.ambient = Some(ambient);
        self
    }

    /// Length of the primary series.
    pub fn len(&self) -> usize {
        self.generation_kw.len()
    }

    /// Whether the primary series is empty.
    pub fn is_empty(&self) -> bool {
        self.generation_kw.is_empty()
    }
}

fn auxiliary(
    column: Option<&Vec<f64>>,
    index: usize,
    signal: &str,
) -> Result<Option<f64>, SourceError> {
    match column {
        None => Ok(None),
        Some(values) => values
            .get(index)
            .copied()
            .map(Some)
            .ok_or_else(|| SourceError::Exhausted {
                signal: signal.to_string(),
            }),
    }
}

impl TimeSeriesSource for SeriesSource {
    fn next_sample(&mut self) -> Option<Result<ScenarioSample, SourceError>> {
        let i = self.cursor;
        let generation_kw = *self.generation_kw.get(i)?;
        let load_kw = *self.load_kw.get(i)?;
        self.cursor += 1;

        let sample = auxiliary(self.price.as_ref(), i, "price").and_then(|price| {
            let ambient = auxiliary(self.ambient.as_ref(), i, "ambient")?;
            Ok(ScenarioSample {
                generation_kw,
                load_kw,
                price,
                ambient,
            })
        });
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len().saturating_sub(self.cursor);
        (remaining, Some(remaining))
    }
}
