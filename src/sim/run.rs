//! Ordered, append-only record of a simulation run.

use std::ops::Deref;

use serde::Serialize;

use super::types::{RealizedFlow, StepRecord};

/// All steps of one run, oldest first.
///
/// Only the engine appends; everyone else sees it through `&SimulationRun`,
/// which derefs to a slice of [`StepRecord`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SimulationRun {
    steps: Vec<StepRecord>,
}

impl SimulationRun {
    /// Creates an empty run with room for `capacity` steps.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            steps: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, record: StepRecord) {
        self.steps.push(record);
    }

    /// Step records as a slice.
    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    /// Realized flows, oldest first.
    pub fn flows(&self) -> impl Iterator<Item = &RealizedFlow> {
        self.steps.iter().map(|r| &r.flow)
    }

    /// Consumes the run and returns the records.
    pub fn into_steps(self) -> Vec<StepRecord> {
        self.steps
    }
}

impl Deref for SimulationRun {
    type Target = [StepRecord];

    fn deref(&self) -> &[StepRecord] {
        &self.steps
    }
}

impl<'a> IntoIterator for &'a SimulationRun {
    type Item = &'a StepRecord;
    type IntoIter = std::slice::Iter<'a, StepRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}
