use super::{DecisionContext, InverterStrategy, StrategyError};
use crate::sim::types::ActionRequest;

/// Replays a recorded sequence of storage setpoints, one per step.
///
/// Indexed by timestep, so a script shorter than the run fails the run
/// instead of silently repeating.
#[derive(Debug, Clone, Default)]
pub struct Scripted {
    setpoints_kw: Vec<f64>,
}

impl Scripted {
    /// Creates a strategy replaying `setpoints_kw` (positive=charge).
    pub fn new(setpoints_kw: Vec<f64>) -> Self {
        Self { setpoints_kw }
    }

    /// Number of recorded setpoints.
    pub fn len(&self) -> usize {
        self.setpoints_kw.len()
    }

    /// Whether the script is empty.
    pub fn is_empty(&self) -> bool {
        self.setpoints_kw.is_empty()
    }
}

impl InverterStrategy for Scripted {
    fn decide(&mut self, context: &DecisionContext<'_>) -> Result<ActionRequest, StrategyError> {
        let t = context.timestep.index;
        self.setpoints_kw
            .get(t)
            .map(|&kw| ActionRequest::storage(kw))
            .ok_or_else(|| {
                StrategyError::Failed(format!(
                    "script has {} setpoints, no entry for t={t}",
                    self.setpoints_kw.len()
                ))
            })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
