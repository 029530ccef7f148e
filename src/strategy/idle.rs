use super::{DecisionContext, InverterStrategy, StrategyError};
use crate::sim::types::ActionRequest;

/// Leaves the storage idle every step; the grid absorbs the whole net load.
///
/// Useful as a no-storage baseline when comparing strategies.
#[derive(Debug, Default, Clone, Copy)]
pub struct Idle;

impl InverterStrategy for Idle {
    fn decide(&mut self, _context: &DecisionContext<'_>) -> Result<ActionRequest, StrategyError> {
        Ok(ActionRequest::idle())
    }

    fn name(&self) -> &str {
        "idle"
    }
}
