use super::{DecisionContext, InverterStrategy, StrategyError};
use crate::sim::types::ActionRequest;

/// Self-consumption strategy.
///
/// Surplus generation charges the storage; a deficit is covered by
/// discharging. The grid only sees what the storage cannot absorb or supply.
/// Requests are left unclipped; the storage model enforces its own limits.
#[derive(Debug, Default, Clone, Copy)]
pub struct PvFirst {
    /// Constant inverter self-consumption added to the load (kW).
    pub own_load_kw: f64,
}

impl PvFirst {
    /// Creates the strategy with the given inverter self-consumption.
    pub fn with_own_load(own_load_kw: f64) -> Self {
        Self {
            own_load_kw: own_load_kw.max(0.0),
        }
    }
}

impl InverterStrategy for PvFirst {
    fn decide(&mut self, context: &DecisionContext<'_>) -> Result<ActionRequest, StrategyError> {
        let surplus_kw = context.sample.net_kw() - self.own_load_kw;
        let storage = &context.storage;

        let action = if surplus_kw >= 0.0 {
            if storage.soc_kwh >= storage.max_soc_kwh() {
                ActionRequest::idle()
            } else {
                ActionRequest::charge(surplus_kw)
            }
        } else if storage.soc_kwh > storage.min_soc_kwh() {
            ActionRequest::discharge(surplus_kw)
        } else {
            ActionRequest::idle()
        };
        Ok(action)
    }

    fn name(&self) -> &str {
        "pv_first"
    }
}
