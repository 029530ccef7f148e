use super::{DecisionContext, InverterStrategy, StrategyError};
use crate::sim::types::ActionRequest;

/// Price-arbitrage strategy.
///
/// Charges at `power_kw` when the price is at or below `charge_below`,
/// discharges at `power_kw` when it is at or above `discharge_above`, and
/// otherwise falls back to covering the local deficit from storage.
/// Steps without a price are treated as the middle band.
#[derive(Debug, Clone, Copy)]
pub struct PriceThreshold {
    pub charge_below: f64,
    pub discharge_above: f64,
    pub power_kw: f64,
}

impl PriceThreshold {
    /// Creates the strategy.
    ///
    /// # Arguments
    ///
    /// * `charge_below` - Price at or below which to charge
    /// * `discharge_above` - Price at or above which to discharge
    /// * `power_kw` - Request magnitude for both directions
    pub fn new(charge_below: f64, discharge_above: f64, power_kw: f64) -> Self {
        Self {
            charge_below,
            discharge_above,
            power_kw: power_kw.abs(),
        }
    }
}

impl InverterStrategy for PriceThreshold {
    fn decide(&mut self, context: &DecisionContext<'_>) -> Result<ActionRequest, StrategyError> {
        let action = match context.sample.price {
            Some(price) if price <= self.charge_below => ActionRequest::charge(self.power_kw),
            Some(price) if price >= self.discharge_above => {
                ActionRequest::discharge(self.power_kw)
            }
            _ => {
                let deficit_kw = (-context.sample.net_kw()).max(0.0);
                ActionRequest::discharge(deficit_kw.min(self.power_kw))
            }
        };
        Ok(action)
    }

    fn name(&self) -> &str {
        "price_threshold"
    }
}
