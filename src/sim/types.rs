//! Core simulation types: timesteps, samples, storage snapshots, actions, and flows.

use std::fmt;

use serde::Serialize;

/// One position on the simulation timeline.
///
/// The duration converts power (kW) into energy (kWh) for the interval.
///
/// # Examples
///
/// ```
/// use microgrid_sim::sim::types::Timestep;
///
/// let t = Timestep::new(3, 0.25);
/// assert_eq!(t.index, 3);
/// assert_eq!(t.energy_kwh(8.0), 2.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Timestep {
    /// Ordinal index, starting at 0.
    pub index: usize,
    /// Interval length in hours (> 0).
    pub duration_hours: f64,
}

impl Timestep {
    /// Creates a timestep.
    pub fn new(index: usize, duration_hours: f64) -> Self {
        Self {
            index,
            duration_hours,
        }
    }

    /// Energy delivered by `power_kw` held for the whole interval.
    pub fn energy_kwh(&self, power_kw: f64) -> f64 {
        power_kw * self.duration_hours
    }

    /// Simulation time at the start of this step, in hours.
    pub fn start_hours(&self) -> f64 {
        self.index as f64 * self.duration_hours
    }
}

/// Immutable per-timestep scenario input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScenarioSample {
    /// Renewable generation available at the bus (kW, >= 0).
    pub generation_kw: f64,
    /// Demand at the bus (kW, >= 0).
    pub load_kw: f64,
    /// Energy price for this interval (currency per kWh).
    pub price: Option<f64>,
    /// Auxiliary ambient signal (e.g. temperature), passed through untouched.
    pub ambient: Option<f64>,
}

impl ScenarioSample {
    /// Creates a sample without price or ambient signals.
    pub fn new(generation_kw: f64, load_kw: f64) -> Self {
        Self {
            generation_kw,
            load_kw,
            price: None,
            ambient: None,
        }
    }

    /// Attaches a price signal.
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    /// Attaches an ambient signal.
    pub fn with_ambient(mut self, ambient: f64) -> Self {
        self.ambient = Some(ambient);
        self
    }

    /// Generation minus load, before any storage or grid action.
    pub fn net_kw(&self) -> f64 {
        self.generation_kw - self.load_kw
    }

    /// Returns a description of the first invalid field, if any.
    pub fn validate(&self) -> Option<String> {
        if !self.generation_kw.is_finite() || self.generation_kw < 0.0 {
            return Some(format!(
                "generation_kw must be finite and >= 0, got {}",
                self.generation_kw
            ));
        }
        if !self.load_kw.is_finite() || self.load_kw < 0.0 {
            return Some(format!(
                "load_kw must be finite and >= 0, got {}",
                self.load_kw
            ));
        }
        if let Some(price) = self.price.filter(|p| !p.is_finite()) {
            return Some(format!("price must be finite, got {price}"));
        }
        if let Some(ambient) = self.ambient.filter(|a| !a.is_finite()) {
            return Some(format!("ambient must be finite, got {ambient}"));
        }
        None
    }
}

/// Snapshot of the storage device.
///
/// # Power Flow Convention
/// - Positive power: charging (storage absorbs energy from the bus)
/// - Negative power: discharging (storage supplies energy to the bus)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StorageState {
    /// Stored energy (kWh).
    pub soc_kwh: f64,
    /// Usable capacity (kWh), constant for the run.
    pub capacity_kwh: f64,
    /// Lower SOC bound as a fraction of capacity.
    pub min_soc: f64,
    /// Upper SOC bound as a fraction of capacity.
    pub max_soc: f64,
    /// Fraction of terminal charging energy that ends up stored.
    pub charge_efficiency: f64,
    /// Fraction of drawn energy that reaches the terminals when discharging.
    pub discharge_efficiency: f64,
    /// Maximum charging power (kW, positive magnitude).
    pub max_charge_kw: f64,
    /// Maximum discharging power (kW, positive magnitude).
    pub max_discharge_kw: f64,
}

impl StorageState {
    /// Lowest permitted stored energy (kWh).
    pub fn min_soc_kwh(&self) -> f64 {
        self.min_soc * self.capacity_kwh
    }

    /// Highest permitted stored energy (kWh).
    pub fn max_soc_kwh(&self) -> f64 {
        self.max_soc * self.capacity_kwh
    }

    /// State of charge as a fraction of capacity.
    pub fn soc_fraction(&self) -> f64 {
        self.soc_kwh / self.capacity_kwh
    }

    /// Energy that can still be stored before hitting `max_soc` (kWh).
    pub fn headroom_kwh(&self) -> f64 {
        (self.max_soc_kwh() - self.soc_kwh).max(0.0)
    }

    /// Energy that can still be drawn before hitting `min_soc` (kWh).
    pub fn available_kwh(&self) -> f64 {
        (self.soc_kwh - self.min_soc_kwh()).max(0.0)
    }
}

/// Per-step grid limits a strategy may impose on top of the configured caps.
///
/// Limits can only tighten the caps; a value above the configured cap has no effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GridLimits {
    /// Import limit for this step (kW, >= 0).
    pub import_kw: Option<f64>,
    /// Export limit for this step (kW, >= 0).
    pub export_kw: Option<f64>,
}

/// Output of a strategy: the requested storage power and optional grid limits.
///
/// Requests are intent, not truth. They may be physically infeasible; the
/// engine clips them against storage and grid constraints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ActionRequest {
    /// Requested storage power (kW; positive=charge, negative=discharge).
    pub storage_kw: f64,
    /// Optional per-step grid limits.
    pub grid: GridLimits,
}

impl ActionRequest {
    /// Request that leaves the storage idle.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Request a signed storage power.
    pub fn storage(storage_kw: f64) -> Self {
        Self {
            storage_kw,
            grid: GridLimits::default(),
        }
    }

    /// Request charging at `kw` (magnitude).
    pub fn charge(kw: f64) -> Self {
        Self::storage(kw.abs())
    }

    /// Request discharging at `kw` (magnitude).
    pub fn discharge(kw: f64) -> Self {
        Self::storage(-kw.abs())
    }

    /// Caps grid import for this step.
    pub fn with_import_limit(mut self, kw: f64) -> Self {
        self.grid.import_kw = Some(kw);
        self
    }

    /// Caps grid export for this step.
    pub fn with_export_limit(mut self, kw: f64) -> Self {
        self.grid.export_kw = Some(kw);
        self
    }
}

/// Realized power flows at the bus for one step.
///
/// Conservation holds within tolerance:
/// `generation + import + discharge == (load - unmet) + charge + export + curtailment`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RealizedFlow {
    /// Generation available (kW).
    pub generation_kw: f64,
    /// Demand (kW).
    pub load_kw: f64,
    /// Realized storage power (kW; positive=charge, negative=discharge).
    pub storage_kw: f64,
    /// Power imported from the grid (kW, >= 0).
    pub grid_import_kw: f64,
    /// Power exported to the grid (kW, >= 0).
    pub grid_export_kw: f64,
    /// Generation that could not be used, stored, or exported (kW, >= 0).
    pub curtailment_kw: f64,
    /// Demand that could not be served (kW, >= 0).
    pub unmet_load_kw: f64,
}

impl RealizedFlow {
    /// Charging power (kW, >= 0).
    pub fn storage_charge_kw(&self) -> f64 {
        self.storage_kw.max(0.0)
    }

    /// Discharging power (kW, >= 0).
    pub fn storage_discharge_kw(&self) -> f64 {
        (-self.storage_kw).max(0.0)
    }

    /// Load actually served (kW).
    pub fn served_load_kw(&self) -> f64 {
        self.load_kw - self.unmet_load_kw
    }

    /// Supply minus consumption; zero for a balanced flow.
    pub fn imbalance_kw(&self) -> f64 {
        let supply = self.generation_kw + self.grid_import_kw + self.storage_discharge_kw();
        let demand = self.served_load_kw()
            + self.storage_charge_kw()
            + self.grid_export_kw
            + self.curtailment_kw;
        supply - demand
    }

    /// Magnitude the conservation tolerance is scaled by.
    pub fn scale_kw(&self) -> f64 {
        (self.generation_kw + self.load_kw + self.storage_kw.abs()).max(1.0)
    }

    /// Net grid exchange (kW; positive=import, negative=export).
    pub fn net_grid_kw(&self) -> f64 {
        self.grid_import_kw - self.grid_export_kw
    }
}

/// Complete record of one simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepRecord {
    /// Position on the timeline.
    pub timestep: Timestep,
    /// Scenario input consumed by this step.
    pub sample: ScenarioSample,
    /// Strategy request, as issued.
    pub action: ActionRequest,
    /// Realized flows after clipping.
    pub flow: RealizedFlow,
    /// Storage state after the step.
    pub storage: StorageState,
}

impl fmt::Display for StepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>4} ({:>6.2}h) | gen={:>7.2} load={:>7.2} | req={:>7.2} bat={:>7.2} kW \
             (SoC={:>5.1}%) | imp={:>6.2} exp={:>6.2} curt={:>6.2} unmet={:>6.2}",
            self.timestep.index,
            self.timestep.start_hours(),
            self.flow.generation_kw,
            self.flow.load_kw,
            self.action.storage_kw,
            self.flow.storage_kw,
            self.storage.soc_fraction() * 100.0,
            self.flow.grid_import_kw,
            self.flow.grid_export_kw,
            self.flow.curtailment_kw,
            self.flow.unmet_load_kw,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow() -> RealizedFlow {
        RealizedFlow {
            generation_kw: 20.0,
            load_kw: 5.0,
            storage_kw: 10.0,
            grid_import_kw: 0.0,
            grid_export_kw: 5.0,
            curtailment_kw: 0.0,
            unmet_load_kw: 0.0,
        }
    }

    #[test]
    fn timestep_energy_and_start() {
        let t = Timestep::new(4, 0.5);
        assert_eq!(t.energy_kwh(3.0), 1.5);
        assert_eq!(t.start_hours(), 2.0);
    }

    #[test]
    fn sample_validation_rejects_negative_load() {
        let s = ScenarioSample::new(1.0, -2.0);
        assert!(s.validate().is_some());
    }

    #[test]
    fn sample_validation_rejects_nan_price() {
        let s = ScenarioSample::new(1.0, 2.0).with_price(f64::NAN);
        assert!(s.validate().is_some());
        assert!(ScenarioSample::new(1.0, 2.0).with_price(0.3).validate().is_none());
    }

    #[test]
    fn action_helpers_sign() {
        assert_eq!(ActionRequest::charge(-3.0).storage_kw, 3.0);
        assert_eq!(ActionRequest::discharge(3.0).storage_kw, -3.0);
        assert_eq!(ActionRequest::idle().storage_kw, 0.0);
    }

    #[test]
    fn balanced_flow_has_zero_imbalance() {
        assert_eq!(flow().imbalance_kw(), 0.0);
    }

    #[test]
    fn unmet_load_counts_against_served_load() {
        let f = RealizedFlow {
            generation_kw: 0.0,
            load_kw: 10.0,
            storage_kw: 0.0,
            grid_import_kw: 4.0,
            grid_export_kw: 0.0,
            curtailment_kw: 0.0,
            unmet_load_kw: 6.0,
        };
        assert_eq!(f.served_load_kw(), 4.0);
        assert_eq!(f.imbalance_kw(), 0.0);
    }

    #[test]
    fn storage_state_bounds() {
        let s = StorageState {
            soc_kwh: 50.0,
            capacity_kwh: 100.0,
            min_soc: 0.1,
            max_soc: 0.9,
            charge_efficiency: 0.95,
            discharge_efficiency: 0.95,
            max_charge_kw: 20.0,
            max_discharge_kw: 20.0,
        };
        assert_eq!(s.headroom_kwh(), 40.0);
        assert_eq!(s.available_kwh(), 40.0);
        assert_eq!(s.soc_fraction(), 0.5);
    }

    #[test]
    fn step_record_display_does_not_panic() {
        let storage = StorageState {
            soc_kwh: 59.5,
            capacity_kwh: 100.0,
            min_soc: 0.1,
            max_soc: 0.9,
            charge_efficiency: 0.95,
            discharge_efficiency: 0.95,
            max_charge_kw: 20.0,
            max_discharge_kw: 20.0,
        };
        let r = StepRecord {
            timestep: Timestep::new(0, 1.0),
            sample: ScenarioSample::new(20.0, 5.0),
            action: ActionRequest::charge(10.0),
            flow: flow(),
            storage,
        };
        let s = format!("{r}");
        assert!(s.contains("SoC= 59.5%"));
    }
}
