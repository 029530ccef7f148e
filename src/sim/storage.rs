//! Storage device physics: power limits, SOC window, and efficiency losses.

use crate::config::StorageConfig;
use crate::error::SimError;
use crate::sim::types::StorageState;

/// Result of applying a power request to the storage device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StorageOutcome {
    /// Power actually realized at the terminals (kW; positive=charge, negative=discharge).
    pub realized_kw: f64,
    /// Stored energy after the step (kWh).
    pub soc_kwh: f64,
}

/// A stationary storage device that owns its state of charge.
///
/// `StorageModel` enforces charge/discharge power ratings, keeps the SOC inside
/// `[min_soc, max_soc] * capacity`, and applies efficiency losses:
///
/// - charging `p` kW for `dt` hours stores `p * dt * charge_efficiency` kWh;
/// - discharging `p` kW for `dt` hours draws `p * dt / discharge_efficiency` kWh.
///
/// When both the power rating and the SOC window bind, the smaller magnitude
/// wins and the SOC is written exactly at the bound.
///
/// # Power Flow Convention
/// - Positive power: Charging (absorbs energy from the bus)
/// - Negative power: Discharging (supplies energy to the bus)
#[derive(Debug, Clone)]
pub struct StorageModel {
    state: StorageState,
}

impl StorageModel {
    /// Creates a storage model from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Configuration` listing every invalid field.
    pub fn new(config: &StorageConfig) -> Result<Self, SimError> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(SimError::Configuration(errors));
        }

        Ok(Self {
            state: StorageState {
                soc_kwh: config.initial_soc_kwh(),
                capacity_kwh: config.capacity_kwh,
                min_soc: config.min_soc,
                max_soc: config.max_soc,
                charge_efficiency: config.charge_efficiency,
                discharge_efficiency: config.discharge_efficiency,
                max_charge_kw: config.max_charge_kw,
                max_discharge_kw: config.max_discharge_kw,
            },
        })
    }

    /// Returns a copy of the current state.
    pub fn state(&self) -> StorageState {
        self.state
    }

    /// Stored energy (kWh).
    pub fn soc_kwh(&self) -> f64 {
        self.state.soc_kwh
    }

    /// Usable capacity (kWh).
    pub fn capacity_kwh(&self) -> f64 {
        self.state.capacity_kwh
    }

    /// Applies a power request for one interval and updates the SOC.
    ///
    /// Clipping to the power rating or SOC window is routine and never an
    /// error. The caller is responsible for passing a finite request and a
    /// positive duration.
    ///
    /// # Arguments
    ///
    /// * `requested_kw` - Requested power (kW; positive=charge, negative=discharge)
    /// * `duration_hours` - Interval length in hours (> 0)
    pub fn apply(&mut self, requested_kw: f64, duration_hours: f64) -> StorageOutcome {
        let s = &self.state;

        // Enforce kW ratings
        let cmd_kw = requested_kw.clamp(-s.max_discharge_kw, s.max_charge_kw);

        let (realized_kw, soc_kwh) = if cmd_kw > 0.0 {
            // Charging: limit by headroom below max_soc
            let headroom_kwh = s.headroom_kwh();
            let max_kw_soc = headroom_kwh / (s.charge_efficiency * duration_hours);
            if cmd_kw >= max_kw_soc {
                (max_kw_soc, s.max_soc_kwh().max(s.soc_kwh))
            } else {
                let stored_kwh = cmd_kw * duration_hours * s.charge_efficiency;
                (cmd_kw, (s.soc_kwh + stored_kwh).min(s.max_soc_kwh()))
            }
        } else if cmd_kw < 0.0 {
            // Discharging: limit by energy above min_soc
            let available_kwh = s.available_kwh();
            let max_kw_soc = available_kwh * s.discharge_efficiency / duration_hours;
            let cmd_abs = -cmd_kw;
            if cmd_abs >= max_kw_soc {
                (-max_kw_soc, s.min_soc_kwh().min(s.soc_kwh))
            } else {
                let drawn_kwh = cmd_abs * duration_hours / s.discharge_efficiency;
                (cmd_kw, (s.soc_kwh - drawn_kwh).max(s.min_soc_kwh()))
            }
        } else {
            (0.0, s.soc_kwh)
        };

        self.state.soc_kwh = soc_kwh;
        StorageOutcome {
            realized_kw,
            soc_kwh,
        }
    }
}
