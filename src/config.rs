//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default relative tolerance for the energy conservation check.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Longest synthetic run accepted (ten years at one-minute steps).
pub const MAX_SYNTHETIC_STEPS: usize = 10 * 366 * 24 * 60;

/// Top-level scenario configuration parsed from TOML.
///
/// `[simulation]`, `[storage]` and `[grid]` carry no defaults: a scenario
/// file that omits one of their fields fails to load. `[source]` and
/// `[strategy]` fall back to the synthetic profile and the PV-first strategy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Timing and numerical parameters.
    pub simulation: SimulationConfig,
    /// Storage device parameters.
    pub storage: StorageConfig,
    /// Grid connection caps.
    pub grid: GridConfig,
    /// Where scenario samples come from.
    #[serde(default)]
    pub source: SourceConfig,
    /// Which built-in strategy drives the storage.
    #[serde(default)]
    pub strategy: StrategyConfig,
}

/// Timing and numerical parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Duration of one timestep in hours (must be > 0).
    pub timestep_hours: f64,
    /// Relative tolerance for the conservation check.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            timestep_hours: 1.0,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// Storage device parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Usable capacity (kWh).
    pub capacity_kwh: f64,
    /// Initial state of charge as a fraction; defaults to `min_soc`.
    #[serde(default)]
    pub initial_soc: Option<f64>,
    /// Lower SOC bound (fraction).
    pub min_soc: f64,
    /// Upper SOC bound (fraction).
    pub max_soc: f64,
    /// Charge efficiency (0, 1].
    pub charge_efficiency: f64,
    /// Discharge efficiency (0, 1].
    pub discharge_efficiency: f64,
    /// Maximum charging power (kW).
    pub max_charge_kw: f64,
    /// Maximum discharging power (kW).
    pub max_discharge_kw: f64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            capacity_kwh: 10.0,
            initial_soc: Some(0.5),
            min_soc: 0.1,
            max_soc: 0.9,
            charge_efficiency: 0.95,
            discharge_efficiency: 0.95,
            max_charge_kw: 5.0,
            max_discharge_kw: 5.0,
        }
    }
}

impl StorageConfig {
    /// Initial stored energy in kWh.
    pub fn initial_soc_kwh(&self) -> f64 {
        self.initial_soc.unwrap_or(self.min_soc) * self.capacity_kwh
    }

    /// Validates every storage field and returns the problems found.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if !(self.capacity_kwh.is_finite() && self.capacity_kwh > 0.0) {
            errors.push(ConfigError::new("storage.capacity_kwh", "must be finite and > 0"));
        }
        if !(0.0..=1.0).contains(&self.min_soc) {
            errors.push(ConfigError::new("storage.min_soc", "must be in [0.0, 1.0]"));
        }
        if !(0.0..=1.0).contains(&self.max_soc) {
            errors.push(ConfigError::new("storage.max_soc", "must be in [0.0, 1.0]"));
        }
        if self.min_soc > self.max_soc {
            errors.push(ConfigError::new(
                "storage.min_soc",
                "must be <= storage.max_soc",
            ));
        }
        if let Some(soc) = self.initial_soc {
            if !(self.min_soc..=self.max_soc).contains(&soc) {
                errors.push(ConfigError::new(
                    "storage.initial_soc",
                    "must be within [storage.min_soc, storage.max_soc]",
                ));
            }
        }
        for (field, eta) in [
            ("storage.charge_efficiency", self.charge_efficiency),
            ("storage.discharge_efficiency", self.discharge_efficiency),
        ] {
            if !(eta > 0.0 && eta <= 1.0) {
                errors.push(ConfigError::new(field, "must be in (0.0, 1.0]"));
            }
        }
        for (field, kw) in [
            ("storage.max_charge_kw", self.max_charge_kw),
            ("storage.max_discharge_kw", self.max_discharge_kw),
        ] {
            if !(kw.is_finite() && kw >= 0.0) {
                errors.push(ConfigError::new(field, "must be finite and >= 0"));
            }
        }

        errors
    }
}

/// Grid connection caps.
///
/// TOML accepts `inf` for an unconstrained connection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GridConfig {
    /// Maximum import power (kW).
    pub import_cap_kw: f64,
    /// Maximum export power (kW, positive magnitude).
    pub export_cap_kw: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            import_cap_kw: 10.0,
            export_cap_kw: 5.0,
        }
    }
}

impl GridConfig {
    /// Validates both caps.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        for (field, cap) in [
            ("grid.import_cap_kw", self.import_cap_kw),
            ("grid.export_cap_kw", self.export_cap_kw),
        ] {
            // NaN fails the comparison as well
            if !(cap >= 0.0) {
                errors.push(ConfigError::new(field, "must be >= 0"));
            }
        }
        errors
    }
}

/// The subset of a scenario the engine itself needs.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Timing and numerical parameters.
    pub simulation: SimulationConfig,
    /// Storage device parameters.
    pub storage: StorageConfig,
    /// Grid connection caps.
    pub grid: GridConfig,
}

impl EngineConfig {
    /// Validates timing, storage and grid parameters.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;
        if !(s.timestep_hours.is_finite() && s.timestep_hours > 0.0) {
            errors.push(ConfigError::new(
                "simulation.timestep_hours",
                "must be finite and > 0",
            ));
        }
        if !(s.tolerance.is_finite() && s.tolerance > 0.0) {
            errors.push(ConfigError::new(
                "simulation.tolerance",
                "must be finite and > 0",
            ));
        }
        errors.extend(self.storage.validate());
        errors.extend(self.grid.validate());
        errors
    }
}

/// Scenario sample source.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Source type: `"synthetic"` or `"csv"`.
    pub kind: String,
    /// CSV file path (required for `"csv"`).
    pub path: Option<PathBuf>,
    /// Number of synthetic steps to generate.
    pub steps: usize,
    /// Synthetic steps per simulated day.
    pub steps_per_day: usize,
    /// Random seed for synthetic noise.
    pub seed: u64,
    /// Peak solar generation (kW).
    pub solar_peak_kw: f64,
    /// Sunrise as a fraction of the day.
    pub sunrise: f64,
    /// Sunset as a fraction of the day.
    pub sunset: f64,
    /// Mean load (kW).
    pub load_base_kw: f64,
    /// Daily load swing amplitude (kW).
    pub load_amp_kw: f64,
    /// Relative noise standard deviation for both profiles.
    pub noise_std: f64,
    /// Off-peak energy price per kWh; `None` disables prices.
    pub offpeak_price: Option<f64>,
    /// Peak energy price per kWh.
    pub peak_price: f64,
    /// Start of the price peak as a fraction of the day.
    pub peak_start: f64,
    /// End of the price peak as a fraction of the day.
    pub peak_end: f64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: "synthetic".to_string(),
            path: None,
            steps: 24,
            steps_per_day: 24,
            seed: 42,
            solar_peak_kw: 5.0,
            sunrise: 0.25,
            sunset: 0.75,
            load_base_kw: 1.2,
            load_amp_kw: 0.6,
            noise_std: 0.05,
            offpeak_price: Some(0.12),
            peak_price: 0.35,
            peak_start: 17.0 / 24.0,
            peak_end: 21.0 / 24.0,
        }
    }
}

/// Built-in strategy selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrategyConfig {
    /// Strategy type: `"idle"`, `"pv_first"`, or `"price_threshold"`.
    pub kind: String,
    /// Price at or below which `price_threshold` charges.
    pub charge_below: f64,
    /// Price at or above which `price_threshold` discharges.
    pub discharge_above: f64,
    /// Power requested by `price_threshold`; defaults to the storage rating.
    pub power_kw: Option<f64>,
    /// Inverter self-consumption `pv_first` keeps covered (kW).
    pub own_load_kw: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            kind: "pv_first".to_string(),
            charge_below: 0.15,
            discharge_above: 0.30,
            power_kw: None,
            own_load_kw: 0.0,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"storage.min_soc"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    /// Creates a config error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Names accepted by `[source] kind`.
pub const SOURCE_KINDS: &[&str] = &["synthetic", "csv"];

/// Names accepted by `[strategy] kind`.
pub const STRATEGY_KINDS: &[&str] = &["idle", "pv_first", "price_threshold"];

impl ScenarioConfig {
    /// Returns the baseline scenario: one house, a 10 kWh battery, one simulated day.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            storage: StorageConfig::default(),
            grid: GridConfig::default(),
            source: SourceConfig::default(),
            strategy: StrategyConfig::default(),
        }
    }

    /// Returns the high-solar preset: oversized PV, tight export cap, two days.
    pub fn high_solar() -> Self {
        Self {
            simulation: SimulationConfig {
                timestep_hours: 0.5,
                ..SimulationConfig::default()
            },
            storage: StorageConfig {
                capacity_kwh: 15.0,
                initial_soc: Some(0.3),
                max_charge_kw: 7.0,
                max_discharge_kw: 7.0,
                ..StorageConfig::default()
            },
            grid: GridConfig {
                import_cap_kw: 10.0,
                export_cap_kw: 2.0,
            },
            source: SourceConfig {
                steps: 96,
                steps_per_day: 48,
                solar_peak_kw: 12.0,
                sunrise: 5.0 / 24.0,
                sunset: 19.0 / 24.0,
                ..SourceConfig::default()
            },
            strategy: StrategyConfig::default(),
        }
    }

    /// Returns the islanded preset: no grid connection at all.
    pub fn islanded() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            storage: StorageConfig {
                capacity_kwh: 20.0,
                initial_soc: Some(0.8),
                min_soc: 0.2,
                max_soc: 1.0,
                ..StorageConfig::default()
            },
            grid: GridConfig {
                import_cap_kw: 0.0,
                export_cap_kw: 0.0,
            },
            source: SourceConfig {
                steps: 72,
                solar_peak_kw: 6.0,
                offpeak_price: None,
                ..SourceConfig::default()
            },
            strategy: StrategyConfig::default(),
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "high_solar", "islanded"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "high_solar" => Ok(Self::high_solar()),
            "islanded" => Ok(Self::islanded()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        let mut cfg = Self::from_toml_str(&content)?;
        // A relative CSV path is relative to the scenario file
        if let (Some(csv), Some(dir)) = (cfg.source.path.as_mut(), path.parent()) {
            if csv.is_relative() {
                *csv = dir.join(&*csv);
            }
        }
        Ok(cfg)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid, misses a required
    /// field, or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// The parameters the engine is built from.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            simulation: self.simulation.clone(),
            storage: self.storage.clone(),
            grid: self.grid.clone(),
        }
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = self.engine_config().validate();

        let src = &self.source;
        if !SOURCE_KINDS.contains(&src.kind.as_str()) {
            errors.push(ConfigError::new(
                "source.kind",
                format!("must be \"synthetic\" or \"csv\", got \"{}\"", src.kind),
            ));
        }
        if src.kind == "csv" && src.path.is_none() {
            errors.push(ConfigError::new("source.path", "required when source.kind = \"csv\""));
        }
        if src.kind == "synthetic" {
            if src.steps > MAX_SYNTHETIC_STEPS {
                errors.push(ConfigError::new(
                    "source.steps",
                    format!("must be <= {MAX_SYNTHETIC_STEPS}"),
                ));
            }
            if src.steps_per_day == 0 {
                errors.push(ConfigError::new("source.steps_per_day", "must be > 0"));
            }
            if !(0.0..=1.0).contains(&src.sunrise) || !(0.0..=1.0).contains(&src.sunset) {
                errors.push(ConfigError::new("source.sunrise", "sunrise and sunset must be in [0.0, 1.0]"));
            } else if src.sunrise >= src.sunset {
                errors.push(ConfigError::new("source.sunrise", "must be < source.sunset"));
            }
            if src.solar_peak_kw < 0.0 || src.load_base_kw < 0.0 || src.noise_std < 0.0 {
                errors.push(ConfigError::new(
                    "source.solar_peak_kw",
                    "solar_peak_kw, load_base_kw and noise_std must be >= 0",
                ));
            }
            if src.peak_start > src.peak_end {
                errors.push(ConfigError::new("source.peak_start", "must be <= source.peak_end"));
            }
        }

        let st = &self.strategy;
        if !STRATEGY_KINDS.contains(&st.kind.as_str()) {
            errors.push(ConfigError::new(
                "strategy.kind",
                format!(
                    "must be one of {}, got \"{}\"",
                    STRATEGY_KINDS.join(", "),
                    st.kind
                ),
            ));
        }
        if st.kind == "price_threshold" && st.charge_below > st.discharge_above {
            errors.push(ConfigError::new(
                "strategy.charge_below",
                "must be <= strategy.discharge_above",
            ));
        }
        if st.power_kw.is_some_and(|kw| !(kw.is_finite() && kw >= 0.0)) {
            errors.push(ConfigError::new("strategy.power_kw", "must be finite and >= 0"));
        }
        if !(st.own_load_kw.is_finite() && st.own_load_kw >= 0.0) {
            errors.push(ConfigError::new("strategy.own_load_kw", "must be finite and >= 0"));
        }

        errors
    }
}
