//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use microgrid_sim::config::{EngineConfig, GridConfig, SimulationConfig, StorageConfig};
use microgrid_sim::sim::types::{ActionRequest, RealizedFlow, StepRecord};
use microgrid_sim::source::SeriesSource;
use microgrid_sim::strategy::{DecisionContext, StrategyError};

/// Reference storage: 100 kWh, 10-90% window, 95% efficiency, 20 kW both ways.
pub fn reference_storage(initial_soc: f64) -> StorageConfig {
    StorageConfig {
        capacity_kwh: 100.0,
        initial_soc: Some(initial_soc),
        min_soc: 0.1,
        max_soc: 0.9,
        charge_efficiency: 0.95,
        discharge_efficiency: 0.95,
        max_charge_kw: 20.0,
        max_discharge_kw: 20.0,
    }
}

/// Hourly engine config around [`reference_storage`] with the given grid caps.
pub fn reference_config(initial_soc: f64, import_cap_kw: f64, export_cap_kw: f64) -> EngineConfig {
    EngineConfig {
        simulation: SimulationConfig {
            timestep_hours: 1.0,
            tolerance: 1e-9,
        },
        storage: reference_storage(initial_soc),
        grid: GridConfig {
            import_cap_kw,
            export_cap_kw,
        },
    }
}

/// Constant generation and load for `steps` steps.
pub fn flat_series(generation_kw: f64, load_kw: f64, steps: usize) -> SeriesSource {
    SeriesSource::from_pairs(&vec![(generation_kw, load_kw); steps])
}

/// Random generation, load and price columns.
pub fn random_series(seed: u64, steps: usize) -> SeriesSource {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut generation = Vec::with_capacity(steps);
    let mut load = Vec::with_capacity(steps);
    let mut price = Vec::with_capacity(steps);
    for _ in 0..steps {
        // Occasional dead-calm and zero-load steps
        generation.push(if rng.random_bool(0.2) {
            0.0
        } else {
            rng.random_range(0.0..30.0)
        });
        load.push(if rng.random_bool(0.05) {
            0.0
        } else {
            rng.random_range(0.0..25.0)
        });
        price.push(rng.random_range(0.05..0.50));
    }
    SeriesSource::new(generation, load)
        .map(|s| s.with_price(price))
        .unwrap_or_else(|e| panic!("columns have equal length: {e}"))
}

fn random_cap(rng: &mut StdRng) -> f64 {
    match rng.random_range(0..4) {
        0 => 0.0,
        1 => f64::INFINITY,
        _ => rng.random_range(1.0..60.0),
    }
}

/// Random but valid engine parameters, covering islanded and unconstrained grids.
pub fn random_engine_config(seed: u64) -> EngineConfig {
    let mut rng = StdRng::seed_from_u64(seed.wrapping_mul(31).wrapping_add(7));
    let min_soc = rng.random_range(0.0..0.3);
    let max_soc = rng.random_range(0.7..=1.0);
    let initial_soc = rng.random_range(min_soc..=max_soc);
    let timestep_hours = [0.25, 0.5, 1.0][rng.random_range(0..3)];

    EngineConfig {
        simulation: SimulationConfig {
            timestep_hours,
            tolerance: 1e-9,
        },
        storage: StorageConfig {
            capacity_kwh: rng.random_range(5.0..200.0),
            initial_soc: Some(initial_soc),
            min_soc,
            max_soc,
            charge_efficiency: rng.random_range(0.8..=1.0),
            discharge_efficiency: rng.random_range(0.8..=1.0),
            max_charge_kw: rng.random_range(0.0..50.0),
            max_discharge_kw: rng.random_range(0.0..50.0),
        },
        grid: GridConfig {
            import_cap_kw: random_cap(&mut rng),
            export_cap_kw: random_cap(&mut rng),
        },
    }
}

/// Strategy issuing random, often infeasible requests and occasional grid limits.
pub fn random_strategy(
    seed: u64,
) -> impl FnMut(&DecisionContext<'_>) -> Result<ActionRequest, StrategyError> + Send {
    let mut rng = StdRng::seed_from_u64(seed ^ 0x5eed);
    move |_ctx: &DecisionContext<'_>| {
        let kw = match rng.random_range(0..10) {
            0 => 1000.0,
            1 => -1000.0,
            2 => 0.0,
            _ => rng.random_range(-40.0..40.0),
        };
        let mut action = ActionRequest::storage(kw);
        if rng.random_bool(0.2) {
            action = action.with_import_limit(rng.random_range(0.0..20.0));
        }
        if rng.random_bool(0.2) {
            action = action.with_export_limit(rng.random_range(0.0..20.0));
        }
        Ok(action)
    }
}

/// Asserts conservation and sign constraints for one flow.
pub fn assert_balanced(flow: &RealizedFlow, tolerance: f64) {
    let limit = tolerance * flow.scale_kw();
    assert!(
        flow.imbalance_kw().abs() <= limit,
        "imbalance {:e} exceeds {:e}: {flow:?}",
        flow.imbalance_kw(),
        limit
    );
    for (name, v) in [
        ("grid_import_kw", flow.grid_import_kw),
        ("grid_export_kw", flow.grid_export_kw),
        ("curtailment_kw", flow.curtailment_kw),
        ("unmet_load_kw", flow.unmet_load_kw),
    ] {
        assert!(v >= 0.0, "{name} must be >= 0, got {v}");
    }
    assert!(
        flow.grid_import_kw == 0.0 || flow.grid_export_kw == 0.0,
        "simultaneous import and export: {flow:?}"
    );
    assert!(flow.unmet_load_kw <= flow.load_kw, "unmet exceeds load: {flow:?}");
}

/// Asserts the post-step SOC lies inside the configured window.
pub fn assert_within_soc_bounds(record: &StepRecord) {
    let s = &record.storage;
    assert!(
        s.soc_kwh >= s.min_soc_kwh() && s.soc_kwh <= s.max_soc_kwh(),
        "t={}: soc {} outside [{}, {}]",
        record.timestep.index,
        s.soc_kwh,
        s.min_soc_kwh(),
        s.max_soc_kwh()
    );
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}
