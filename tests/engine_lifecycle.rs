//! Engine state machine, failure handling, and cancellation through the public API.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use microgrid_sim::SimError;
use microgrid_sim::runner::DynEngine;
use microgrid_sim::sim::types::ActionRequest;
use microgrid_sim::sim::{EngineState, MetricsSummary, SimulationEngine};
use microgrid_sim::source::{SeriesSource, TimeSeriesSource};
use microgrid_sim::strategy::{DecisionContext, Idle, InverterStrategy, Scripted, StrategyError};

#[test]
fn short_price_column_aborts_with_data_exhaustion() {
    let series = common::flat_series(3.0, 1.0, 5).with_price(vec![0.1, 0.2, 0.3]);
    let config = common::reference_config(0.5, 50.0, 50.0);
    let mut engine = SimulationEngine::new(&config, series, Idle).expect("valid config");

    match engine.run() {
        Err(SimError::DataExhaustion { timestep, signal }) => {
            assert_eq!(timestep, 3);
            assert_eq!(signal, "price");
        }
        other => panic!("expected data exhaustion, got {:?}", other.map(|r| r.len())),
    }
    assert_eq!(engine.state(), EngineState::Aborted);

    // Partial results stay available and consistent
    assert_eq!(engine.history().len(), 3);
    let summary = engine.metrics();
    assert_eq!(summary, MetricsSummary::from_run(engine.history(), 100.0));
    assert_eq!(summary.steps, 3);
}

#[test]
fn exhausted_script_is_a_strategy_error_at_that_step() {
    let config = common::reference_config(0.5, 50.0, 50.0);
    let mut engine = SimulationEngine::new(
        &config,
        common::flat_series(3.0, 1.0, 4),
        Scripted::new(vec![1.0, 1.0]),
    )
    .expect("valid config");

    let err = engine.run().err();
    assert_eq!(err.as_ref().and_then(SimError::timestep), Some(2));
    assert!(matches!(err, Some(SimError::Strategy { .. })));
}

#[test]
fn strategy_error_message_carries_step_and_cause() {
    let failing = |ctx: &DecisionContext<'_>| {
        if ctx.timestep.index == 1 {
            Err(StrategyError::Failed("forecast service unavailable".into()))
        } else {
            Ok(ActionRequest::idle())
        }
    };
    let config = common::reference_config(0.5, 50.0, 50.0);
    let mut engine = SimulationEngine::new(&config, common::flat_series(1.0, 1.0, 3), failing)
        .expect("valid config");

    let message = engine.run().err().map(|e| e.to_string()).unwrap_or_default();
    assert!(message.contains("t=1"), "{message}");
    assert!(message.contains("forecast service unavailable"), "{message}");
}

#[test]
fn negative_grid_limit_is_rejected() {
    let strategy = |_: &DecisionContext<'_>| {
        Ok::<_, StrategyError>(ActionRequest::idle().with_export_limit(-1.0))
    };
    let config = common::reference_config(0.5, 50.0, 50.0);
    let mut engine = SimulationEngine::new(&config, common::flat_series(1.0, 1.0, 2), strategy)
        .expect("valid config");

    assert!(matches!(
        engine.advance(),
        Err(SimError::Strategy {
            timestep: 0,
            source: StrategyError::InvalidAction { .. }
        })
    ));
    assert!(engine.history().is_empty());
}

#[test]
fn stepwise_advance_exposes_each_record() {
    let config = common::reference_config(0.5, 50.0, 50.0);
    let mut engine = SimulationEngine::new(
        &config,
        common::flat_series(20.0, 5.0, 3),
        Scripted::new(vec![10.0, 10.0, 10.0]),
    )
    .expect("valid config");

    let mut socs = Vec::new();
    while let Some(record) = engine.advance().expect("step succeeds") {
        socs.push(record.storage.soc_kwh);
    }
    assert_eq!(socs.len(), 3);
    assert!(common::approx_eq(socs[2], 50.0 + 3.0 * 9.5));
    assert_eq!(engine.state(), EngineState::Completed);
    assert!(matches!(engine.run(), Err(SimError::Finished { .. })));
}

#[test]
fn empty_source_completes_immediately() {
    let config = common::reference_config(0.5, 50.0, 50.0);
    let mut engine =
        SimulationEngine::new(&config, SeriesSource::from_pairs(&[]), Idle).expect("valid config");

    assert!(engine.advance().expect("no error").is_none());
    assert_eq!(engine.state(), EngineState::Completed);
    let m = engine.metrics();
    assert_eq!(m.steps, 0);
    assert_eq!(m.self_sufficiency, None);
    assert_eq!(m.energy_cost, None);
    assert_eq!(m.min_soc_kwh, None);
}

#[test]
fn strategy_can_request_cancellation_of_later_steps() {
    let flag = Arc::new(AtomicBool::new(false));
    let trip = Arc::clone(&flag);
    let strategy = move |ctx: &DecisionContext<'_>| {
        if ctx.timestep.index == 3 {
            trip.store(true, Ordering::Relaxed);
        }
        Ok::<_, StrategyError>(ActionRequest::idle())
    };
    let config = common::reference_config(0.5, 50.0, 50.0);
    let mut engine = SimulationEngine::new(&config, common::flat_series(1.0, 1.0, 10), strategy)
        .expect("valid config")
        .with_cancel_flag(flag);

    assert!(matches!(engine.run(), Err(SimError::Cancelled { timestep: 4 })));
    // The step that raised the flag still completed
    assert_eq!(engine.history().len(), 4);
}

#[test]
fn cancellation_from_another_thread() {
    let flag = Arc::new(AtomicBool::new(false));
    let config = common::reference_config(0.5, 50.0, 50.0);
    let mut engine: DynEngine = SimulationEngine::new(
        &config,
        Box::new(common::flat_series(1.0, 1.0, 100)) as Box<dyn TimeSeriesSource + Send>,
        Box::new(Idle) as Box<dyn InverterStrategy + Send>,
    )
    .expect("valid config")
    .with_cancel_flag(Arc::clone(&flag));

    engine.advance().expect("first step");
    let canceller = thread::spawn(move || flag.store(true, Ordering::Relaxed));
    canceller.join().expect("cancel thread joins");

    assert!(matches!(engine.run(), Err(SimError::Cancelled { timestep: 1 })));
    assert_eq!(engine.state(), EngineState::Aborted);
}

#[test]
fn engine_runs_on_a_worker_thread() {
    let config = common::reference_config(0.5, 50.0, 50.0);
    let engine: DynEngine = SimulationEngine::new(
        &config,
        Box::new(common::random_series(3, 48)) as Box<dyn TimeSeriesSource + Send>,
        Box::new(common::random_strategy(3)) as Box<dyn InverterStrategy + Send>,
    )
    .expect("valid config");

    let handle = thread::spawn(move || {
        let mut engine = engine;
        engine.run().map(|r| r.len()).map_err(|e| e.to_string())
    });
    assert_eq!(handle.join().ok(), Some(Ok(48)));
}

#[test]
fn step_limit_truncates_a_long_source() {
    let config = common::reference_config(0.5, 50.0, 50.0);
    let mut engine = SimulationEngine::new(&config, common::random_series(9, 200), Idle)
        .expect("valid config")
        .with_step_limit(24);

    let run = engine.run().expect("run completes");
    assert_eq!(run.len(), 24);
    assert_eq!(run.last().map(|r| r.timestep.index), Some(23));
}

#[test]
fn invalid_config_lists_every_problem() {
    let mut config = common::reference_config(0.5, 50.0, 50.0);
    config.storage.min_soc = 0.95;
    config.storage.charge_efficiency = 0.0;
    config.grid.import_cap_kw = -5.0;

    match SimulationEngine::new(&config, common::flat_series(1.0, 1.0, 1), Idle) {
        Err(SimError::Configuration(errors)) => {
            let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
            assert!(fields.contains(&"storage.min_soc"), "{fields:?}");
            assert!(fields.contains(&"storage.charge_efficiency"), "{fields:?}");
            assert!(fields.contains(&"grid.import_cap_kw"), "{fields:?}");
        }
        Err(other) => panic!("expected configuration error, got {other}"),
        Ok(_) => panic!("expected configuration error"),
    }
}
