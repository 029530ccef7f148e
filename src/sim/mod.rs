/// Simulation clock for timestep management.
pub mod clock;
pub mod engine;
pub mod metrics;
/// Single-bus energy balance.
pub mod power_balance;
pub mod run;
/// Storage device physics.
pub mod storage;
pub mod types;

pub use engine::{EngineState, SimulationEngine};
pub use metrics::{MetricsCollector, MetricsSummary};
pub use power_balance::EnergyBalanceResolver;
pub use run::SimulationRun;
pub use storage::{StorageModel, StorageOutcome};
