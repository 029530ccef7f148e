//! Discrete-time microgrid simulator.
//!
//! A [`sim::SimulationEngine`] steps a [`source::TimeSeriesSource`] through a
//! pluggable [`strategy::InverterStrategy`], applies storage physics and a
//! single-bus energy balance, and records every step for later analysis.

pub mod cli;
pub mod config;
pub mod error;
pub mod io;
pub mod runner;
/// Simulation engine, storage, energy balance, and metrics.
pub mod sim;
pub mod source;
pub mod strategy;
pub mod telemetry;

pub use error::{SimError, SimResult};
