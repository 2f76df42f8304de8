//! Simulation engine: broker accounting and the bar loop.

pub mod broker;
pub mod result;
pub mod runner;

pub use broker::{Broker, SimulationError};
pub use result::{EquitySample, RunOrigin, RunResult};
pub use runner::{run_backtest, EngineError, Simulation};
