//! BarLab Core: bar series, causal indicators, strategy state machine, broker
//! and the bar-by-bar simulation loop.
//!
//! This crate contains the deterministic heart of the backtester:
//! - Domain types (bars, validated series, positions, trade records)
//! - Indicator engine with precomputed, look-ahead-free series
//! - Strategy engine over three rule families with explicit tier state
//! - Broker accounting with commission and invariant checks
//! - Simulation runner producing equity curves and trade logs
//! - Deterministic RNG hierarchy for parallel resampling
//!
//! No I/O happens here; callers hand in a [`domain::BarSeries`].

pub mod config;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod rng;
pub mod strategy;

pub use config::{BrokerSettings, ConfigError, DateWindow, RuleFamilyKind, StrategyConfig, TradingMode};
pub use domain::{Bar, BarSeries, DataError, ExitReason, Position, PositionSide, TradeRecord};
pub use engine::{run_backtest, EngineError, RunOrigin, RunResult, Simulation, SimulationError};
