//! BarLab Runner: metrics, parameter sweeps, permutation tests, run dispatch.
//!
//! This crate builds on `barlab-core` to provide:
//! - Performance metrics over equity curves and trade logs
//! - Grid parameter sweep with ranked result tables
//! - Return-permutation significance testing with reproducible seeding
//! - Bounded worker pools with cooperative cancellation
//! - TOML run configuration and CSV bar loading
//!
//! Logging goes through `tracing`; installing a subscriber is up to the caller.

pub mod config;
pub mod data_loader;
pub mod fitness;
pub mod metrics;
pub mod permutation;
pub mod pool;
pub mod runner;
pub mod sweep;

pub use config::{RunConfig, RunMode};
pub use data_loader::{load_csv, read_bars, LoadError};
pub use fitness::RankMetric;
pub use metrics::PerformanceMetrics;
pub use permutation::{
    p_value, permute_series, run_permutation_test, PermutationOptions, PermutationReport,
    PermutationRun,
};
pub use pool::{build_pool, BatchError};
pub use runner::{execute, run_from_file, BacktestReport, RunError, RunOutput};
pub use sweep::{
    rank_entries, run_sweep, ParamAxis, ParamGrid, ParamSet, SweepEntry, SweepOptions,
    SweepReport,
};
