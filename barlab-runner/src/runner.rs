//! Run-mode dispatch: wires config, data, engine and validation layers.
//!
//! Two entry points:
//! - `execute()`: takes a validated config and a pre-loaded series. No I/O.
//! - `run_from_file()`: loads the TOML config and its CSV, then executes.

use std::path::Path;
use std::sync::atomic::AtomicBool;

use barlab_core::config::ConfigError;
use barlab_core::domain::BarSeries;
use barlab_core::engine::{run_backtest, EngineError, RunResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::{RunConfig, RunMode};
use crate::data_loader::{load_csv, LoadError};
use crate::metrics::PerformanceMetrics;
use crate::permutation::{run_permutation_test, PermutationReport};
use crate::pool::BatchError;
use crate::sweep::{run_sweep, SweepReport};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("load error: {0}")]
    Load(#[from] LoadError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("backtest failed: {0}")]
    Engine(#[from] EngineError),
    #[error("batch failed: {0}")]
    Batch(#[from] BatchError),
    #[error("config has no [data] path")]
    MissingDataPath,
}

/// A single backtest and its summary statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub metrics: PerformanceMetrics,
    pub result: RunResult,
}

/// Output of one invocation, by mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RunOutput {
    Backtest(BacktestReport),
    Optimize(SweepReport),
    Permutation(PermutationReport),
}

/// Execute the configured mode against `series`.
///
/// `cancel` is honored by sweep and permutation batches; a single backtest
/// always runs to completion.
pub fn execute(
    config: &RunConfig,
    series: &BarSeries,
    cancel: Option<&AtomicBool>,
) -> Result<RunOutput, RunError> {
    config.validate()?;
    info!(
        mode = ?config.mode,
        family = ?config.strategy.family,
        bars = series.len(),
        first = %series.first_date(),
        last = %series.last_date(),
        "run starting"
    );

    let output = match config.mode {
        RunMode::Backtest => {
            let result = run_backtest(series, &config.strategy, &config.broker)?;
            let metrics = PerformanceMetrics::compute(&result);
            info!(
                final_equity = metrics.final_equity,
                sharpe = metrics.sharpe,
                trades = metrics.trade_count,
                "backtest finished"
            );
            RunOutput::Backtest(BacktestReport { metrics, result })
        }
        RunMode::Optimize => RunOutput::Optimize(run_sweep(
            series,
            &config.strategy,
            &config.broker,
            &config.sweep.grid(),
            config.sweep_options(),
            cancel,
        )?),
        RunMode::Permutation => RunOutput::Permutation(run_permutation_test(
            series,
            &config.strategy,
            &config.broker,
            config.permutation_options(),
            cancel,
        )?),
    };
    Ok(output)
}

/// Load `config_path` and the CSV it names, then execute.
pub fn run_from_file(
    config_path: &Path,
    cancel: Option<&AtomicBool>,
) -> Result<RunOutput, RunError> {
    let config = RunConfig::from_file(config_path)?;
    let data_path = config.data.path.as_deref().ok_or(RunError::MissingDataPath)?;
    let series = load_csv(data_path)?;
    info!(path = %data_path.display(), bars = series.len(), "bars loaded");
    execute(&config, &series, cancel)
}
