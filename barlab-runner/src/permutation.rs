//! Return-permutation significance test.
//!
//! The observed strategy result is compared against runs on synthetic price
//! paths built from a shuffled copy of the series' own close-to-close returns.
//! Shuffling keeps the return distribution and destroys its ordering, so a
//! strategy with real timing edge should beat most permuted paths.
//!
//! Every permutation draws from its own RNG, derived from the master seed and
//! the permutation index, so the distribution does not depend on worker count
//! or scheduling.

use std::sync::atomic::AtomicBool;

use barlab_core::config::{BrokerSettings, ConfigError, StrategyConfig};
use barlab_core::domain::{Bar, BarSeries, DataError};
use barlab_core::engine::{RunOrigin, Simulation};
use barlab_core::rng::{RngHierarchy, PERMUTATION_STREAM};
use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::pool::{build_pool, is_cancelled, BatchError};

/// Build one synthetic path from a uniform shuffle of the series' returns.
///
/// `P'_0 = P_0` and `P'_t = P'_{t-1} * (1 + r'_t)`. Every bar is flat
/// (open = high = low = close). Bar `t` keeps the original date and volume of
/// bar `t`, so volume stays aligned with the return that ends on it.
pub fn permute_series<R: Rng + ?Sized>(
    series: &BarSeries,
    rng: &mut R,
) -> Result<BarSeries, DataError> {
    let mut returns = series.simple_returns();
    returns.shuffle(rng);

    let anchor = &series[0];
    let mut price = anchor.close;
    let mut bars = Vec::with_capacity(series.len());
    bars.push(Bar::flat(anchor.date, price, anchor.volume));
    for (offset, r) in returns.into_iter().enumerate() {
        let original = &series[offset + 1];
        price *= 1.0 + r;
        bars.push(Bar::flat(original.date, price, original.volume));
    }
    BarSeries::new(bars)
}

/// One-sided empirical p-value: share of permutations at or above `observed`.
///
/// A failed permutation (`None`) counts toward the total but never as at or
/// above `observed`. `None` for an empty slice.
pub fn p_value(observed: f64, distribution: &[Option<f64>]) -> Option<f64> {
    if distribution.is_empty() {
        return None;
    }
    let at_least = distribution
        .iter()
        .filter(|v| v.is_some_and(|v| v >= observed))
        .count();
    Some(at_least as f64 / distribution.len() as f64)
}

/// Options for a permutation batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermutationOptions {
    pub count: usize,
    /// Master seed; a random one is drawn (and reported) when absent.
    pub seed: Option<u64>,
    /// Worker threads; 0 = all cores.
    pub workers: usize,
}

impl Default for PermutationOptions {
    fn default() -> Self {
        Self {
            count: 200,
            seed: None,
            workers: 0,
        }
    }
}

/// Why a single permutation produced no value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PermutationFailure {
    #[error("synthetic series rejected: {0}")]
    Data(#[from] DataError),
    #[error("simulation failed: {0}")]
    Simulation(#[from] barlab_core::engine::SimulationError),
}

/// One permutation's outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermutationRun {
    pub index: usize,
    /// Final equity on the synthetic path; `None` if the run failed.
    pub final_equity: Option<f64>,
    pub error: Option<String>,
}

impl PermutationRun {
    pub fn is_success(&self) -> bool {
        self.final_equity.is_some()
    }
}

/// Result of a permutation test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermutationReport {
    /// Final equity of the strategy on the real series.
    pub observed: f64,
    /// One row per permutation that ran, in index order, failures included.
    pub distribution: Vec<PermutationRun>,
    /// Over every permutation that ran; failures count as below `observed`.
    pub p_value: Option<f64>,
    pub seed_used: u64,
    pub requested: usize,
    pub failed: usize,
    pub cancelled: bool,
}

impl PermutationReport {
    /// Final equities of the successful permutations, in index order.
    pub fn successful_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.distribution.iter().filter_map(|run| run.final_equity)
    }
}

/// Run the observed backtest, then `options.count` permuted backtests.
///
/// Configuration errors and a failing observed run abort the test. A failing
/// permutation stays in the distribution with its error and counts toward the
/// p-value denominator.
pub fn run_permutation_test(
    series: &BarSeries,
    config: &StrategyConfig,
    settings: &BrokerSettings,
    options: PermutationOptions,
    cancel: Option<&AtomicBool>,
) -> Result<PermutationReport, BatchError> {
    if options.count == 0 {
        return Err(ConfigError::ZeroPermutations.into());
    }
    let sim = Simulation::new(config.clone(), *settings)?;
    let rng = match options.seed {
        Some(seed) => RngHierarchy::new(seed),
        None => RngHierarchy::from_entropy(),
    };

    info!(
        permutations = options.count,
        seed = rng.master_seed(),
        bars = series.len(),
        "starting permutation test"
    );

    let observed = sim.run(series, RunOrigin::Backtest)?.final_equity;
    debug!(observed, "observed run complete");

    let pool = build_pool(options.workers)?;
    let outcomes: Vec<Option<Result<f64, PermutationFailure>>> = pool.install(|| {
        (0..options.count)
            .into_par_iter()
            .map(|index| {
                if is_cancelled(cancel) {
                    return None;
                }
                Some(run_permutation(series, &sim, &rng, index))
            })
            .collect()
    });

    let cancelled = outcomes.iter().any(Option::is_none);
    let mut distribution = Vec::with_capacity(outcomes.len());
    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Some(Ok(value)) => distribution.push(PermutationRun {
                index,
                final_equity: Some(value),
                error: None,
            }),
            Some(Err(e)) => {
                warn!(index, error = %e, "permutation run failed");
                distribution.push(PermutationRun {
                    index,
                    final_equity: None,
                    error: Some(e.to_string()),
                });
            }
            None => {}
        }
    }
    let failed = distribution.iter().filter(|run| !run.is_success()).count();
    let values: Vec<Option<f64>> = distribution.iter().map(|run| run.final_equity).collect();
    let p = p_value(observed, &values);

    if cancelled {
        info!(completed = distribution.len(), "permutation test cancelled");
    }
    info!(observed, p_value = ?p, failed, "permutation test finished");

    Ok(PermutationReport {
        observed,
        distribution,
        p_value: p,
        seed_used: rng.master_seed(),
        requested: options.count,
        failed,
        cancelled,
    })
}

fn run_permutation(
    series: &BarSeries,
    sim: &Simulation,
    rng: &RngHierarchy,
    index: usize,
) -> Result<f64, PermutationFailure> {
    let mut shuffle_rng = rng.rng_for(PERMUTATION_STREAM, index as u64);
    let synthetic = permute_series(series, &mut shuffle_rng)?;
    let result = sim.run(&synthetic, RunOrigin::Permutation { index })?;
    debug!(index, final_equity = result.final_equity, "permutation run complete");
    Ok(result.final_equity)
}
