//! Grid parameter sweep.
//!
//! A template `StrategyConfig` plus candidate values for named fields expands
//! into the full cartesian product. Every combination is validated before any
//! run starts; runs then execute in parallel on the same `BarSeries` and are
//! ranked by the selected metric, descending, ties kept in grid order.

use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::AtomicBool;

use barlab_core::config::{BrokerSettings, ConfigError, StrategyConfig};
use barlab_core::domain::BarSeries;
use barlab_core::engine::{RunOrigin, Simulation};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::fitness::RankMetric;
use crate::metrics::PerformanceMetrics;
use crate::pool::{build_pool, is_cancelled, BatchError};

/// One swept field and its candidate values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamAxis {
    pub name: String,
    pub values: Vec<f64>,
}

/// Ordered set of axes. The first axis varies slowest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    #[serde(default)]
    pub axes: Vec<ParamAxis>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_axis(mut self, name: impl Into<String>, values: impl Into<Vec<f64>>) -> Self {
        self.axes.push(ParamAxis {
            name: name.into(),
            values: values.into(),
        });
        self
    }

    /// Number of combinations in the full product.
    pub fn size(&self) -> usize {
        if self.axes.is_empty() {
            return 0;
        }
        self.axes.iter().map(|a| a.values.len()).product()
    }

    /// Reject an empty grid or an axis with no candidates.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.axes.is_empty() {
            return Err(ConfigError::EmptyGrid);
        }
        if let Some(axis) = self.axes.iter().find(|a| a.values.is_empty()) {
            return Err(ConfigError::EmptyCandidates(axis.name.clone()));
        }
        Ok(())
    }

    /// All combinations, odometer order (last axis varies fastest).
    pub fn combinations(&self) -> Vec<ParamSet> {
        let mut out = vec![ParamSet::default()];
        for axis in &self.axes {
            out = out
                .into_iter()
                .flat_map(|prefix| {
                    axis.values.iter().map(move |&v| {
                        let mut next = prefix.clone();
                        next.values.push((axis.name.clone(), v));
                        next
                    })
                })
                .collect();
        }
        if self.axes.is_empty() {
            out.clear();
        }
        out
    }

    /// Apply every combination to a clone of `template` and validate it.
    ///
    /// The template itself is never modified. Any invalid combination fails
    /// the whole grid.
    pub fn build_configs(
        &self,
        template: &StrategyConfig,
    ) -> Result<Vec<(ParamSet, StrategyConfig)>, ConfigError> {
        self.validate()?;
        self.combinations()
            .into_iter()
            .map(|params| {
                let config = params.apply_to(template)?;
                Ok((params, config))
            })
            .collect()
    }
}

/// Concrete (name, value) assignments for one grid point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamSet {
    pub values: Vec<(String, f64)>,
}

impl ParamSet {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    pub fn apply_to(&self, template: &StrategyConfig) -> Result<StrategyConfig, ConfigError> {
        let mut config = template.clone();
        for (name, value) in &self.values {
            config.apply_param(name, *value)?;
        }
        config.validate()?;
        Ok(config)
    }
}

impl fmt::Display for ParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

/// One row of the sweep table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEntry {
    /// Position of the combination in grid order.
    pub index: usize,
    pub params: ParamSet,
    /// `None` when the run failed; see `error`.
    pub metrics: Option<PerformanceMetrics>,
    pub error: Option<String>,
}

impl SweepEntry {
    pub fn is_success(&self) -> bool {
        self.metrics.is_some()
    }

    pub fn score(&self, metric: RankMetric) -> Option<f64> {
        self.metrics.as_ref().map(|m| metric.extract(m))
    }
}

/// Sort entries by `metric`, best first.
///
/// The sort is stable, so equal scores keep their incoming order. Failed runs
/// go after every successful one.
pub fn rank_entries(entries: &mut [SweepEntry], metric: RankMetric) {
    entries.sort_by(|a, b| match (a.score(metric), b.score(metric)) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Options for a sweep batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOptions {
    pub metric: RankMetric,
    /// Worker threads; 0 = all cores.
    pub workers: usize,
}

/// Ranked sweep results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub metric: RankMetric,
    /// Ranked table; only combinations that actually ran.
    pub entries: Vec<SweepEntry>,
    pub total_combinations: usize,
    pub failed: usize,
    pub cancelled: bool,
}

impl SweepReport {
    pub fn best(&self) -> Option<&SweepEntry> {
        self.entries.first().filter(|e| e.is_success())
    }
}

/// Run every grid combination against `series` and rank the results.
///
/// Configuration errors abort before any run. A run that fails at simulation
/// time is kept in the table as failed and the batch continues. When `cancel`
/// is raised, combinations not yet started are skipped and the finished ones
/// are returned with `cancelled` set.
pub fn run_sweep(
    series: &BarSeries,
    template: &StrategyConfig,
    settings: &BrokerSettings,
    grid: &ParamGrid,
    options: SweepOptions,
    cancel: Option<&AtomicBool>,
) -> Result<SweepReport, BatchError> {
    settings.validate()?;
    let configs = grid.build_configs(template)?;
    let simulations = configs
        .into_iter()
        .map(|(params, config)| Ok((params, Simulation::new(config, *settings)?)))
        .collect::<Result<Vec<_>, ConfigError>>()?;
    let total = simulations.len();

    info!(
        combinations = total,
        bars = series.len(),
        metric = %options.metric,
        "starting parameter sweep"
    );

    let pool = build_pool(options.workers)?;
    let rows: Vec<Option<SweepEntry>> = pool.install(|| {
        simulations
            .par_iter()
            .enumerate()
            .map(|(index, (params, sim))| {
                if is_cancelled(cancel) {
                    return None;
                }
                Some(run_one(series, index, params, sim))
            })
            .collect()
    });

    let cancelled = rows.iter().any(Option::is_none);
    let mut entries: Vec<SweepEntry> = rows.into_iter().flatten().collect();
    let failed = entries.iter().filter(|e| !e.is_success()).count();
    rank_entries(&mut entries, options.metric);

    if cancelled {
        info!(completed = entries.len(), total, "parameter sweep cancelled");
    }
    info!(completed = entries.len(), failed, "parameter sweep finished");

    Ok(SweepReport {
        metric: options.metric,
        entries,
        total_combinations: total,
        failed,
        cancelled,
    })
}

fn run_one(series: &BarSeries, index: usize, params: &ParamSet, sim: &Simulation) -> SweepEntry {
    match sim.run(series, RunOrigin::Sweep { index }) {
        Ok(result) => {
            let metrics = PerformanceMetrics::compute(&result);
            debug!(
                index,
                params = %params,
                final_equity = metrics.final_equity,
                sharpe = metrics.sharpe,
                trades = metrics.trade_count,
                "sweep run complete"
            );
            SweepEntry {
                index,
                params: params.clone(),
                metrics: Some(metrics),
                error: None,
            }
        }
        Err(e) => {
            warn!(index, params = %params, error = %e, "sweep run failed");
            SweepEntry {
                index,
                params: params.clone(),
                metrics: None,
                error: Some(e.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(index: usize, final_equity: Option<f64>) -> SweepEntry {
        SweepEntry {
            index,
            params: ParamSet {
                values: vec![("time_exit".into(), index as f64)],
            },
            metrics: final_equity.map(|fe| PerformanceMetrics {
                final_equity: fe,
                total_return: fe / 100_000.0 - 1.0,
                sharpe: 0.0,
                max_drawdown: 0.0,
                trade_count: 1,
                win_rate: 0.0,
            }),
            error: final_equity.is_none().then(|| "boom".to_string()),
        }
    }

    #[test]
    fn higher_final_equity_ranks_first() {
        let mut entries = vec![entry(0, Some(98_000.0)), entry(1, Some(105_000.0))];
        rank_entries(&mut entries, RankMetric::FinalEquity);
        assert_eq!(entries[0].index, 1);
        assert_eq!(entries[1].index, 0);
    }

    #[test]
    fn ties_keep_grid_order_and_failures_sink() {
        let mut entries = vec![
            entry(0, None),
            entry(1, Some(100_000.0)),
            entry(2, Some(120_000.0)),
            entry(3, Some(100_000.0)),
        ];
        rank_entries(&mut entries, RankMetric::FinalEquity);
        let order: Vec<usize> = entries.iter().map(|e| e.index).collect();
        assert_eq!(order, vec![2, 1, 3, 0]);
    }

    #[test]
    fn cartesian_product_in_odometer_order() {
        let grid = ParamGrid::new()
            .with_axis("sma_trend", [10.0, 20.0])
            .with_axis("time_exit", [3.0, 5.0, 7.0]);
        assert_eq!(grid.size(), 6);
        let combos = grid.combinations();
        assert_eq!(combos.len(), 6);
        assert_eq!(combos[0].to_string(), "sma_trend=10, time_exit=3");
        assert_eq!(combos[1].to_string(), "sma_trend=10, time_exit=5");
        assert_eq!(combos[5].to_string(), "sma_trend=20, time_exit=7");
    }

    #[test]
    fn empty_grid_and_empty_axis_rejected() {
        assert_eq!(ParamGrid::new().validate(), Err(ConfigError::EmptyGrid));
        let grid = ParamGrid::new()
            .with_axis("sma_trend", [10.0])
            .with_axis("rsi_period", Vec::<f64>::new());
        assert_eq!(
            grid.validate(),
            Err(ConfigError::EmptyCandidates("rsi_period".into()))
        );
        assert!(ParamGrid::new().combinations().is_empty());
    }

    #[test]
    fn build_configs_leaves_template_untouched() {
        let template = StrategyConfig::trend_momentum();
        let before = template.clone();
        let grid = ParamGrid::new().with_axis("sma_trend", [15.0, 25.0]);
        let configs = grid.build_configs(&template).unwrap();
        assert_eq!(template, before);
        assert_eq!(configs[0].1.sma_trend, 15);
        assert_eq!(configs[1].1.sma_trend, 25);
    }

    #[test]
    fn invalid_combination_fails_whole_grid() {
        let template = StrategyConfig::trend_momentum();
        let grid = ParamGrid::new().with_axis("sma_trend", [10.0, 0.0]);
        assert!(matches!(
            grid.build_configs(&template),
            Err(ConfigError::NonPositivePeriod { .. })
        ));

        let unknown = ParamGrid::new().with_axis("nope", [1.0]);
        assert_eq!(
            unknown.build_configs(&template),
            Err(ConfigError::UnknownParameter("nope".into()))
        );
    }
}
