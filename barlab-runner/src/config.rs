//! Run configuration, loaded from TOML.
//!
//! ```toml
//! mode = "optimize"          # backtest | optimize | permutation
//! workers = 0                # 0 = all cores
//!
//! [data]
//! path = "qqq.csv"           # relative to the config file
//!
//! [strategy]
//! family = "support_resistance"
//! time_exit = 30
//!
//! [broker]
//! initial_cash = 100000.0
//! commission_rate = 0.001
//!
//! [sweep]
//! metric = "final_equity"
//! [[sweep.axes]]
//! name = "time_exit"
//! values = [20, 30, 40]
//!
//! [permutation]
//! count = 200
//! seed = 42
//! ```
//!
//! Every section is optional. Strategy fields not given in the file come from
//! the preset of the selected `family`, not from the trend preset.

use std::path::{Path, PathBuf};

use barlab_core::config::{BrokerSettings, ConfigError, RuleFamilyKind, StrategyConfig};
use serde::{Deserialize, Serialize};

use crate::data_loader::LoadError;
use crate::fitness::RankMetric;
use crate::permutation::PermutationOptions;
use crate::sweep::{ParamAxis, ParamGrid, SweepOptions};

/// What a run does with the strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[default]
    Backtest,
    Optimize,
    Permutation,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    /// CSV file with `date,open,high,low,close,volume` rows.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepSection {
    pub metric: RankMetric,
    pub axes: Vec<ParamAxis>,
}

impl SweepSection {
    pub fn grid(&self) -> ParamGrid {
        ParamGrid {
            axes: self.axes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermutationSection {
    pub count: usize,
    pub seed: Option<u64>,
}

impl Default for PermutationSection {
    fn default() -> Self {
        Self {
            count: 200,
            seed: None,
        }
    }
}

/// Complete configuration surface for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub mode: RunMode,
    /// Worker threads for sweep and permutation batches; 0 = all cores.
    pub workers: usize,
    pub data: DataSection,
    pub strategy: StrategyConfig,
    pub broker: BrokerSettings,
    pub sweep: SweepSection,
    pub permutation: PermutationSection,
}

impl RunConfig {
    /// Load and validate a config file. A relative `data.path` is resolved
    /// against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        if let (Some(data_path), Some(base)) = (config.data.path.as_mut(), path.parent()) {
            if data_path.is_relative() {
                *data_path = base.join(&*data_path);
            }
        }
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, LoadError> {
        let mut table: toml::Table = toml::from_str(content)?;
        let strategy: toml::Table = match table.remove("strategy") {
            Some(value) => value.try_into()?,
            None => toml::Table::new(),
        };

        let mut config: RunConfig = toml::Value::Table(table).try_into()?;
        config.strategy = strategy_from_table(strategy)?;
        config.validate()?;
        Ok(config)
    }

    /// Check everything the selected mode needs, before any run starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.strategy.validate()?;
        self.broker.validate()?;
        match self.mode {
            RunMode::Backtest => {}
            RunMode::Optimize => {
                self.sweep.grid().build_configs(&self.strategy)?;
            }
            RunMode::Permutation => {
                if self.permutation.count == 0 {
                    return Err(ConfigError::ZeroPermutations);
                }
            }
        }
        Ok(())
    }

    pub fn sweep_options(&self) -> SweepOptions {
        SweepOptions {
            metric: self.sweep.metric,
            workers: self.workers,
        }
    }

    pub fn permutation_options(&self) -> PermutationOptions {
        PermutationOptions {
            count: self.permutation.count,
            seed: self.permutation.seed,
            workers: self.workers,
        }
    }
}

/// Overlay the user's `[strategy]` keys on the preset of the chosen family.
fn strategy_from_table(overrides: toml::Table) -> Result<StrategyConfig, LoadError> {
    let family: RuleFamilyKind = match overrides.get("family") {
        Some(value) => value.clone().try_into()?,
        None => RuleFamilyKind::TrendMomentum,
    };
    let mut merged = match toml::Value::try_from(StrategyConfig::for_family(family))? {
        toml::Value::Table(t) => t,
        _ => toml::Table::new(),
    };
    merged.extend(overrides);
    Ok(toml::Value::Table(merged).try_into()?)
}
