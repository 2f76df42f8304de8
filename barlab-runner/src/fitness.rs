//! Rank metric: which statistic a sweep sorts by.

use crate::metrics::PerformanceMetrics;
use serde::{Deserialize, Serialize};

/// Which metric to rank sweep results by. Higher is always better.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankMetric {
    #[default]
    FinalEquity,
    Sharpe,
    TotalReturn,
    WinRate,
}

impl RankMetric {
    pub fn extract(&self, metrics: &PerformanceMetrics) -> f64 {
        match self {
            Self::FinalEquity => metrics.final_equity,
            Self::Sharpe => metrics.sharpe,
            Self::TotalReturn => metrics.total_return,
            Self::WinRate => metrics.win_rate,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FinalEquity => "final_equity",
            Self::Sharpe => "sharpe",
            Self::TotalReturn => "total_return",
            Self::WinRate => "win_rate",
        }
    }
}

impl std::fmt::Display for RankMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
