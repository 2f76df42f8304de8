//! Run artifacts.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Position, PositionSide, TradeRecord};

/// Where a run came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunOrigin {
    Backtest,
    Sweep { index: usize },
    Permutation { index: usize },
}

/// One post-bar equity observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquitySample {
    pub date: NaiveDate,
    pub cash: f64,
    pub side: PositionSide,
    pub quantity: u64,
    /// cash + signed quantity * close
    pub equity: f64,
}

/// Result of a complete simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub origin: RunOrigin,
    /// Equity at the last bar close (marks any open position to market).
    pub final_equity: f64,
    pub initial_cash: f64,
    /// One sample per bar, date-aligned with the input series.
    pub equity_curve: Vec<EquitySample>,
    /// Completed round-trip trades, in exit order.
    pub trades: Vec<TradeRecord>,
    /// Position still open after the last bar, if any.
    pub open_position: Option<Position>,
    pub commission_paid: f64,
    pub bar_count: usize,
}

impl RunResult {
    pub fn equity_values(&self) -> Vec<f64> {
        self.equity_curve.iter().map(|s| s.equity).collect()
    }

    pub fn total_return(&self) -> f64 {
        if self.initial_cash == 0.0 {
            return 0.0;
        }
        self.final_equity / self.initial_cash - 1.0
    }

    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }
}
