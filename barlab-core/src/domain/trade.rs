//! TradeRecord: a completed round-trip trade.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::position::PositionSide;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    Fade,
    Timeout,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StopLoss => "stop_loss",
            Self::TakeProfit => "take_profit",
            Self::Fade => "fade",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A complete round-trip trade record: entry → exit.
///
/// Created by the broker on exit and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub side: PositionSide,

    // ── Entry ──
    pub entry_bar: usize,
    pub entry_date: NaiveDate,
    /// Weighted average over the tier-1 fill and any add-on fills.
    pub entry_price: f64,

    // ── Exit ──
    pub exit_bar: usize,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    // ── Size ──
    pub quantity: u64,

    // ── PnL ──
    /// (exit - entry) * quantity * sign(side).
    pub gross_pnl: f64,
    /// Commission paid on every fill of the round trip.
    pub commission: f64,
    pub net_pnl: f64,

    pub bars_held: usize,
}

impl TradeRecord {
    /// Return on the trade as a fraction of entry notional.
    pub fn return_pct(&self) -> f64 {
        if self.entry_price == 0.0 || self.quantity == 0 {
            return 0.0;
        }
        self.net_pnl / (self.entry_price * self.quantity as f64)
    }

    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0.0
    }
}
