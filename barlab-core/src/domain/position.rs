//! Position: the single open position of a run, or flat.

use serde::{Deserialize, Serialize};

/// Direction of exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSide {
    Flat,
    Long,
    Short,
}

impl PositionSide {
    /// +1 for long, -1 for short, 0 when flat.
    pub fn sign(self) -> f64 {
        match self {
            Self::Flat => 0.0,
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }
}

/// Open position state. Mutated only by the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: PositionSide,
    /// Unsigned share count; direction lives in `side`.
    pub quantity: u64,
    /// Quantity-weighted average entry price across all fills of this position.
    pub entry_price: f64,
    /// Bar index of the primary (tier-1) entry.
    pub entry_bar: usize,
}

impl Default for Position {
    fn default() -> Self {
        Self::flat()
    }
}

impl Position {
    pub fn flat() -> Self {
        Self {
            side: PositionSide::Flat,
            quantity: 0,
            entry_price: 0.0,
            entry_bar: 0,
        }
    }

    pub fn new_long(quantity: u64, entry_price: f64, entry_bar: usize) -> Self {
        Self {
            side: PositionSide::Long,
            quantity,
            entry_price,
            entry_bar,
        }
    }

    pub fn new_short(quantity: u64, entry_price: f64, entry_bar: usize) -> Self {
        Self {
            side: PositionSide::Short,
            quantity,
            entry_price,
            entry_bar,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.side == PositionSide::Flat
    }

    pub fn is_long(&self) -> bool {
        self.side == PositionSide::Long
    }

    pub fn is_short(&self) -> bool {
        self.side == PositionSide::Short
    }

    /// Signed quantity: positive long, negative short.
    pub fn signed_quantity(&self) -> f64 {
        self.side.sign() * self.quantity as f64
    }

    /// Signed market value at `price` (negative for shorts).
    pub fn market_value(&self, price: f64) -> f64 {
        self.signed_quantity() * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.signed_quantity() * (price - self.entry_price)
    }

    pub fn bars_held(&self, bar_index: usize) -> usize {
        bar_index.saturating_sub(self.entry_bar)
    }
}
