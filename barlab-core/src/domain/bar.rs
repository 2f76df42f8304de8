//! Bar: the fundamental market data unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV bar for a single trading day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Why a single bar failed validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("{date}: non-finite or non-positive price in OHLC")]
    InvalidPrice { date: NaiveDate },
    #[error("{date}: high {high} is below open, close or low")]
    HighTooLow { date: NaiveDate, high: f64 },
    #[error("{date}: low {low} is above open, close or high")]
    LowTooHigh { date: NaiveDate, low: f64 },
}

impl Bar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// A bar whose four prices all equal `price`.
    ///
    /// Used for synthetic price paths, where intrabar range is unknown.
    pub fn flat(date: NaiveDate, price: f64, volume: u64) -> Self {
        Self::new(date, price, price, price, price, volume)
    }

    /// Check the OHLC invariants.
    ///
    /// high >= max(open, close, low), low <= min(open, close, high), and every
    /// price finite and strictly positive.
    pub fn validate(&self) -> Result<(), BarError> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Err(BarError::InvalidPrice { date: self.date });
        }
        if self.high < self.open || self.high < self.close || self.high < self.low {
            return Err(BarError::HighTooLow {
                date: self.date,
                high: self.high,
            });
        }
        if self.low > self.open || self.low > self.close {
            return Err(BarError::LowTooHigh {
                date: self.date,
                low: self.low,
            });
        }
        Ok(())
    }

    pub fn is_sane(&self) -> bool {
        self.validate().is_ok()
    }
}
