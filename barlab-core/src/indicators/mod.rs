//! Causal technical indicators.
//!
//! Every indicator implements [`Indicator`]: bar history in, one numeric series
//! of the same length out, with `NaN` marking "undefined" (warm-up or a
//! degenerate window). Indicators are precomputed once per run by
//! [`IndicatorEngine`] and read per bar through an [`IndicatorSnapshot`].
//!
//! # Look-ahead contamination guard
//! No indicator value at bar t may depend on price data from bar t+1 or later.
//! Every indicator must pass the truncated-vs-full series test.

pub mod atr;
pub mod ema;
pub mod engine;
pub mod rolling;
pub mod rsi;
pub mod sma;
pub mod stochastic;

pub use atr::Atr;
pub use ema::Ema;
pub use engine::{IndicatorEngine, IndicatorSnapshot, IndicatorValues};
pub use rolling::{Extreme, RollingExtreme};
pub use rsi::Rsi;
pub use sma::{Sma, SmaSource};
pub use stochastic::{StochasticD, StochasticK};

use crate::domain::Bar;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trait for indicators.
///
/// The first `lookback()` values of `compute` are always `NaN`. Later values
/// may also be `NaN` when the window is degenerate (e.g. a zero stochastic range).
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20", "atr_14").
    fn name(&self) -> &str;

    /// Number of leading bars that are always undefined.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Identity of a requested indicator series, used as the snapshot key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndicatorSpec {
    Sma { period: usize },
    Ema { period: usize },
    Rsi { period: usize },
    StochK { period: usize },
    StochD { period: usize, smooth: usize },
    Atr { period: usize },
    Highest { period: usize, exclude_current: bool },
    Lowest { period: usize, exclude_current: bool },
    VolumeSma { period: usize },
}

impl IndicatorSpec {
    /// Instantiate the indicator this spec names.
    pub fn build(&self) -> Box<dyn Indicator> {
        match *self {
            Self::Sma { period } => Box::new(Sma::new(period)),
            Self::Ema { period } => Box::new(Ema::new(period)),
            Self::Rsi { period } => Box::new(Rsi::new(period)),
            Self::StochK { period } => Box::new(StochasticK::new(period)),
            Self::StochD { period, smooth } => Box::new(StochasticD::new(period, smooth)),
            Self::Atr { period } => Box::new(Atr::new(period)),
            Self::Highest {
                period,
                exclude_current,
            } => Box::new(RollingExtreme::new(Extreme::Highest, period, exclude_current)),
            Self::Lowest {
                period,
                exclude_current,
            } => Box::new(RollingExtreme::new(Extreme::Lowest, period, exclude_current)),
            Self::VolumeSma { period } => Box::new(Sma::volume(period)),
        }
    }
}

impl fmt::Display for IndicatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sma { period } => write!(f, "sma_{period}"),
            Self::Ema { period } => write!(f, "ema_{period}"),
            Self::Rsi { period } => write!(f, "rsi_{period}"),
            Self::StochK { period } => write!(f, "stoch_k_{period}"),
            Self::StochD { period, smooth } => write!(f, "stoch_d_{period}_{smooth}"),
            Self::Atr { period } => write!(f, "atr_{period}"),
            Self::Highest {
                period,
                exclude_current,
            } => {
                if *exclude_current {
                    write!(f, "highest_prev_{period}")
                } else {
                    write!(f, "highest_{period}")
                }
            }
            Self::Lowest {
                period,
                exclude_current,
            } => {
                if *exclude_current {
                    write!(f, "lowest_prev_{period}")
                } else {
                    write!(f, "lowest_{period}")
                }
            }
            Self::VolumeSma { period } => write!(f, "volume_sma_{period}"),
        }
    }
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let high = open.max(close) + 1.0;
            let low = open.min(close) - 1.0;
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high,
                low,
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// Bars from explicit (open, high, low, close) tuples.
#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Bar {
            date: base_date + chrono::Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume: 1000,
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
