//! Rolling highest high / lowest low.
//!
//! - Highest: max(high[t-period+1..=t])
//! - Lowest:  min(low[t-period+1..=t])
//!
//! With `exclude_current` the window shifts back one bar to [t-period..=t-1],
//! which is what a breakout test against the prior channel needs.
//!
//! Lookback: period - 1, or period when the current bar is excluded.

use super::Indicator;
use crate::domain::Bar;

/// Which side of the range to track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    Highest,
    Lowest,
}

#[derive(Debug, Clone)]
pub struct RollingExtreme {
    extreme: Extreme,
    period: usize,
    exclude_current: bool,
    name: String,
}

impl RollingExtreme {
    pub fn new(extreme: Extreme, period: usize, exclude_current: bool) -> Self {
        assert!(period >= 1, "rolling window period must be >= 1");
        let base = match extreme {
            Extreme::Highest => "highest",
            Extreme::Lowest => "lowest",
        };
        let name = if exclude_current {
            format!("{base}_prev_{period}")
        } else {
            format!("{base}_{period}")
        };
        Self {
            extreme,
            period,
            exclude_current,
            name,
        }
    }

    pub fn highest(period: usize) -> Self {
        Self::new(Extreme::Highest, period, false)
    }

    pub fn lowest(period: usize) -> Self {
        Self::new(Extreme::Lowest, period, false)
    }
}

impl Indicator for RollingExtreme {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        if self.exclude_current {
            self.period
        } else {
            self.period.saturating_sub(1)
        }
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        let offset = usize::from(self.exclude_current);

        for (i, slot) in result.iter_mut().enumerate().skip(self.lookback()) {
            let end = i + 1 - offset;
            let window = &bars[end - self.period..end];
            *slot = match self.extreme {
                Extreme::Highest => window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max),
                Extreme::Lowest => window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min),
            };
        }

        result
    }
}
