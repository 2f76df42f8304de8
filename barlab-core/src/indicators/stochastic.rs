//! Stochastic oscillator.
//!
//! %K = 100 * (close - lowest_low) / (highest_high - lowest_low) over `period`
//! bars including the current one. A zero range leaves %K undefined.
//! %D = SMA of %K over `smooth` bars.
//!
//! Lookback: %K period - 1; %D period - 1 + smooth - 1.

use super::rolling::RollingExtreme;
use super::sma::sma_of_series;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct StochasticK {
    period: usize,
    name: String,
}

impl StochasticK {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "stochastic period must be >= 1");
        Self {
            period,
            name: format!("stoch_k_{period}"),
        }
    }
}

fn percent_k(bars: &[Bar], period: usize) -> Vec<f64> {
    let highs = RollingExtreme::highest(period).compute(bars);
    let lows = RollingExtreme::lowest(period).compute(bars);

    bars.iter()
        .zip(highs.iter().zip(&lows))
        .map(|(bar, (&hh, &ll))| {
            let range = hh - ll;
            // NaN range (warm-up) also fails this test.
            if range > 0.0 {
                100.0 * (bar.close - ll) / range
            } else {
                f64::NAN
            }
        })
        .collect()
}

impl Indicator for StochasticK {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        percent_k(bars, self.period)
    }
}

#[derive(Debug, Clone)]
pub struct StochasticD {
    period: usize,
    smooth: usize,
    name: String,
}

impl StochasticD {
    pub fn new(period: usize, smooth: usize) -> Self {
        assert!(period >= 1, "stochastic period must be >= 1");
        assert!(smooth >= 1, "stochastic smoothing must be >= 1");
        Self {
            period,
            smooth,
            name: format!("stoch_d_{period}_{smooth}"),
        }
    }
}

impl Indicator for StochasticD {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1) + self.smooth.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        sma_of_series(&percent_k(bars, self.period), self.smooth)
    }
}
