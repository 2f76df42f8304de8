//! BarSeries: validated, immutable, shareable sequence of daily bars.

use std::ops::Index;
use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;

use super::bar::{Bar, BarError};

/// Errors raised while constructing a [`BarSeries`].
///
/// These reject the request as a whole: no run starts on invalid data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("bar series is empty")]
    Empty,
    #[error("dates not strictly increasing at index {index}: {previous} then {current}")]
    NonMonotonicDates {
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },
    #[error("invalid bar at index {index}: {source}")]
    InvalidBar {
        index: usize,
        #[source]
        source: BarError,
    },
}

/// Ordered, validated bar history. The sole unit of truth for time.
///
/// Cloning is cheap (reference counted), so the same series can be handed to
/// every worker of a sweep or permutation batch without copying.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    bars: Arc<[Bar]>,
}

impl BarSeries {
    /// Validate and wrap a bar vector.
    ///
    /// Rejects empty input, duplicate or descending dates, and any bar that
    /// breaks the OHLC invariants.
    pub fn new(bars: Vec<Bar>) -> Result<Self, DataError> {
        if bars.is_empty() {
            return Err(DataError::Empty);
        }
        for (index, bar) in bars.iter().enumerate() {
            bar.validate()
                .map_err(|source| DataError::InvalidBar { index, source })?;
            if index > 0 {
                let previous = bars[index - 1].date;
                if bar.date <= previous {
                    return Err(DataError::NonMonotonicDates {
                        index,
                        previous,
                        current: bar.date,
                    });
                }
            }
        }
        Ok(Self { bars: bars.into() })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false for a constructed series; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bar> {
        self.bars.iter()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.bars[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.bars[self.bars.len() - 1].date
    }

    /// Simple close-to-close returns, `r_t = close_t / close_{t-1} - 1` for t = 1..N-1.
    pub fn simple_returns(&self) -> Vec<f64> {
        self.bars
            .windows(2)
            .map(|w| w[1].close / w[0].close - 1.0)
            .collect()
    }
}

impl Index<usize> for BarSeries {
    type Output = Bar;

    fn index(&self, index: usize) -> &Bar {
        &self.bars[index]
    }
}

impl<'a> IntoIterator for &'a BarSeries {
    type Item = &'a Bar;
    type IntoIter = std::slice::Iter<'a, Bar>;

    fn into_iter(self) -> Self::IntoIter {
        self.bars.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: u32, close: f64) -> Bar {
        Bar::new(
            NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            close,
            close + 1.0,
            close - 1.0,
            close,
            1000,
        )
    }

    #[test]
    fn accepts_ordered_series() {
        let series = BarSeries::new(vec![bar(2, 100.0), bar(3, 101.0), bar(5, 99.0)]).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series[2].close, 99.0);
        assert_eq!(series.first_date(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(series.last_date(), NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(BarSeries::new(vec![]), Err(DataError::Empty));
    }

    #[test]
    fn rejects_duplicate_dates() {
        let err = BarSeries::new(vec![bar(2, 100.0), bar(2, 101.0)]).unwrap_err();
        assert!(matches!(err, DataError::NonMonotonicDates { index: 1, .. }));
    }

    #[test]
    fn rejects_descending_dates() {
        let err = BarSeries::new(vec![bar(3, 100.0), bar(2, 101.0)]).unwrap_err();
        assert!(matches!(err, DataError::NonMonotonicDates { index: 1, .. }));
    }

    #[test]
    fn rejects_ohlc_violation() {
        let mut bad = bar(3, 101.0);
        bad.high = 50.0;
        let err = BarSeries::new(vec![bar(2, 100.0), bad]).unwrap_err();
        assert!(matches!(err, DataError::InvalidBar { index: 1, .. }));
    }

    #[test]
    fn simple_returns_from_closes() {
        let series = BarSeries::new(vec![bar(2, 100.0), bar(3, 110.0), bar(4, 99.0)]).unwrap();
        let r = series.simple_returns();
        assert_eq!(r.len(), 2);
        assert!((r[0] - 0.10).abs() < 1e-12);
        assert!((r[1] - (-0.10)).abs() < 1e-12);
    }

    #[test]
    fn clones_share_storage() {
        let series = BarSeries::new(vec![bar(2, 100.0)]).unwrap();
        let copy = series.clone();
        assert!(std::ptr::eq(series.bars().as_ptr(), copy.bars().as_ptr()));
    }
}
