//! Indicator precomputation and per-bar lookup.
//!
//! All requested indicators are computed once before the bar loop begins and
//! stored in an [`IndicatorValues`] container. The loop reads them through an
//! [`IndicatorSnapshot`] bound to one bar index, which is the only view a
//! strategy ever gets.

use std::collections::HashMap;

use super::IndicatorSpec;
use crate::domain::BarSeries;

/// Precomputed indicator series keyed by `IndicatorSpec`.
#[derive(Debug, Clone, Default)]
pub struct IndicatorValues {
    series: HashMap<IndicatorSpec, Vec<f64>>,
    len: usize,
}

impl IndicatorValues {
    pub fn new(len: usize) -> Self {
        Self {
            series: HashMap::new(),
            len,
        }
    }

    pub fn insert(&mut self, spec: IndicatorSpec, values: Vec<f64>) {
        debug_assert_eq!(
            values.len(),
            self.len,
            "indicator '{spec}' produced {} values for {} bars",
            values.len(),
            self.len
        );
        self.series.insert(spec, values);
    }

    /// Raw value at `index`; `NaN` when undefined, `None` when the indicator was
    /// never requested or the index is out of range.
    pub fn raw(&self, spec: &IndicatorSpec, index: usize) -> Option<f64> {
        self.series.get(spec).and_then(|s| s.get(index).copied())
    }

    pub fn series(&self, spec: &IndicatorSpec) -> Option<&[f64]> {
        self.series.get(spec).map(Vec::as_slice)
    }

    pub fn contains(&self, spec: &IndicatorSpec) -> bool {
        self.series.contains_key(spec)
    }

    /// Number of bars each series covers.
    pub fn bar_count(&self) -> usize {
        self.len
    }

    /// Number of stored series.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn snapshot(&self, index: usize) -> IndicatorSnapshot<'_> {
        IndicatorSnapshot {
            values: self,
            index,
        }
    }
}

/// Read-only view of every indicator at a single bar index.
#[derive(Debug, Clone, Copy)]
pub struct IndicatorSnapshot<'a> {
    values: &'a IndicatorValues,
    index: usize,
}

impl<'a> IndicatorSnapshot<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Defined value of `spec` at this bar, or `None` when undefined.
    pub fn get(&self, spec: IndicatorSpec) -> Option<f64> {
        self.values
            .raw(&spec, self.index)
            .filter(|v| v.is_finite())
    }

    pub fn is_defined(&self, spec: IndicatorSpec) -> bool {
        self.get(spec).is_some()
    }

    /// True when every listed indicator has a value at this bar.
    pub fn all_defined(&self, specs: &[IndicatorSpec]) -> bool {
        specs.iter().all(|s| self.is_defined(*s))
    }

    /// Snapshot of the preceding bar, if there is one.
    pub fn previous(&self) -> Option<IndicatorSnapshot<'a>> {
        self.index.checked_sub(1).map(|index| IndicatorSnapshot {
            values: self.values,
            index,
        })
    }
}

/// Computes indicator series for a bar series.
#[derive(Debug, Clone, Default)]
pub struct IndicatorEngine {
    specs: Vec<IndicatorSpec>,
}

impl IndicatorEngine {
    /// Engine for a set of specs; duplicates are computed once.
    pub fn new(specs: impl IntoIterator<Item = IndicatorSpec>) -> Self {
        let mut unique = Vec::new();
        for spec in specs {
            if !unique.contains(&spec) {
                unique.push(spec);
            }
        }
        Self { specs: unique }
    }

    pub fn specs(&self) -> &[IndicatorSpec] {
        &self.specs
    }

    /// Precompute every requested indicator over the whole series.
    pub fn precompute(&self, series: &BarSeries) -> IndicatorValues {
        let bars = series.bars();
        let mut values = IndicatorValues::new(bars.len());
        for spec in &self.specs {
            values.insert(*spec, spec.build().compute(bars));
        }
        values
    }

    /// Maximum lookback across all indicators: no strategy decision can act
    /// before this many bars have been seen.
    pub fn warmup(&self) -> usize {
        self.specs
            .iter()
            .map(|s| s.build().lookback())
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn series(closes: &[f64]) -> BarSeries {
        BarSeries::new(make_bars(closes)).unwrap()
    }

    #[test]
    fn precompute_single_indicator() {
        let engine = IndicatorEngine::new([IndicatorSpec::Sma { period: 3 }]);
        let values = engine.precompute(&series(&[10.0, 11.0, 12.0, 13.0, 14.0]));

        assert_eq!(values.len(), 1);
        assert_eq!(values.bar_count(), 5);
        let sma = IndicatorSpec::Sma { period: 3 };
        assert!(values.raw(&sma, 1).unwrap().is_nan());
        assert!((values.raw(&sma, 2).unwrap() - 11.0).abs() < 1e-10);
    }

    #[test]
    fn duplicate_specs_are_computed_once() {
        let sma = IndicatorSpec::Sma { period: 3 };
        let engine = IndicatorEngine::new([sma, IndicatorSpec::Ema { period: 3 }, sma]);
        assert_eq!(engine.specs().len(), 2);
    }

    #[test]
    fn snapshot_hides_undefined_values() {
        let sma = IndicatorSpec::Sma { period: 3 };
        let engine = IndicatorEngine::new([sma]);
        let values = engine.precompute(&series(&[10.0, 11.0, 12.0, 13.0]));

        assert_eq!(values.snapshot(1).get(sma), None);
        assert!(!values.snapshot(1).all_defined(&[sma]));
        assert!(values.snapshot(2).all_defined(&[sma]));
        assert!((values.snapshot(3).get(sma).unwrap() - 12.0).abs() < 1e-10);
    }

    #[test]
    fn snapshot_of_unrequested_indicator_is_undefined() {
        let engine = IndicatorEngine::new([IndicatorSpec::Sma { period: 2 }]);
        let values = engine.precompute(&series(&[10.0, 11.0, 12.0]));
        assert_eq!(values.snapshot(2).get(IndicatorSpec::Rsi { period: 2 }), None);
    }

    #[test]
    fn previous_snapshot() {
        let engine = IndicatorEngine::new([IndicatorSpec::Sma { period: 1 }]);
        let values = engine.precompute(&series(&[10.0, 11.0, 12.0]));
        let snap = values.snapshot(2);
        let prev = snap.previous().unwrap();
        assert_eq!(prev.index(), 1);
        assert_eq!(prev.get(IndicatorSpec::Sma { period: 1 }), Some(11.0));
        assert!(values.snapshot(0).previous().is_none());
    }

    #[test]
    fn warmup_is_max_lookback() {
        let engine = IndicatorEngine::new([
            IndicatorSpec::Sma { period: 5 },
            IndicatorSpec::Ema { period: 20 },
            IndicatorSpec::Atr { period: 14 },
        ]);
        assert_eq!(engine.warmup(), 19);
        assert_eq!(IndicatorEngine::default().warmup(), 0);
    }
}
