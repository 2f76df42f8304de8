//! Strategy layer: per-bar decisions over a pluggable rule family.
//!
//! A [`RuleFamily`] only answers questions about the market ("is there an
//! entry?", "is momentum fading?"). The [`StrategyEngine`] owns everything the
//! families share: date-window and warm-up gating, exit precedence, the tier
//! state machine and position sizing.
//!
//! Strategies hold no mutable state. Tier bookkeeping lives in a
//! [`StrategyState`] value owned by the simulation loop and passed into every
//! decision, so concurrent runs never alias anything.

pub mod channel;
pub mod engine;
pub mod support_resistance;
pub mod trend;

pub use channel::ChannelBreakout;
pub use engine::StrategyEngine;
pub use support_resistance::SupportResistance;
pub use trend::TrendMomentum;

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, ExitReason, Position, PositionSide};
use crate::indicators::{IndicatorSnapshot, IndicatorSpec};

/// What the strategy wants the broker to do at this bar's close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum Action {
    EnterLong(u64),
    EnterShort(u64),
    /// Increase the open position in its current direction.
    Add(u64),
    Exit(ExitReason),
    Hold,
}

/// Tier of the position ladder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    #[default]
    Flat,
    Tier1,
    Tier2,
}

/// Explicit run-state threaded through `decide`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StrategyState {
    pub tier: Tier,
    /// Bar index of the primary entry while a position is open.
    pub tier1_bar: Option<usize>,
}

impl StrategyState {
    /// State after `action` has been filled at bar `index`.
    ///
    /// flat → tier1 on entry, tier1 → tier2 on add, any tier → flat on exit.
    pub fn apply(self, action: &Action, index: usize) -> Self {
        match action {
            Action::EnterLong(_) | Action::EnterShort(_) => Self {
                tier: Tier::Tier1,
                tier1_bar: Some(index),
            },
            Action::Add(_) => Self {
                tier: Tier::Tier2,
                ..self
            },
            Action::Exit(_) => Self::default(),
            Action::Hold => self,
        }
    }
}

/// Everything a decision may look at. Nothing here reaches past the current bar.
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    pub bar: &'a Bar,
    pub index: usize,
    pub previous_bar: Option<&'a Bar>,
    pub snapshot: IndicatorSnapshot<'a>,
    pub position: &'a Position,
    pub state: StrategyState,
    pub cash: f64,
    pub commission_rate: f64,
}

impl<'a> DecisionContext<'a> {
    /// Indicator value at the current bar.
    pub fn value(&self, spec: IndicatorSpec) -> Option<f64> {
        self.snapshot.get(spec)
    }

    /// Indicator value at the previous bar.
    pub fn previous_value(&self, spec: IndicatorSpec) -> Option<f64> {
        self.snapshot.previous().and_then(|s| s.get(spec))
    }
}

/// One family of entry and fade rules.
pub trait RuleFamily: Send + Sync {
    fn name(&self) -> &str;

    /// Indicators that must be defined at a bar before the family is consulted.
    fn required_indicators(&self) -> Vec<IndicatorSpec>;

    /// Direction of a fresh entry signal, if any.
    fn entry_signal(&self, ctx: &DecisionContext<'_>) -> Option<PositionSide>;

    /// Whether a tier-2 add-on should fire. Only asked while in tier 1.
    fn pullback_add(&self, _ctx: &DecisionContext<'_>, _side: PositionSide) -> bool {
        false
    }

    /// Momentum reversal against an open position on `side`.
    fn fade(&self, ctx: &DecisionContext<'_>, side: PositionSide) -> bool;
}

/// Shares affordable for one entry.
///
/// `floor(cash * allocation / close)`, capped so the commission-inclusive cost
/// never exceeds `cash`.
pub fn position_size(cash: f64, allocation: f64, close: f64, commission_rate: f64) -> u64 {
    if !(cash > 0.0 && close > 0.0) {
        return 0;
    }
    let target = (cash * allocation / close).floor();
    let affordable = (cash / (close * (1.0 + commission_rate))).floor();
    target.min(affordable).max(0.0) as u64
}

/// True when the fast line crossed the slow line against `side` between the
/// previous bar and this one (downward for longs, upward for shorts).
pub(crate) fn crossed_against(
    side: PositionSide,
    prev_fast: f64,
    prev_slow: f64,
    fast: f64,
    slow: f64,
) -> bool {
    match side {
        PositionSide::Long => prev_fast >= prev_slow && fast < slow,
        PositionSide::Short => prev_fast <= prev_slow && fast > slow,
        PositionSide::Flat => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizing_example() {
        assert_eq!(position_size(100_000.0, 0.5, 300.0, 0.001), 166);
    }

    #[test]
    fn sizing_caps_at_commission_inclusive_cost() {
        // Full allocation: floor(1000/100) = 10 but 10 * 100 * 1.01 > 1000.
        assert_eq!(position_size(1000.0, 1.0, 100.0, 0.01), 9);
    }

    #[test]
    fn sizing_zero_when_unaffordable() {
        assert_eq!(position_size(50.0, 0.5, 300.0, 0.001), 0);
        assert_eq!(position_size(0.0, 1.0, 10.0, 0.0), 0);
        assert_eq!(position_size(-5.0, 1.0, 10.0, 0.0), 0);
    }

    #[test]
    fn state_transitions() {
        let s = StrategyState::default();
        assert_eq!(s.tier, Tier::Flat);

        let s = s.apply(&Action::EnterShort(10), 7);
        assert_eq!(s.tier, Tier::Tier1);
        assert_eq!(s.tier1_bar, Some(7));

        let s = s.apply(&Action::Hold, 8);
        assert_eq!(s.tier, Tier::Tier1);

        let s = s.apply(&Action::Add(5), 9);
        assert_eq!(s.tier, Tier::Tier2);
        assert_eq!(s.tier1_bar, Some(7));

        let s = s.apply(&Action::Exit(ExitReason::Fade), 12);
        assert_eq!(s, StrategyState::default());
    }

    #[test]
    fn crossing_direction() {
        assert!(crossed_against(PositionSide::Long, 55.0, 50.0, 45.0, 50.0));
        assert!(!crossed_against(PositionSide::Long, 45.0, 50.0, 40.0, 50.0));
        assert!(crossed_against(PositionSide::Short, 45.0, 50.0, 55.0, 50.0));
        assert!(!crossed_against(PositionSide::Short, 55.0, 50.0, 60.0, 50.0));
        assert!(!crossed_against(PositionSide::Flat, 55.0, 50.0, 45.0, 50.0));
    }
}
