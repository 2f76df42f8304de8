//! StrategyEngine: shared decision logic around a rule family.

use super::{
    position_size, Action, ChannelBreakout, DecisionContext, RuleFamily, SupportResistance,
    Tier, TrendMomentum,
};
use crate::config::{ConfigError, RuleFamilyKind, StrategyConfig};
use crate::domain::{ExitReason, PositionSide};
use crate::indicators::{IndicatorEngine, IndicatorSpec};

/// A validated strategy: config, rule family and the indicator set it reads.
pub struct StrategyEngine {
    config: StrategyConfig,
    family: Box<dyn RuleFamily>,
    required: Vec<IndicatorSpec>,
}

impl std::fmt::Debug for StrategyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyEngine")
            .field("family", &self.family.name())
            .field("required", &self.required)
            .finish()
    }
}

impl StrategyEngine {
    /// Validate `config` and build the engine for its rule family.
    pub fn new(config: StrategyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let family: Box<dyn RuleFamily> = match config.family {
            RuleFamilyKind::TrendMomentum => Box::new(TrendMomentum::from_config(&config)),
            RuleFamilyKind::SupportResistance => Box::new(SupportResistance::from_config(&config)),
            RuleFamilyKind::ChannelBreakout => Box::new(ChannelBreakout::from_config(&config)),
        };

        let mut required = family.required_indicators();
        if config.sl_mult.is_some() || config.tp_mult.is_some() {
            let atr = IndicatorSpec::Atr {
                period: config.atr_period,
            };
            if !required.contains(&atr) {
                required.push(atr);
            }
        }

        Ok(Self {
            config,
            family,
            required,
        })
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn family_name(&self) -> &str {
        self.family.name()
    }

    /// Indicators that gate every decision.
    pub fn required_indicators(&self) -> &[IndicatorSpec] {
        &self.required
    }

    pub fn indicator_engine(&self) -> IndicatorEngine {
        IndicatorEngine::new(self.required.iter().copied())
    }

    /// Decide the action for one bar.
    ///
    /// Resolves to `Hold` outside the date window and whenever any required
    /// indicator is undefined. With a position open, exits are checked first
    /// (stop loss, take profit, fade, timeout), then the tier-2 add-on.
    pub fn decide(&self, ctx: &DecisionContext<'_>) -> Action {
        if !self.config.window.contains(ctx.bar.date) {
            return Action::Hold;
        }
        if !ctx.snapshot.all_defined(&self.required) {
            return Action::Hold;
        }

        let side = ctx.position.side;
        if side == PositionSide::Flat {
            return self.entry(ctx);
        }

        if let Some(reason) = self.exit_reason(ctx, side) {
            return Action::Exit(reason);
        }

        if self.pullback_open(ctx) && self.family.pullback_add(ctx, side) {
            let size = self.size(ctx);
            if size > 0 {
                return Action::Add(size);
            }
        }

        Action::Hold
    }

    fn entry(&self, ctx: &DecisionContext<'_>) -> Action {
        let mode = self.config.trading_mode;
        let side = match self.family.entry_signal(ctx) {
            Some(PositionSide::Long) if mode.allows_long() => PositionSide::Long,
            Some(PositionSide::Short) if mode.allows_short() => PositionSide::Short,
            _ => return Action::Hold,
        };
        match (side, self.size(ctx)) {
            (_, 0) => Action::Hold,
            (PositionSide::Short, size) => Action::EnterShort(size),
            (_, size) => Action::EnterLong(size),
        }
    }

    /// First satisfied exit condition, in precedence order.
    fn exit_reason(&self, ctx: &DecisionContext<'_>, side: PositionSide) -> Option<ExitReason> {
        let close = ctx.bar.close;
        let entry = ctx.position.entry_price;
        let sign = side.sign();
        let atr = ctx.value(IndicatorSpec::Atr {
            period: self.config.atr_period,
        });

        if let (Some(mult), Some(atr)) = (self.config.sl_mult, atr) {
            let stop = entry - sign * atr * mult;
            if sign * (close - stop) <= 0.0 {
                return Some(ExitReason::StopLoss);
            }
        }
        if let (Some(mult), Some(atr)) = (self.config.tp_mult, atr) {
            let target = entry + sign * atr * mult;
            if sign * (close - target) >= 0.0 {
                return Some(ExitReason::TakeProfit);
            }
        }
        if self.family.fade(ctx, side) {
            return Some(ExitReason::Fade);
        }
        if let Some(limit) = self.config.time_exit {
            if ctx.index >= ctx.position.entry_bar + limit {
                return Some(ExitReason::Timeout);
            }
        }
        None
    }

    fn pullback_open(&self, ctx: &DecisionContext<'_>) -> bool {
        match (ctx.state.tier, ctx.state.tier1_bar) {
            (Tier::Tier1, Some(start)) => ctx.index <= start + self.config.pullback_bars,
            _ => false,
        }
    }

    /// Sized from cash net of any short liability, so a short add does not
    /// compound on its own sale proceeds.
    fn size(&self, ctx: &DecisionContext<'_>) -> u64 {
        let available = match ctx.position.side {
            PositionSide::Short => ctx.cash - ctx.position.quantity as f64 * ctx.bar.close,
            _ => ctx.cash,
        };
        position_size(
            available,
            self.config.allocation,
            ctx.bar.close,
            ctx.commission_rate,
        )
    }
}
