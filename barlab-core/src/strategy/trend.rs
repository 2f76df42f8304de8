//! Trend–momentum dual-tier rules.
//!
//! Entry (long): close > trend SMA, fast EMA > trend SMA, and a loose momentum
//! filter (RSI < T or %K < T). Short mirrors with 100 - T.
//! Tier 2 (long): previous low <= previous EMA, close back above the EMA and
//! above the trend SMA. The engine bounds it to the pullback window.
//! Fade: RSI crosses 50 against the position.

use super::{crossed_against, DecisionContext, RuleFamily};
use crate::config::StrategyConfig;
use crate::domain::PositionSide;
use crate::indicators::IndicatorSpec;

#[derive(Debug, Clone)]
pub struct TrendMomentum {
    sma: IndicatorSpec,
    ema: IndicatorSpec,
    rsi: IndicatorSpec,
    stoch_k: IndicatorSpec,
    threshold: f64,
}

impl TrendMomentum {
    pub fn from_config(config: &StrategyConfig) -> Self {
        Self {
            sma: IndicatorSpec::Sma {
                period: config.sma_trend,
            },
            ema: IndicatorSpec::Ema {
                period: config.ema_period,
            },
            rsi: IndicatorSpec::Rsi {
                period: config.rsi_period,
            },
            stoch_k: IndicatorSpec::StochK {
                period: config.stoch_period,
            },
            threshold: config.momentum_threshold,
        }
    }
}

impl RuleFamily for TrendMomentum {
    fn name(&self) -> &str {
        "trend_momentum"
    }

    fn required_indicators(&self) -> Vec<IndicatorSpec> {
        vec![self.sma, self.ema, self.rsi, self.stoch_k]
    }

    fn entry_signal(&self, ctx: &DecisionContext<'_>) -> Option<PositionSide> {
        let close = ctx.bar.close;
        let sma = ctx.value(self.sma)?;
        let ema = ctx.value(self.ema)?;
        let rsi = ctx.value(self.rsi)?;
        let k = ctx.value(self.stoch_k)?;

        let long_momentum = rsi < self.threshold || k < self.threshold;
        let short_floor = 100.0 - self.threshold;
        let short_momentum = rsi > short_floor || k > short_floor;

        if close > sma && ema > sma && long_momentum {
            Some(PositionSide::Long)
        } else if close < sma && ema < sma && short_momentum {
            Some(PositionSide::Short)
        } else {
            None
        }
    }

    fn pullback_add(&self, ctx: &DecisionContext<'_>, side: PositionSide) -> bool {
        let (Some(prev_bar), Some(prev_ema)) = (ctx.previous_bar, ctx.previous_value(self.ema))
        else {
            return false;
        };
        let (Some(ema), Some(sma)) = (ctx.value(self.ema), ctx.value(self.sma)) else {
            return false;
        };
        let close = ctx.bar.close;
        match side {
            PositionSide::Long => prev_bar.low <= prev_ema && close > ema && close > sma,
            PositionSide::Short => prev_bar.high >= prev_ema && close < ema && close < sma,
            PositionSide::Flat => false,
        }
    }

    fn fade(&self, ctx: &DecisionContext<'_>, side: PositionSide) -> bool {
        match (ctx.previous_value(self.rsi), ctx.value(self.rsi)) {
            (Some(prev), Some(now)) => crossed_against(side, prev, 50.0, now, 50.0),
            _ => false,
        }
    }
}
