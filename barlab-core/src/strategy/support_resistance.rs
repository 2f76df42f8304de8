//! Support/resistance mean reversion.
//!
//! Long near rolling support (close <= support * (1 + tol)) when oversold and
//! above the trend SMA; short near resistance when overbought and below it.
//! Both sides require volume above its own moving average.
//! Fade: RSI crosses 50, or %K crosses %D, against the position.

use super::{crossed_against, DecisionContext, RuleFamily};
use crate::config::StrategyConfig;
use crate::domain::PositionSide;
use crate::indicators::IndicatorSpec;

#[derive(Debug, Clone)]
pub struct SupportResistance {
    sma: IndicatorSpec,
    rsi: IndicatorSpec,
    stoch_k: IndicatorSpec,
    stoch_d: IndicatorSpec,
    resistance: IndicatorSpec,
    support: IndicatorSpec,
    volume_sma: IndicatorSpec,
    tolerance: f64,
    rsi_oversold: f64,
    stoch_oversold: f64,
    rsi_overbought: f64,
    stoch_overbought: f64,
}

impl SupportResistance {
    pub fn from_config(config: &StrategyConfig) -> Self {
        Self {
            sma: IndicatorSpec::Sma {
                period: config.sma_trend,
            },
            rsi: IndicatorSpec::Rsi {
                period: config.rsi_period,
            },
            stoch_k: IndicatorSpec::StochK {
                period: config.stoch_period,
            },
            stoch_d: IndicatorSpec::StochD {
                period: config.stoch_period,
                smooth: config.stoch_smooth,
            },
            resistance: IndicatorSpec::Highest {
                period: config.sr_period,
                exclude_current: false,
            },
            support: IndicatorSpec::Lowest {
                period: config.sr_period,
                exclude_current: false,
            },
            volume_sma: IndicatorSpec::VolumeSma {
                period: config.volume_period,
            },
            tolerance: config.sr_tolerance,
            rsi_oversold: config.sr_rsi_oversold,
            stoch_oversold: config.sr_stoch_oversold,
            rsi_overbought: config.sr_rsi_overbought,
            stoch_overbought: config.sr_stoch_overbought,
        }
    }
}

impl RuleFamily for SupportResistance {
    fn name(&self) -> &str {
        "support_resistance"
    }

    fn required_indicators(&self) -> Vec<IndicatorSpec> {
        vec![
            self.sma,
            self.rsi,
            self.stoch_k,
            self.stoch_d,
            self.resistance,
            self.support,
            self.volume_sma,
        ]
    }

    fn entry_signal(&self, ctx: &DecisionContext<'_>) -> Option<PositionSide> {
        let volume_sma = ctx.value(self.volume_sma)?;
        if ctx.bar.volume as f64 <= volume_sma {
            return None;
        }

        let close = ctx.bar.close;
        let sma = ctx.value(self.sma)?;
        let rsi = ctx.value(self.rsi)?;
        let k = ctx.value(self.stoch_k)?;
        let support = ctx.value(self.support)?;
        let resistance = ctx.value(self.resistance)?;

        let near_support = close <= support * (1.0 + self.tolerance);
        let oversold = rsi < self.rsi_oversold || k < self.stoch_oversold;
        let near_resistance = close >= resistance * (1.0 - self.tolerance);
        let overbought = rsi > self.rsi_overbought || k > self.stoch_overbought;

        if close > sma && oversold && near_support {
            Some(PositionSide::Long)
        } else if close < sma && overbought && near_resistance {
            Some(PositionSide::Short)
        } else {
            None
        }
    }

    fn fade(&self, ctx: &DecisionContext<'_>, side: PositionSide) -> bool {
        let rsi_cross = match (ctx.previous_value(self.rsi), ctx.value(self.rsi)) {
            (Some(prev), Some(now)) => crossed_against(side, prev, 50.0, now, 50.0),
            _ => false,
        };
        if rsi_cross {
            return true;
        }
        match (
            ctx.previous_value(self.stoch_k),
            ctx.previous_value(self.stoch_d),
            ctx.value(self.stoch_k),
            ctx.value(self.stoch_d),
        ) {
            (Some(pk), Some(pd), Some(k), Some(d)) => crossed_against(side, pk, pd, k, d),
            _ => false,
        }
    }
}
