//! Channel breakout.
//!
//! Both bands come from the prior `period` bars, excluding the current one.
//! Long on a close above the upper band, short (when the mode allows) on a
//! close below the lower band. Closing through the opposite band is the fade.

use super::{DecisionContext, RuleFamily};
use crate::config::StrategyConfig;
use crate::domain::PositionSide;
use crate::indicators::IndicatorSpec;

#[derive(Debug, Clone)]
pub struct ChannelBreakout {
    upper: IndicatorSpec,
    lower: IndicatorSpec,
}

impl ChannelBreakout {
    pub fn from_config(config: &StrategyConfig) -> Self {
        Self {
            upper: IndicatorSpec::Highest {
                period: config.channel_period,
                exclude_current: true,
            },
            lower: IndicatorSpec::Lowest {
                period: config.channel_period,
                exclude_current: true,
            },
        }
    }
}

impl RuleFamily for ChannelBreakout {
    fn name(&self) -> &str {
        "channel_breakout"
    }

    fn required_indicators(&self) -> Vec<IndicatorSpec> {
        vec![self.upper, self.lower]
    }

    fn entry_signal(&self, ctx: &DecisionContext<'_>) -> Option<PositionSide> {
        let close = ctx.bar.close;
        if close > ctx.value(self.upper)? {
            Some(PositionSide::Long)
        } else if close < ctx.value(self.lower)? {
            Some(PositionSide::Short)
        } else {
            None
        }
    }

    fn fade(&self, ctx: &DecisionContext<'_>, side: PositionSide) -> bool {
        let close = ctx.bar.close;
        match side {
            PositionSide::Long => ctx.value(self.lower).is_some_and(|lower| close < lower),
            PositionSide::Short => ctx.value(self.upper).is_some_and(|upper| close > upper),
            PositionSide::Flat => false,
        }
    }
}
