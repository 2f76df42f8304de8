//! Strategy and broker configuration.
//!
//! `StrategyConfig` is a flat, strongly typed parameter set shared by all rule
//! families; each family reads the fields it needs. Configs are validated once,
//! before any run starts, and never mutated by a run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration problems. Always raised before a run starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be >= 1")]
    NonPositivePeriod { name: &'static str },
    #[error("allocation must be in (0, 1], got {0}")]
    AllocationOutOfRange(f64),
    #[error("date window start {start} is after end {end}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },
    #[error("{name} must be finite and >= 0, got {value}")]
    NegativeValue { name: &'static str, value: f64 },
    #[error("{name} must lie in [0, 100], got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f64 },
    #[error("initial cash must be finite and > 0, got {0}")]
    NonPositiveCash(f64),
    #[error("sweep parameter '{0}' has no candidate values")]
    EmptyCandidates(String),
    #[error("sweep grid has no parameters")]
    EmptyGrid,
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),
    #[error("parameter '{name}' needs a non-negative integer, got {value}")]
    NonIntegral { name: String, value: f64 },
    #[error("parameter '{name}' got non-finite value {value}")]
    NonFinite { name: String, value: f64 },
    #[error("permutation count must be >= 1")]
    ZeroPermutations,
}

/// Which rule family drives the strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleFamilyKind {
    TrendMomentum,
    SupportResistance,
    ChannelBreakout,
}

/// Trading mode: which directions are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingMode {
    LongOnly,
    ShortOnly,
    LongShort,
}

impl TradingMode {
    pub fn allows_long(self) -> bool {
        matches!(self, Self::LongOnly | Self::LongShort)
    }

    pub fn allows_short(self) -> bool {
        matches!(self, Self::ShortOnly | Self::LongShort)
    }
}

/// Inclusive active date window. An open bound is unbounded on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if start > end => Err(ConfigError::InvalidWindow { start, end }),
            _ => Ok(()),
        }
    }
}

/// Validated, strongly typed strategy parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub family: RuleFamilyKind,
    pub trading_mode: TradingMode,
    /// Fraction of available cash committed per entry, in (0, 1].
    pub allocation: f64,
    pub window: DateWindow,

    // ── Lookbacks ──
    pub sma_trend: usize,
    pub ema_period: usize,
    pub rsi_period: usize,
    pub stoch_period: usize,
    pub stoch_smooth: usize,
    pub atr_period: usize,

    // ── Exits ──
    pub sl_mult: Option<f64>,
    pub tp_mult: Option<f64>,
    /// Maximum holding duration in bars, counted from the tier-1 entry.
    pub time_exit: Option<usize>,

    // ── Trend–momentum ──
    pub pullback_bars: usize,
    /// Long momentum passes below this; short momentum passes above 100 minus it.
    pub momentum_threshold: f64,

    // ── Support/resistance ──
    pub sr_period: usize,
    pub sr_tolerance: f64,
    pub sr_rsi_oversold: f64,
    pub sr_stoch_oversold: f64,
    pub sr_rsi_overbought: f64,
    pub sr_stoch_overbought: f64,
    pub volume_period: usize,

    // ── Channel breakout ──
    pub channel_period: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self::trend_momentum()
    }
}

/// Names accepted by [`StrategyConfig::apply_param`].
pub const SWEEPABLE_PARAMS: &[&str] = &[
    "allocation",
    "sma_trend",
    "ema_period",
    "rsi_period",
    "stoch_period",
    "stoch_smooth",
    "atr_period",
    "sl_mult",
    "tp_mult",
    "time_exit",
    "pullback_bars",
    "momentum_threshold",
    "sr_period",
    "sr_tolerance",
    "sr_rsi_oversold",
    "sr_stoch_oversold",
    "sr_rsi_overbought",
    "sr_stoch_overbought",
    "volume_period",
    "channel_period",
];

impl StrategyConfig {
    /// Dual-tier trend–momentum preset (fast 1-month lookbacks).
    pub fn trend_momentum() -> Self {
        Self {
            family: RuleFamilyKind::TrendMomentum,
            trading_mode: TradingMode::LongShort,
            allocation: 0.5,
            window: DateWindow::unbounded(),
            sma_trend: 10,
            ema_period: 6,
            rsi_period: 7,
            stoch_period: 7,
            stoch_smooth: 2,
            atr_period: 5,
            sl_mult: Some(0.4),
            tp_mult: Some(0.8),
            time_exit: Some(5),
            pullback_bars: 3,
            momentum_threshold: 80.0,
            sr_period: 20,
            sr_tolerance: 0.01,
            sr_rsi_oversold: 40.0,
            sr_stoch_oversold: 30.0,
            sr_rsi_overbought: 70.0,
            sr_stoch_overbought: 80.0,
            volume_period: 15,
            channel_period: 20,
        }
    }

    /// Support/resistance mean-reversion preset.
    pub fn support_resistance() -> Self {
        Self {
            family: RuleFamilyKind::SupportResistance,
            sma_trend: 100,
            ema_period: 20,
            rsi_period: 20,
            stoch_period: 20,
            stoch_smooth: 3,
            atr_period: 10,
            sl_mult: Some(0.7),
            tp_mult: Some(1.5),
            time_exit: Some(30),
            ..Self::trend_momentum()
        }
    }

    /// Channel breakout preset: long-only, all-in, no stop/target/timeout.
    pub fn channel_breakout() -> Self {
        Self {
            family: RuleFamilyKind::ChannelBreakout,
            trading_mode: TradingMode::LongOnly,
            allocation: 1.0,
            sl_mult: None,
            tp_mult: None,
            time_exit: None,
            channel_period: 20,
            ..Self::trend_momentum()
        }
    }

    pub fn for_family(family: RuleFamilyKind) -> Self {
        match family {
            RuleFamilyKind::TrendMomentum => Self::trend_momentum(),
            RuleFamilyKind::SupportResistance => Self::support_resistance(),
            RuleFamilyKind::ChannelBreakout => Self::channel_breakout(),
        }
    }

    pub fn with_window(mut self, window: DateWindow) -> Self {
        self.window = window;
        self
    }

    /// Check every range constraint. Called before any run starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.allocation > 0.0 && self.allocation <= 1.0) {
            return Err(ConfigError::AllocationOutOfRange(self.allocation));
        }
        self.window.validate()?;

        let periods = [
            ("sma_trend", self.sma_trend),
            ("ema_period", self.ema_period),
            ("rsi_period", self.rsi_period),
            ("stoch_period", self.stoch_period),
            ("stoch_smooth", self.stoch_smooth),
            ("atr_period", self.atr_period),
            ("sr_period", self.sr_period),
            ("volume_period", self.volume_period),
            ("channel_period", self.channel_period),
        ];
        for (name, period) in periods {
            if period == 0 {
                return Err(ConfigError::NonPositivePeriod { name });
            }
        }
        if self.time_exit == Some(0) {
            return Err(ConfigError::NonPositivePeriod { name: "time_exit" });
        }

        let non_negative = [
            ("sl_mult", self.sl_mult),
            ("tp_mult", self.tp_mult),
            ("sr_tolerance", Some(self.sr_tolerance)),
        ];
        for (name, value) in non_negative {
            if let Some(value) = value {
                if !value.is_finite() || value < 0.0 {
                    return Err(ConfigError::NegativeValue { name, value });
                }
            }
        }

        let thresholds = [
            ("momentum_threshold", self.momentum_threshold),
            ("sr_rsi_oversold", self.sr_rsi_oversold),
            ("sr_stoch_oversold", self.sr_stoch_oversold),
            ("sr_rsi_overbought", self.sr_rsi_overbought),
            ("sr_stoch_overbought", self.sr_stoch_overbought),
        ];
        for (name, value) in thresholds {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { name, value });
            }
        }

        Ok(())
    }

    /// Set one named numeric field, as a sweep does for each grid point.
    ///
    /// Integer fields reject fractional or negative values. `sl_mult`,
    /// `tp_mult` and `time_exit` become enabled when set. Range checks are left
    /// to [`validate`](Self::validate).
    pub fn apply_param(&mut self, name: &str, value: f64) -> Result<(), ConfigError> {
        if !value.is_finite() {
            return Err(ConfigError::NonFinite {
                name: name.to_string(),
                value,
            });
        }
        match name {
            "allocation" => self.allocation = value,
            "sl_mult" => self.sl_mult = Some(value),
            "tp_mult" => self.tp_mult = Some(value),
            "momentum_threshold" => self.momentum_threshold = value,
            "sr_tolerance" => self.sr_tolerance = value,
            "sr_rsi_oversold" => self.sr_rsi_oversold = value,
            "sr_stoch_oversold" => self.sr_stoch_oversold = value,
            "sr_rsi_overbought" => self.sr_rsi_overbought = value,
            "sr_stoch_overbought" => self.sr_stoch_overbought = value,
            _ => {
                let slot = self.integer_slot(name)?;
                *slot = as_integer(name, value)?;
            }
        }
        Ok(())
    }

    fn integer_slot(&mut self, name: &str) -> Result<&mut usize, ConfigError> {
        let slot = match name {
            "sma_trend" => &mut self.sma_trend,
            "ema_period" => &mut self.ema_period,
            "rsi_period" => &mut self.rsi_period,
            "stoch_period" => &mut self.stoch_period,
            "stoch_smooth" => &mut self.stoch_smooth,
            "atr_period" => &mut self.atr_period,
            "pullback_bars" => &mut self.pullback_bars,
            "sr_period" => &mut self.sr_period,
            "volume_period" => &mut self.volume_period,
            "channel_period" => &mut self.channel_period,
            "time_exit" => self.time_exit.insert(0),
            _ => return Err(ConfigError::UnknownParameter(name.to_string())),
        };
        Ok(slot)
    }
}

fn as_integer(name: &str, value: f64) -> Result<usize, ConfigError> {
    if value < 0.0 || value.fract() != 0.0 {
        return Err(ConfigError::NonIntegral {
            name: name.to_string(),
            value,
        });
    }
    Ok(value as usize)
}

/// Cash and commission settings for the simulated broker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerSettings {
    pub initial_cash: f64,
    /// Proportional commission charged on every fill (0.001 = 0.1%).
    pub commission_rate: f64,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            initial_cash: 100_000.0,
            commission_rate: 0.001,
        }
    }
}

impl BrokerSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_cash.is_finite() || self.initial_cash <= 0.0 {
            return Err(ConfigError::NonPositiveCash(self.initial_cash));
        }
        if !self.commission_rate.is_finite() || self.commission_rate < 0.0 {
            return Err(ConfigError::NegativeValue {
                name: "commission_rate",
                value: self.commission_rate,
            });
        }
        Ok(())
    }
}
