//! End-to-end backtests on small hand-built series.

use barlab_core::config::{BrokerSettings, StrategyConfig};
use barlab_core::domain::{Bar, BarSeries, ExitReason, PositionSide};
use barlab_core::indicators::{IndicatorEngine, IndicatorSpec};
use barlab_core::{run_backtest, RunOrigin};
use chrono::NaiveDate;

/// Ten bars closing 100..109, each with a 10-point range.
fn rising_ten() -> BarSeries {
    let base = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
    let bars = (0..10)
        .map(|i| {
            let c = 100.0 + i as f64;
            Bar::new(base + chrono::Duration::days(i), c, c + 5.0, c - 5.0, c, 1_000)
        })
        .collect();
    BarSeries::new(bars).unwrap()
}

fn trend_config() -> StrategyConfig {
    StrategyConfig {
        sma_trend: 5,
        ema_period: 3,
        rsi_period: 3,
        stoch_period: 3,
        stoch_smooth: 2,
        atr_period: 3,
        time_exit: Some(5),
        sl_mult: Some(0.4),
        tp_mult: Some(0.8),
        ..StrategyConfig::trend_momentum()
    }
}

#[test]
fn rising_series_yields_one_timeout_trade() {
    let series = rising_ten();
    let result = run_backtest(&series, &trend_config(), &BrokerSettings::default()).unwrap();

    assert_eq!(result.origin, RunOrigin::Backtest);
    assert_eq!(result.trades.len(), 1);
    let trade = &result.trades[0];

    // The 5-bar SMA first exists, and first holds, at bar 4.
    let sma = IndicatorEngine::new([IndicatorSpec::Sma { period: 5 }]).precompute(&series);
    let first_defined = (0..series.len())
        .find(|&i| sma.snapshot(i).get(IndicatorSpec::Sma { period: 5 }).is_some())
        .unwrap();
    assert_eq!(first_defined, 4);

    assert_eq!(trade.side, PositionSide::Long);
    assert_eq!(trade.entry_bar, 4);
    assert_eq!(trade.exit_bar, 9);
    assert_eq!(trade.exit_reason, ExitReason::Timeout);
    assert_eq!(trade.bars_held, 5);
    assert!(trade.gross_pnl > 0.0);
    assert!(result.open_position.is_none());
}

#[test]
fn final_equity_reconciles_with_trades() {
    let settings = BrokerSettings::default();
    let result = run_backtest(&rising_ten(), &trend_config(), &settings).unwrap();
    let realized: f64 = result.trades.iter().map(|t| t.net_pnl).sum();
    assert!((result.final_equity - (settings.initial_cash + realized)).abs() < 1e-6);
    assert!((result.commission_paid - result.trades[0].commission).abs() < 1e-9);
}

#[test]
fn identical_inputs_are_bit_identical() {
    let series = rising_ten();
    let a = run_backtest(&series, &trend_config(), &BrokerSettings::default()).unwrap();
    let b = run_backtest(&series, &trend_config(), &BrokerSettings::default()).unwrap();

    assert_eq!(a.trades, b.trades);
    let bits_a: Vec<u64> = a.equity_values().iter().map(|v| v.to_bits()).collect();
    let bits_b: Vec<u64> = b.equity_values().iter().map(|v| v.to_bits()).collect();
    assert_eq!(bits_a, bits_b);
}

#[test]
fn run_result_serializes() {
    let result = run_backtest(&rising_ten(), &trend_config(), &BrokerSettings::default()).unwrap();
    let json = serde_json::to_string(&result).unwrap();
    assert!(json.contains("\"exit_reason\":\"timeout\""));
    assert!(json.contains("\"kind\":\"backtest\""));
}
