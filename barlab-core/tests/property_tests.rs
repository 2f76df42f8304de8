//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Causality: mutating bars after t never changes indicator values at or before t
//! 2. Sizing: an entry never costs more than the available cash
//! 3. Broker accounting: equity identity and cash/realized PnL bookkeeping
//! 4. Simulation: one equity sample per bar, non-negative cash, determinism

use barlab_core::config::{BrokerSettings, StrategyConfig, TradingMode};
use barlab_core::domain::{Bar, BarSeries, ExitReason, PositionSide};
use barlab_core::engine::{Broker, RunOrigin, Simulation};
use barlab_core::indicators::{IndicatorEngine, IndicatorSpec};
use barlab_core::strategy::position_size;
use chrono::NaiveDate;
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

/// Daily returns within ±5%.
fn arb_returns(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.05..0.05_f64, len)
}

fn arb_price() -> impl Strategy<Value = f64> {
    (10.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn series_from_returns(returns: &[f64]) -> BarSeries {
    let base = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    let mut price = 100.0;
    let bars = returns
        .iter()
        .enumerate()
        .map(|(i, r)| {
            price *= 1.0 + r;
            let open = price * (1.0 - r / 2.0);
            let high = open.max(price) * 1.01;
            let low = open.min(price) * 0.99;
            Bar::new(
                base + chrono::Duration::days(i as i64),
                open,
                high,
                low,
                price,
                1_000 + (i as u64 * 7919) % 5_000,
            )
        })
        .collect();
    BarSeries::new(bars).unwrap()
}

fn all_specs() -> Vec<IndicatorSpec> {
    vec![
        IndicatorSpec::Sma { period: 5 },
        IndicatorSpec::Ema { period: 4 },
        IndicatorSpec::Rsi { period: 4 },
        IndicatorSpec::StochK { period: 5 },
        IndicatorSpec::StochD {
            period: 5,
            smooth: 2,
        },
        IndicatorSpec::Atr { period: 4 },
        IndicatorSpec::Highest {
            period: 6,
            exclude_current: true,
        },
        IndicatorSpec::Lowest {
            period: 6,
            exclude_current: false,
        },
        IndicatorSpec::VolumeSma { period: 3 },
    ]
}

fn small_trend(mode: TradingMode) -> StrategyConfig {
    StrategyConfig {
        trading_mode: mode,
        sma_trend: 5,
        ema_period: 3,
        rsi_period: 3,
        stoch_period: 3,
        atr_period: 3,
        ..StrategyConfig::trend_momentum()
    }
}

// ── 1. Causality ─────────────────────────────────────────────────────

proptest! {
    /// Rewriting every bar after `cut` leaves all values up to `cut` untouched.
    #[test]
    fn mutating_future_bars_preserves_past(
        returns in arb_returns(30..60),
        noise in arb_returns(60..61),
        cut_frac in 0.2..0.8_f64,
    ) {
        let original = series_from_returns(&returns);
        let cut = ((returns.len() as f64) * cut_frac) as usize;

        let mut mutated_returns = returns.clone();
        for (i, r) in mutated_returns.iter_mut().enumerate().skip(cut + 1) {
            *r = noise[i];
        }
        let mutated = series_from_returns(&mutated_returns);

        let engine = IndicatorEngine::new(all_specs());
        let a = engine.precompute(&original);
        let b = engine.precompute(&mutated);

        for i in 0..=cut {
            for spec in engine.specs() {
                prop_assert_eq!(a.snapshot(i).get(*spec), b.snapshot(i).get(*spec));
            }
        }
    }
}

// ── 2. Sizing ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn entry_cost_never_exceeds_cash(
        cash in 0.0..1_000_000.0_f64,
        allocation in 0.01..1.0_f64,
        close in arb_price(),
        commission in 0.0..0.01_f64,
    ) {
        let size = position_size(cash, allocation, close, commission);
        let cost = size as f64 * close * (1.0 + commission);
        prop_assert!(cost <= cash + 1e-6);
        prop_assert!(size as f64 <= (cash * allocation / close).floor());
    }
}

// ── 3. Broker accounting ─────────────────────────────────────────────

proptest! {
    /// Equity identity holds after every fill, and a closed book is worth
    /// initial cash plus realized PnL.
    #[test]
    fn equity_identity(
        prices in prop::collection::vec(arb_price(), 3..20),
        short in any::<bool>(),
        commission in 0.0..0.005_f64,
    ) {
        let settings = BrokerSettings { initial_cash: 100_000.0, commission_rate: commission };
        let mut broker = Broker::new(&settings);
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let side = if short { PositionSide::Short } else { PositionSide::Long };

        let first = prices[0];
        let qty = position_size(broker.cash(), 0.3, first, commission);
        prop_assume!(qty > 0);
        broker.enter(side, qty, 0, date, first).unwrap();

        for (i, &p) in prices.iter().enumerate().skip(1).take(prices.len() - 2) {
            let pos = broker.position();
            let expected = broker.cash() + pos.signed_quantity() * p;
            prop_assert!((broker.equity(p) - expected).abs() < 1e-6);
            prop_assert!(broker.cash() >= 0.0);

            if !short {
                let add = position_size(broker.cash(), 0.2, p, commission);
                if add > 0 {
                    let before = broker.position().quantity;
                    broker.add(add, i, p).unwrap();
                    prop_assert_eq!(broker.position().quantity, before + add);
                }
            }
        }

        let last = *prices.last().unwrap();
        let trade = broker.exit(ExitReason::Timeout, prices.len() - 1, date, last);
        // A short can lose more than the cash buffer only on a >3x rally.
        if let Ok(trade) = trade {
            prop_assert!(broker.position().is_flat());
            prop_assert!((trade.net_pnl - (trade.gross_pnl - trade.commission)).abs() < 1e-9);
            prop_assert!((broker.cash() - (100_000.0 + broker.realized_pnl())).abs() < 1e-6);
            prop_assert!((broker.commission_paid() - trade.commission).abs() < 1e-6);
        }
    }
}

// ── 4. Simulation ────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn long_only_run_keeps_invariants(returns in arb_returns(20..120)) {
        let series = series_from_returns(&returns);
        let sim = Simulation::new(small_trend(TradingMode::LongOnly), BrokerSettings::default()).unwrap();
        let result = sim.run(&series, RunOrigin::Backtest).unwrap();

        prop_assert_eq!(result.equity_curve.len(), series.len());
        for (sample, bar) in result.equity_curve.iter().zip(series.iter()) {
            prop_assert_eq!(sample.date, bar.date);
            prop_assert!(sample.cash >= -1e-6);
            let expected = sample.cash + sample.side.sign() * sample.quantity as f64 * bar.close;
            prop_assert!((sample.equity - expected).abs() < 1e-6);
        }
        prop_assert_eq!(result.final_equity, result.equity_curve.last().unwrap().equity);
        for trade in &result.trades {
            prop_assert!(trade.exit_bar > trade.entry_bar);
        }
    }

    #[test]
    fn runs_are_deterministic(returns in arb_returns(20..80)) {
        let series = series_from_returns(&returns);
        let sim = Simulation::new(small_trend(TradingMode::LongShort), BrokerSettings::default()).unwrap();
        let a = sim.run(&series, RunOrigin::Backtest);
        let b = sim.run(&series, RunOrigin::Backtest);
        prop_assert_eq!(a, b);
    }
}
