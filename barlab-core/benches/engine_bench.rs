//! Criterion benchmarks for BarLab hot paths.
//!
//! Benchmarks:
//! 1. Indicator precompute (single SMA and the full trend-family stack)
//! 2. Full simulation run per rule family
//! 3. Broker fill cycle (enter, add, exit)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use barlab_core::config::{BrokerSettings, StrategyConfig};
use barlab_core::domain::{Bar, BarSeries, ExitReason, PositionSide};
use barlab_core::engine::{Broker, RunOrigin, Simulation};
use barlab_core::indicators::{IndicatorEngine, IndicatorSpec};
use barlab_core::strategy::StrategyEngine;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_series(n: usize) -> BarSeries {
    let base_date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    let bars = (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0 + i as f64 * 0.01;
            Bar::new(
                base_date + chrono::Duration::days(i as i64),
                close - 0.3,
                close + 1.5,
                close - 1.5,
                close,
                1_000_000 + (i as u64 % 500_000),
            )
        })
        .collect();
    BarSeries::new(bars).unwrap()
}

// ── 1. Indicators ────────────────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicator_precompute");

    for &bar_count in &[252, 1260, 2520] {
        let series = make_series(bar_count);

        let sma = IndicatorEngine::new([IndicatorSpec::Sma { period: 20 }]);
        group.bench_with_input(BenchmarkId::new("sma_20", bar_count), &series, |b, s| {
            b.iter(|| black_box(sma.precompute(black_box(s))))
        });

        let stack = StrategyEngine::new(StrategyConfig::trend_momentum())
            .unwrap()
            .indicator_engine();
        group.bench_with_input(
            BenchmarkId::new("trend_stack", bar_count),
            &series,
            |b, s| b.iter(|| black_box(stack.precompute(black_box(s)))),
        );
    }

    group.finish();
}

// ── 2. Simulation ────────────────────────────────────────────────────

fn bench_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation_run");
    let series = make_series(1260);

    let families = [
        ("trend_momentum", StrategyConfig::trend_momentum()),
        ("support_resistance", StrategyConfig::support_resistance()),
        ("channel_breakout", StrategyConfig::channel_breakout()),
    ];
    for (name, config) in families {
        let sim = Simulation::new(config, BrokerSettings::default()).unwrap();
        group.bench_function(format!("{name}_1260_bars"), |b| {
            b.iter(|| black_box(sim.run(black_box(&series), RunOrigin::Backtest).unwrap()))
        });
    }

    group.finish();
}

// ── 3. Broker ────────────────────────────────────────────────────────

fn bench_broker(c: &mut Criterion) {
    let mut group = c.benchmark_group("broker");
    let date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    let settings = BrokerSettings::default();

    group.bench_function("round_trip_100", |b| {
        b.iter(|| {
            let mut broker = Broker::new(&settings);
            for i in 0..100 {
                let bar = i * 3;
                broker.enter(PositionSide::Long, 100, bar, date, 100.0).unwrap();
                broker.add(50, bar + 1, 101.0).unwrap();
                black_box(
                    broker
                        .exit(ExitReason::Timeout, bar + 2, date, 102.0)
                        .unwrap(),
                );
            }
            black_box(broker.cash())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_indicators, bench_simulation, bench_broker);
criterion_main!(benches);
