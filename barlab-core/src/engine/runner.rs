//! Bar-by-bar simulation loop.
//!
//! For every bar, in order:
//! 1. Read the indicator snapshot (precomputed once per run)
//! 2. Ask the strategy for an action, given the position and tier state
//! 3. Fill the action at the bar's close through the broker
//! 4. Record the mark-to-market equity sample
//!
//! No bar is skipped or reordered.

use thiserror::Error;

use super::broker::{Broker, SimulationError};
use super::result::{EquitySample, RunOrigin, RunResult};
use crate::config::{BrokerSettings, ConfigError, StrategyConfig};
use crate::domain::BarSeries;
use crate::strategy::{Action, DecisionContext, StrategyEngine, StrategyState};

/// Errors from a one-shot backtest.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("simulation failed: {0}")]
    Simulation(#[from] SimulationError),
}

/// A validated (strategy, broker settings) pair, reusable across series.
#[derive(Debug)]
pub struct Simulation {
    strategy: StrategyEngine,
    settings: BrokerSettings,
}

impl Simulation {
    pub fn new(config: StrategyConfig, settings: BrokerSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            strategy: StrategyEngine::new(config)?,
            settings,
        })
    }

    pub fn strategy(&self) -> &StrategyEngine {
        &self.strategy
    }

    pub fn settings(&self) -> &BrokerSettings {
        &self.settings
    }

    /// Run the strategy over `series`.
    pub fn run(&self, series: &BarSeries, origin: RunOrigin) -> Result<RunResult, SimulationError> {
        let values = self.strategy.indicator_engine().precompute(series);
        let mut broker = Broker::new(&self.settings);
        let mut state = StrategyState::default();
        let mut equity_curve = Vec::with_capacity(series.len());
        let mut trades = Vec::new();

        for (index, bar) in series.iter().enumerate() {
            let ctx = DecisionContext {
                bar,
                index,
                previous_bar: index.checked_sub(1).map(|i| &series[i]),
                snapshot: values.snapshot(index),
                position: broker.position(),
                state,
                cash: broker.cash(),
                commission_rate: broker.commission_rate(),
            };
            let action = self.strategy.decide(&ctx);

            if action != Action::Hold {
                if let Some(trade) = broker.apply(&action, index, bar)? {
                    trades.push(trade);
                }
                state = state.apply(&action, index);
            }

            let position = broker.position();
            equity_curve.push(EquitySample {
                date: bar.date,
                cash: broker.cash(),
                side: position.side,
                quantity: position.quantity,
                equity: broker.equity(bar.close),
            });
        }

        let final_equity = equity_curve
            .last()
            .map_or(self.settings.initial_cash, |s| s.equity);
        let open_position = (!broker.position().is_flat()).then(|| broker.position().clone());

        Ok(RunResult {
            origin,
            final_equity,
            initial_cash: self.settings.initial_cash,
            equity_curve,
            trades,
            open_position,
            commission_paid: broker.commission_paid(),
            bar_count: series.len(),
        })
    }
}

/// Validate and run a single backtest.
pub fn run_backtest(
    series: &BarSeries,
    config: &StrategyConfig,
    settings: &BrokerSettings,
) -> Result<RunResult, EngineError> {
    let simulation = Simulation::new(config.clone(), *settings)?;
    Ok(simulation.run(series, RunOrigin::Backtest)?)
}
