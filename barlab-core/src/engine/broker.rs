//! Broker: cash, the single position, commission and realized PnL.
//!
//! All fills happen at the price handed in by the runner (the deciding bar's
//! close). Commission is proportional: buys pay `price * qty * (1 + c)`, sells
//! and short sales receive `price * qty * (1 - c)`.

use chrono::NaiveDate;
use thiserror::Error;

use crate::config::BrokerSettings;
use crate::domain::{Bar, ExitReason, Position, PositionSide, TradeRecord};
use crate::strategy::Action;

/// Floating-point slack allowed below zero cash before it counts as a breach.
const CASH_TOLERANCE: f64 = 1e-6;

/// Broker invariant violations. Fatal to the affected run only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("cash would go negative at bar {bar}: {cash:.2}")]
    NegativeCash { bar: usize, cash: f64 },
    #[error("entry requested at bar {bar} while a position is open")]
    NotFlat { bar: usize },
    #[error("{action} requested at bar {bar} with no open position")]
    NoPosition { bar: usize, action: &'static str },
    #[error("zero-quantity order at bar {bar}")]
    ZeroQuantity { bar: usize },
    #[error("non-positive fill price {price} at bar {bar}")]
    InvalidPrice { bar: usize, price: f64 },
}

#[derive(Debug, Clone)]
pub struct Broker {
    initial_cash: f64,
    cash: f64,
    commission_rate: f64,
    position: Position,
    entry_date: Option<NaiveDate>,
    /// Commission paid so far on the open round trip.
    open_commission: f64,
    commission_paid: f64,
    realized_pnl: f64,
}

impl Broker {
    pub fn new(settings: &BrokerSettings) -> Self {
        Self {
            initial_cash: settings.initial_cash,
            cash: settings.initial_cash,
            commission_rate: settings.commission_rate,
            position: Position::flat(),
            entry_date: None,
            open_commission: 0.0,
            commission_paid: 0.0,
            realized_pnl: 0.0,
        }
    }

    /// Apply a strategy action filled at `bar.close`. Returns the trade record
    /// when the action closes a position.
    pub fn apply(
        &mut self,
        action: &Action,
        index: usize,
        bar: &Bar,
    ) -> Result<Option<TradeRecord>, SimulationError> {
        match *action {
            Action::Hold => Ok(None),
            Action::EnterLong(qty) => self
                .enter(PositionSide::Long, qty, index, bar.date, bar.close)
                .map(|_| None),
            Action::EnterShort(qty) => self
                .enter(PositionSide::Short, qty, index, bar.date, bar.close)
                .map(|_| None),
            Action::Add(qty) => self.add(qty, index, bar.close).map(|_| None),
            Action::Exit(reason) => self.exit(reason, index, bar.date, bar.close).map(Some),
        }
    }

    /// Open a new position from flat.
    pub fn enter(
        &mut self,
        side: PositionSide,
        qty: u64,
        bar: usize,
        date: NaiveDate,
        price: f64,
    ) -> Result<(), SimulationError> {
        if !self.position.is_flat() {
            return Err(SimulationError::NotFlat { bar });
        }
        self.check_order(qty, price, bar)?;

        let cash_after = self.cash + self.cash_flow(side, qty, price);
        self.check_cash(cash_after, bar)?;
        self.cash = cash_after;

        let commission = self.commission(qty, price);
        self.open_commission = commission;
        self.commission_paid += commission;
        self.entry_date = Some(date);
        self.position = match side {
            PositionSide::Short => Position::new_short(qty, price, bar),
            _ => Position::new_long(qty, price, bar),
        };
        Ok(())
    }

    /// Increase the open position in its current direction. The entry price
    /// becomes the quantity-weighted average; the entry bar is unchanged.
    pub fn add(&mut self, qty: u64, bar: usize, price: f64) -> Result<(), SimulationError> {
        if self.position.is_flat() {
            return Err(SimulationError::NoPosition { bar, action: "add" });
        }
        self.check_order(qty, price, bar)?;

        let cash_after = self.cash + self.cash_flow(self.position.side, qty, price);
        self.check_cash(cash_after, bar)?;
        self.cash = cash_after;

        let commission = self.commission(qty, price);
        self.open_commission += commission;
        self.commission_paid += commission;

        let old_qty = self.position.quantity as f64;
        let total = self.position.quantity + qty;
        self.position.entry_price =
            (old_qty * self.position.entry_price + qty as f64 * price) / total as f64;
        self.position.quantity = total;
        Ok(())
    }

    /// Close the whole position and emit its trade record.
    pub fn exit(
        &mut self,
        reason: ExitReason,
        bar: usize,
        date: NaiveDate,
        price: f64,
    ) -> Result<TradeRecord, SimulationError> {
        if self.position.is_flat() {
            return Err(SimulationError::NoPosition { bar, action: "exit" });
        }
        if !(price > 0.0 && price.is_finite()) {
            return Err(SimulationError::InvalidPrice { bar, price });
        }

        let side = self.position.side;
        let qty = self.position.quantity;
        let closing_side = match side {
            PositionSide::Long => PositionSide::Short,
            _ => PositionSide::Long,
        };
        let cash_after = self.cash + self.cash_flow(closing_side, qty, price);
        self.check_cash(cash_after, bar)?;
        self.cash = cash_after;

        let exit_commission = self.commission(qty, price);
        self.commission_paid += exit_commission;
        let commission = self.open_commission + exit_commission;

        let gross_pnl = (price - self.position.entry_price) * qty as f64 * side.sign();
        let net_pnl = gross_pnl - commission;
        self.realized_pnl += net_pnl;

        let trade = TradeRecord {
            side,
            entry_bar: self.position.entry_bar,
            entry_date: self.entry_date.unwrap_or(date),
            entry_price: self.position.entry_price,
            exit_bar: bar,
            exit_date: date,
            exit_price: price,
            exit_reason: reason,
            quantity: qty,
            gross_pnl,
            commission,
            net_pnl,
            bars_held: self.position.bars_held(bar),
        };

        self.position = Position::flat();
        self.entry_date = None;
        self.open_commission = 0.0;
        Ok(trade)
    }

    /// Mark-to-market equity: cash + signed quantity * price.
    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.position.market_value(price)
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.position.unrealized_pnl(price)
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn commission_rate(&self) -> f64 {
        self.commission_rate
    }

    pub fn commission_paid(&self) -> f64 {
        self.commission_paid
    }

    /// Net PnL of all closed trades.
    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    // ─── Helpers ───

    fn commission(&self, qty: u64, price: f64) -> f64 {
        price * qty as f64 * self.commission_rate
    }

    /// Cash change of a fill that buys (`Long`) or sells (`Short`) `qty`.
    fn cash_flow(&self, direction: PositionSide, qty: u64, price: f64) -> f64 {
        let notional = price * qty as f64;
        match direction {
            PositionSide::Long => -notional * (1.0 + self.commission_rate),
            PositionSide::Short => notional * (1.0 - self.commission_rate),
            PositionSide::Flat => 0.0,
        }
    }

    fn check_order(&self, qty: u64, price: f64, bar: usize) -> Result<(), SimulationError> {
        if qty == 0 {
            return Err(SimulationError::ZeroQuantity { bar });
        }
        if !(price > 0.0 && price.is_finite()) {
            return Err(SimulationError::InvalidPrice { bar, price });
        }
        Ok(())
    }

    fn check_cash(&self, cash: f64, bar: usize) -> Result<(), SimulationError> {
        if cash < -CASH_TOLERANCE {
            return Err(SimulationError::NegativeCash { bar, cash });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn broker(cash: f64, commission_rate: f64) -> Broker {
        Broker::new(&BrokerSettings {
            initial_cash: cash,
            commission_rate,
        })
    }

    #[test]
    fn long_round_trip() {
        let mut b = broker(10_000.0, 0.001);
        b.enter(PositionSide::Long, 10, 0, date(2), 100.0).unwrap();
        assert!((b.cash() - (10_000.0 - 1000.0 * 1.001)).abs() < 1e-9);
        assert!((b.equity(100.0) - (10_000.0 - 1.0)).abs() < 1e-9);

        let trade = b.exit(ExitReason::TakeProfit, 4, date(8), 110.0).unwrap();
        assert_eq!(trade.side, PositionSide::Long);
        assert_eq!(trade.bars_held, 4);
        assert!((trade.gross_pnl - 100.0).abs() < 1e-9);
        assert!((trade.commission - 2.1).abs() < 1e-9);
        assert!((trade.net_pnl - 97.9).abs() < 1e-9);
        assert!(b.position().is_flat());
        assert!((b.cash() - (10_000.0 + 97.9)).abs() < 1e-9);
        assert!((b.realized_pnl() - 97.9).abs() < 1e-9);
    }

    #[test]
    fn short_round_trip() {
        let mut b = broker(10_000.0, 0.0);
        b.enter(PositionSide::Short, 10, 0, date(2), 100.0).unwrap();
        assert_eq!(b.cash(), 11_000.0);
        assert_eq!(b.equity(100.0), 10_000.0);
        assert_eq!(b.equity(90.0), 10_100.0);
        assert_eq!(b.unrealized_pnl(90.0), 100.0);

        let trade = b.exit(ExitReason::Fade, 3, date(5), 90.0).unwrap();
        assert_eq!(trade.gross_pnl, 100.0);
        assert_eq!(b.cash(), 10_100.0);
    }

    #[test]
    fn add_reweights_entry_price() {
        let mut b = broker(100_000.0, 0.0);
        b.enter(PositionSide::Long, 100, 3, date(2), 10.0).unwrap();
        b.add(300, 5, 20.0).unwrap();
        let pos = b.position();
        assert_eq!(pos.quantity, 400);
        assert!((pos.entry_price - 17.5).abs() < 1e-12);
        assert_eq!(pos.entry_bar, 3);
    }

    #[test]
    fn add_commission_counts_toward_trade() {
        let mut b = broker(100_000.0, 0.01);
        b.enter(PositionSide::Long, 10, 0, date(2), 100.0).unwrap();
        b.add(10, 1, 100.0).unwrap();
        let trade = b.exit(ExitReason::Timeout, 2, date(4), 100.0).unwrap();
        // 10 + 10 on entry fills, 20 on exit
        assert!((trade.commission - 40.0).abs() < 1e-9);
        assert!((b.commission_paid() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_malformed_sequences() {
        let mut b = broker(10_000.0, 0.0);
        assert_eq!(
            b.exit(ExitReason::Fade, 0, date(2), 100.0),
            Err(SimulationError::NoPosition {
                bar: 0,
                action: "exit"
            })
        );
        assert!(matches!(
            b.add(1, 0, 100.0),
            Err(SimulationError::NoPosition { .. })
        ));
        assert_eq!(
            b.enter(PositionSide::Long, 0, 0, date(2), 100.0),
            Err(SimulationError::ZeroQuantity { bar: 0 })
        );
        b.enter(PositionSide::Long, 1, 0, date(2), 100.0).unwrap();
        assert_eq!(
            b.enter(PositionSide::Long, 1, 1, date(3), 100.0),
            Err(SimulationError::NotFlat { bar: 1 })
        );
    }

    #[test]
    fn overspending_is_an_error() {
        let mut b = broker(1_000.0, 0.0);
        let err = b
            .enter(PositionSide::Long, 11, 0, date(2), 100.0)
            .unwrap_err();
        assert!(matches!(err, SimulationError::NegativeCash { bar: 0, .. }));
        // State untouched after a rejected fill.
        assert_eq!(b.cash(), 1_000.0);
        assert!(b.position().is_flat());
    }

    #[test]
    fn apply_dispatches_actions() {
        let mut b = broker(10_000.0, 0.0);
        let bar = Bar::flat(date(2), 50.0, 100);
        assert_eq!(b.apply(&Action::Hold, 0, &bar).unwrap(), None);
        assert_eq!(b.apply(&Action::EnterShort(4), 0, &bar).unwrap(), None);
        assert!(b.position().is_short());
        let exit_bar = Bar::flat(date(3), 40.0, 100);
        let trade = b
            .apply(&Action::Exit(ExitReason::StopLoss), 1, &exit_bar)
            .unwrap()
            .unwrap();
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert_eq!(trade.gross_pnl, 40.0);
        assert_eq!(trade.entry_date, date(2));
    }
}
