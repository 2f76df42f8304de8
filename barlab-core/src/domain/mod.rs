//! Domain types for BarLab

pub mod bar;
pub mod position;
pub mod series;
pub mod trade;

pub use bar::{Bar, BarError};
pub use position::{Position, PositionSide};
pub use series::{BarSeries, DataError};
pub use trade::{ExitReason, TradeRecord};
