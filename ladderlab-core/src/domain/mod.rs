//! Domain types for LadderLab

pub mod ids;
pub mod ledger;
pub mod order;
pub mod sample;
pub mod strategy;
pub mod token;

pub use ids::{IdGen, OrderId, RunId, StrategyId, TargetId, TokenId, UserId};
pub use ledger::{CloseReason, EquityPoint, LedgerEntry, LedgerEvent};
pub use order::{realized_pnl, CloseOutcome, Order, OrderError, OrderStatus, Side};
pub use sample::{validate_series, PriceSample, SeriesError};
pub use strategy::{Direction, Strategy, Target};
pub use token::Token;
