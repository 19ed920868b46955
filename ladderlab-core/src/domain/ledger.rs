//! Trade ledger entries and equity curve points.

use super::ids::{OrderId, StrategyId};
use super::order::{CloseOutcome, Side};
use serde::{Deserialize, Serialize};

/// Why a position closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// Last leg's target reached.
    Target,
    /// Active leg's stop breached.
    StopLoss,
    /// Forced close at a candle-period boundary.
    Boundary,
}

/// What happened to the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerEvent {
    Advance { leg: usize },
    Close { outcome: CloseOutcome, reason: CloseReason },
}

/// Immutable record emitted each time an order advances or closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Position in the ledger, starting at 0.
    pub seq: u64,
    pub timestamp: i64,
    pub order_id: OrderId,
    pub strategy_id: StrategyId,
    pub side: Side,
    pub event: LedgerEvent,
    pub price: f64,
    pub quantity: f64,
    pub entry_price: f64,
    /// Capital committed to the order.
    pub budget: f64,
    /// Realized P&L; present on closing events only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pnl: Option<f64>,
}

impl LedgerEntry {
    pub fn is_close(&self) -> bool {
        matches!(self.event, LedgerEvent::Close { .. })
    }

    /// Return on committed budget for closing events.
    pub fn return_on_budget(&self) -> Option<f64> {
        match self.pnl {
            Some(pnl) if self.budget > 0.0 => Some(pnl / self.budget),
            _ => None,
        }
    }
}

/// Running capital after a ledger event.
///
/// `equity == available + committed` at every point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: i64,
    /// Initial capital plus all P&L realized so far.
    pub equity: f64,
    /// Capital free to fund new positions.
    pub available: f64,
    /// Sum of budgets of currently open positions.
    pub committed: f64,
}
