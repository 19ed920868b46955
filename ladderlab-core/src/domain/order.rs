//! Orders (positions) and their lifecycle.

use super::ids::{OrderId, StrategyId, TokenId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn inverted(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// +1 for Buy, -1 for Sell. Multiplying a raw price move by this makes
    /// favorable moves positive.
    pub fn sign(self) -> f64 {
        match self {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
        }
    }
}

/// Order lifecycle. `Active` may move to either terminal state, once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Active,
    /// Ladder walked to completion (or force-closed at a boundary); profit side.
    Finished,
    /// A loss boundary was breached before completion.
    Expired,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, OrderStatus::Active)
    }
}

/// Terminal outcome of a close decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloseOutcome {
    Finished,
    Expired,
}

impl From<CloseOutcome> for OrderStatus {
    fn from(outcome: CloseOutcome) -> Self {
        match outcome {
            CloseOutcome::Finished => OrderStatus::Finished,
            CloseOutcome::Expired => OrderStatus::Expired,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum OrderError {
    #[error("order {id} is already {status:?}")]
    AlreadyClosed { id: OrderId, status: OrderStatus },
    #[error("order {id}: leg pointer may only move forward ({from} -> {to})")]
    LegNotForward { id: OrderId, from: usize, to: usize },
}

/// Realized profit-or-loss of a round trip, net of fee.
///
/// The single formula used both when closing and when auditing a closed order,
/// so recomputation is bit-identical.
pub fn realized_pnl(side: Side, entry_price: f64, exit_price: f64, quantity: f64, fee: f64) -> f64 {
    let gross = match side {
        Side::Buy => (exit_price - entry_price) * quantity,
        Side::Sell => (entry_price - exit_price) * quantity,
    };
    gross - fee
}

/// An open or closed position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Owner of a live order. Simulated orders have none.
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub strategy_id: StrategyId,
    pub token_id: TokenId,
    pub side: Side,
    pub entry_price: f64,
    pub quantity: f64,
    /// Capital committed while the order is open.
    pub budget: f64,
    pub leverage: f64,
    /// Total fee charged on the round trip (set on close).
    pub fee: f64,
    /// Index into the strategy+token ladder.
    pub active_leg: usize,
    pub mark_price: f64,
    #[serde(default)]
    pub exit_price: Option<f64>,
    pub net_profit: f64,
    pub status: OrderStatus,
    pub opened_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub closed_at: Option<i64>,
}

impl Order {
    /// Open a position sized from `budget × leverage / entry_price`.
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        id: OrderId,
        strategy_id: StrategyId,
        token_id: TokenId,
        side: Side,
        entry_price: f64,
        budget: f64,
        leverage: f64,
        timestamp: i64,
    ) -> Self {
        Self {
            id,
            user_id: None,
            strategy_id,
            token_id,
            side,
            entry_price,
            quantity: budget * leverage / entry_price,
            budget,
            leverage,
            fee: 0.0,
            active_leg: 0,
            mark_price: entry_price,
            exit_price: None,
            net_profit: 0.0,
            status: OrderStatus::Active,
            opened_at: timestamp,
            updated_at: timestamp,
            closed_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == OrderStatus::Active
    }

    /// Side-adjusted percentage move of `price` from the entry price.
    pub fn move_percent(&self, price: f64) -> f64 {
        (price - self.entry_price) / self.entry_price * 100.0 * self.side.sign()
    }

    /// Price at which the side-adjusted move equals `percent`.
    pub fn price_at_percent(&self, percent: f64) -> f64 {
        self.entry_price * (1.0 + self.side.sign() * percent / 100.0)
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        realized_pnl(self.side, self.entry_price, price, self.quantity, 0.0)
    }

    /// Update the mark price of an open order.
    pub fn mark(&mut self, price: f64, timestamp: i64) {
        if self.is_active() {
            self.mark_price = price;
            self.updated_at = timestamp;
        }
    }

    /// Move the leg pointer forward.
    pub fn advance_to(&mut self, leg: usize, timestamp: i64) -> Result<(), OrderError> {
        self.ensure_active()?;
        if leg <= self.active_leg {
            return Err(OrderError::LegNotForward {
                id: self.id,
                from: self.active_leg,
                to: leg,
            });
        }
        self.active_leg = leg;
        self.updated_at = timestamp;
        Ok(())
    }

    /// Close the order, realizing P&L. Returns the net profit.
    pub fn close(
        &mut self,
        outcome: CloseOutcome,
        exit_price: f64,
        fee: f64,
        timestamp: i64,
    ) -> Result<f64, OrderError> {
        self.ensure_active()?;
        self.fee = fee;
        self.exit_price = Some(exit_price);
        self.mark_price = exit_price;
        self.net_profit = realized_pnl(self.side, self.entry_price, exit_price, self.quantity, fee);
        self.status = outcome.into();
        self.updated_at = timestamp;
        self.closed_at = Some(timestamp);
        Ok(self.net_profit)
    }

    /// Recompute net profit from the stored round-trip fields.
    ///
    /// `None` while the order is open.
    pub fn recompute_net_profit(&self) -> Option<f64> {
        self.exit_price
            .map(|exit| realized_pnl(self.side, self.entry_price, exit, self.quantity, self.fee))
    }

    /// Timestamp used for settlement windowing: close time when recorded,
    /// otherwise the last update.
    pub fn settled_at(&self) -> i64 {
        self.closed_at.unwrap_or(self.updated_at)
    }

    fn ensure_active(&self) -> Result<(), OrderError> {
        if self.status.is_terminal() {
            return Err(OrderError::AlreadyClosed {
                id: self.id,
                status: self.status,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buy_order() -> Order {
        Order::open(
            OrderId(1),
            StrategyId(1),
            TokenId(1),
            Side::Buy,
            100.0,
            1_000.0,
            1.0,
            0,
        )
    }

    #[test]
    fn quantity_from_budget_and_leverage() {
        let mut o = buy_order();
        assert_eq!(o.quantity, 10.0);
        o = Order::open(OrderId(2), StrategyId(1), TokenId(1), Side::Sell, 50.0, 1_000.0, 3.0, 0);
        assert_eq!(o.quantity, 60.0);
    }

    #[test]
    fn move_percent_is_side_adjusted() {
        let buy = buy_order();
        assert!((buy.move_percent(101.0) - 1.0).abs() < 1e-12);
        let mut sell = buy_order();
        sell.side = Side::Sell;
        assert!((sell.move_percent(99.0) - 1.0).abs() < 1e-12);
        assert!((sell.price_at_percent(-2.0) - 102.0).abs() < 1e-12);
    }

    #[test]
    fn close_realizes_pnl_and_is_terminal() {
        let mut o = buy_order();
        let pnl = o.close(CloseOutcome::Finished, 110.0, 2.0, 5).unwrap();
        assert_eq!(pnl, 98.0);
        assert_eq!(o.status, OrderStatus::Finished);
        assert_eq!(o.closed_at, Some(5));
        assert_eq!(o.recompute_net_profit(), Some(o.net_profit));

        let again = o.close(CloseOutcome::Expired, 90.0, 0.0, 6);
        assert_eq!(
            again,
            Err(OrderError::AlreadyClosed {
                id: OrderId(1),
                status: OrderStatus::Finished
            })
        );
        assert_eq!(o.status, OrderStatus::Finished);
    }

    #[test]
    fn sell_pnl_is_inverted() {
        assert_eq!(realized_pnl(Side::Sell, 100.0, 90.0, 2.0, 1.0), 19.0);
        assert_eq!(realized_pnl(Side::Buy, 100.0, 90.0, 2.0, 1.0), -21.0);
    }

    #[test]
    fn leg_pointer_only_moves_forward() {
        let mut o = buy_order();
        o.advance_to(1, 1).unwrap();
        assert!(o.advance_to(1, 2).is_err());
        o.close(CloseOutcome::Expired, 95.0, 0.0, 3).unwrap();
        assert!(matches!(o.advance_to(2, 4), Err(OrderError::AlreadyClosed { .. })));
    }

    #[test]
    fn settled_at_falls_back_to_last_update() {
        let mut o = buy_order();
        o.mark(101.0, 42);
        assert_eq!(o.settled_at(), 42);
    }
}
