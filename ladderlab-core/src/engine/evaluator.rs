//! Target ladder evaluator: a pure state machine over one open order.
//!
//! All percentages are side-adjusted moves from the ORIGINAL entry price;
//! legs are cumulative, never re-based on the price that triggered an advance.
//!
//! Check order per sample:
//! 1. Stop: adverse extreme (low for Buy, high for Sell) at or below the
//!    active leg's stop.
//! 2. Target: favorable extreme at or above the active leg's target.
//!
//! Stops are checked first (worst case when both touch in one bar).

use serde::{Deserialize, Serialize};

use crate::domain::{CloseOutcome, CloseReason, Order, PriceSample};
use crate::strategy::Ladder;

/// Touches within this many percentage points count as reached.
pub const PERCENT_EPSILON: f64 = 1e-9;

/// Result of evaluating one order against one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LegDecision {
    Hold,
    AdvanceLeg {
        next_leg: usize,
    },
    Close {
        outcome: CloseOutcome,
        price: f64,
        reason: CloseReason,
    },
}

impl LegDecision {
    /// Whether this decision is a ladder signal that wakes child strategies.
    pub fn is_signal(&self) -> bool {
        !matches!(self, LegDecision::Hold)
    }
}

/// Evaluate `order` at `sample` against its ladder.
///
/// Closed orders always `Hold`.
pub fn evaluate(order: &Order, ladder: &Ladder, sample: &PriceSample) -> LegDecision {
    if !order.is_active() {
        return LegDecision::Hold;
    }
    let leg = ladder.leg(order.active_leg);

    let close_move = order.move_percent(sample.price);
    let adverse_move = order.move_percent(sample.adverse_extreme(order.side));
    let favorable_move = order.move_percent(sample.favorable_extreme(order.side));

    if adverse_move <= leg.stoploss_percent + PERCENT_EPSILON {
        let price = if close_move <= leg.stoploss_percent + PERCENT_EPSILON {
            sample.price
        } else {
            order.price_at_percent(leg.stoploss_percent)
        };
        let outcome = if leg.is_profit_lock() {
            CloseOutcome::Finished
        } else {
            CloseOutcome::Expired
        };
        return LegDecision::Close {
            outcome,
            price,
            reason: CloseReason::StopLoss,
        };
    }

    if favorable_move >= leg.target_percent - PERCENT_EPSILON {
        return match ladder.next(order.active_leg) {
            Some(next_leg) => LegDecision::AdvanceLeg { next_leg },
            None => {
                let price = if close_move >= leg.target_percent - PERCENT_EPSILON {
                    sample.price
                } else {
                    order.price_at_percent(leg.target_percent)
                };
                LegDecision::Close {
                    outcome: CloseOutcome::Finished,
                    price,
                    reason: CloseReason::Target,
                }
            }
        };
    }

    LegDecision::Hold
}
