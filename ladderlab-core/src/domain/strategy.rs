//! Strategies and ladder legs.

use super::ids::{StrategyId, TargetId, TokenId};
use super::order::Side;
use serde::{Deserialize, Serialize};

/// Side of a child strategy relative to its parent's resolved side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Same,
    Opposite,
}

impl Direction {
    pub fn resolve(self, parent_side: Side) -> Side {
        match self {
            Direction::Same => parent_side,
            Direction::Opposite => parent_side.inverted(),
        }
    }
}

/// A named ladder policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub id: StrategyId,
    pub name: String,
    /// Whole percent of available capital committed per new position.
    pub contribution_percent: f64,
    /// Entry side of a root strategy. Children resolve theirs via `direction`.
    #[serde(default = "default_side")]
    pub side: Side,
    #[serde(default)]
    pub direction: Direction,
    /// Force-close open positions at the last sample of each candle period.
    #[serde(default)]
    pub close_before_boundary: bool,
    #[serde(default)]
    pub parent_id: Option<StrategyId>,
    #[serde(default = "default_leverage")]
    pub leverage: f64,
}

fn default_side() -> Side {
    Side::Buy
}

fn default_leverage() -> f64 {
    1.0
}

impl Strategy {
    pub fn new(id: StrategyId, name: impl Into<String>, contribution_percent: f64) -> Self {
        Self {
            id,
            name: name.into(),
            contribution_percent,
            side: default_side(),
            direction: Direction::Same,
            close_before_boundary: false,
            parent_id: None,
            leverage: default_leverage(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Budget for a new position given the currently available capital.
    ///
    /// Never exceeds `available` for contributions up to 100%.
    pub fn budget_for(&self, available: f64) -> f64 {
        available * (self.contribution_percent / 100.0)
    }
}

/// One ladder leg.
///
/// Percentages are side-adjusted moves from the order's entry price: positive
/// is favorable for either side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: TargetId,
    pub strategy_id: StrategyId,
    /// `Some` for a token-scoped override; `None` for the strategy's default ladder.
    #[serde(default)]
    pub token_id: Option<TokenId>,
    pub target_percent: f64,
    pub stoploss_percent: f64,
}

impl Target {
    /// A stop at or above zero locks in profit rather than cutting a loss.
    pub fn is_profit_lock(&self) -> bool {
        self.stoploss_percent >= 0.0
    }
}
