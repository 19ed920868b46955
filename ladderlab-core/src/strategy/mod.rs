//! Strategy loading: ladders, the strategy book, and per-run plans.
//!
//! Everything here runs before a simulation starts. A malformed strategy is
//! rejected with a `StrategyError`; nothing is coerced.

pub mod book;
pub mod ladder;

pub use book::{PlanNode, StrategyBook, StrategyPlan};
pub use ladder::Ladder;

use crate::domain::{StrategyId, TargetId, TokenId};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum StrategyError {
    #[error("strategy {strategy} has no ladder for token {token}")]
    EmptyLadder { strategy: StrategyId, token: TokenId },

    #[error("strategy {strategy} token {token}: target percent at leg {index} does not increase")]
    NonIncreasingTargets {
        strategy: StrategyId,
        token: TokenId,
        index: usize,
    },

    #[error("strategy {strategy} leg {index}: stop {stop}% is above target {target}%")]
    StopAboveTarget {
        strategy: StrategyId,
        index: usize,
        target: f64,
        stop: f64,
    },

    #[error("strategy {strategy} leg {index}: non-finite percentage")]
    NonFiniteLeg { strategy: StrategyId, index: usize },

    #[error("target {target} does not belong to strategy {strategy} on token {token}")]
    ForeignLeg {
        strategy: StrategyId,
        token: TokenId,
        target: TargetId,
    },

    #[error("unknown strategy {0}")]
    UnknownStrategy(StrategyId),

    #[error("strategy {strategy} references unknown parent {parent}")]
    UnknownParent {
        strategy: StrategyId,
        parent: StrategyId,
    },

    #[error("strategy {0} is part of a parent cycle")]
    ParentCycle(StrategyId),

    #[error("duplicate strategy id {0}")]
    DuplicateStrategy(StrategyId),

    #[error("duplicate token id {0}")]
    DuplicateToken(TokenId),

    #[error("target {target} references unknown strategy {strategy}")]
    OrphanTarget {
        target: TargetId,
        strategy: StrategyId,
    },

    #[error("strategy {strategy}: contribution {value}% must be positive and finite")]
    InvalidContribution { strategy: StrategyId, value: f64 },

    #[error("strategy {strategy}: leverage {leverage} exceeds cap {cap} of token {token}")]
    LeverageAboveCap {
        strategy: StrategyId,
        token: TokenId,
        leverage: f64,
        cap: f64,
    },

    #[error("strategy {strategy}: leverage {leverage} must be positive and finite")]
    InvalidLeverage { strategy: StrategyId, leverage: f64 },

    #[error("unknown token {0}")]
    UnknownToken(TokenId),

    #[error("token {0} is not active")]
    InactiveToken(TokenId),
}
