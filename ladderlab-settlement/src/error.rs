use thiserror::Error;

use ladderlab_core::domain::{OrderId, OrderStatus, UserId};

use crate::model::{BillId, BillStatus, ClaimId, ClaimStatus};

/// Errors from the settlement aggregator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SettlementError {
    #[error("order {0} has no user and cannot be settled")]
    MissingUser(OrderId),

    #[error("order {order} is still {status:?}")]
    OrderNotClosed { order: OrderId, status: OrderStatus },

    /// A billed order was resubmitted with different contents.
    #[error("order {order} is already on bill {bill} and differs from the stored copy")]
    OrderChanged { order: OrderId, bill: BillId },

    #[error("bill {id} is {status:?}; only new bills are recomputed")]
    BillLocked { id: BillId, status: BillStatus },

    #[error("unknown bill {0}")]
    UnknownBill(BillId),

    #[error("unknown claim {0}")]
    UnknownClaim(ClaimId),

    #[error("invalid bill transition for {id}: {from:?} -> {to:?}")]
    InvalidBillTransition {
        id: BillId,
        from: BillStatus,
        to: BillStatus,
    },

    #[error("invalid claim transition for {id}: {from:?} -> {to:?}")]
    InvalidClaimTransition {
        id: ClaimId,
        from: ClaimStatus,
        to: ClaimStatus,
    },

    /// Bills can only be attached to or detached from a `New` claim.
    #[error("claim {id} is {status:?}; bills can only move on a new claim")]
    ClaimLocked { id: ClaimId, status: ClaimStatus },

    #[error("bill {bill} is already attached to claim {claim}")]
    BillAlreadyClaimed { bill: BillId, claim: ClaimId },

    #[error("bill {0} is not attached to a claim")]
    BillNotClaimed(BillId),

    #[error("bill {bill} belongs to user {bill_user}, claim {claim} to user {claim_user}")]
    UserMismatch {
        bill: BillId,
        bill_user: UserId,
        claim: ClaimId,
        claim_user: UserId,
    },

    #[error("invalid settlement config: {0}")]
    Config(String),
}
