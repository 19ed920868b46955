//! Bills and claims.

use std::fmt;

use serde::{Deserialize, Serialize};

use ladderlab_core::domain::{OrderId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BillId(pub u64);

impl fmt::Display for BillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimId(pub u64);

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bill lifecycle: `New → Processing → Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    New,
    Processing,
    Completed,
}

impl BillStatus {
    pub fn valid_transitions(self) -> &'static [BillStatus] {
        match self {
            BillStatus::New => &[BillStatus::Processing],
            BillStatus::Processing => &[BillStatus::Completed],
            BillStatus::Completed => &[],
        }
    }

    pub fn can_transition_to(self, target: BillStatus) -> bool {
        self.valid_transitions().contains(&target)
    }
}

/// Claim lifecycle: `New → Processing → Finished | Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    New,
    Processing,
    Finished,
    Rejected,
}

impl ClaimStatus {
    pub fn valid_transitions(self) -> &'static [ClaimStatus] {
        match self {
            ClaimStatus::New => &[ClaimStatus::Processing],
            ClaimStatus::Processing => &[ClaimStatus::Finished, ClaimStatus::Rejected],
            ClaimStatus::Finished | ClaimStatus::Rejected => &[],
        }
    }

    pub fn can_transition_to(self, target: ClaimStatus) -> bool {
        self.valid_transitions().contains(&target)
    }
}

/// A settlement window's worth of one user's closed orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: BillId,
    pub user_id: UserId,
    /// Inclusive window bounds, epoch ms.
    pub window_start: i64,
    pub window_end: i64,
    pub order_ids: Vec<OrderId>,
    /// Sum of the attached orders' net profit.
    pub net_profit: f64,
    /// Commission on the profitable orders; not deducted from `net_profit`.
    pub commission: f64,
    /// Rates as given at settlement time.
    pub admin_commission: f64,
    pub referral_commission: f64,
    pub status: BillStatus,
    #[serde(default)]
    pub claim_id: Option<ClaimId>,
}

/// A payout request grouping one user's bills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub id: ClaimId,
    pub user_id: UserId,
    pub bill_ids: Vec<BillId>,
    /// Sum of the attached bills' net profit.
    pub amount: f64,
    pub status: ClaimStatus,
}

impl Claim {
    pub fn new(id: ClaimId, user_id: UserId) -> Self {
        Self {
            id,
            user_id,
            bill_ids: Vec::new(),
            amount: 0.0,
            status: ClaimStatus::New,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == ClaimStatus::New
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bill_transitions_are_linear() {
        assert!(BillStatus::New.can_transition_to(BillStatus::Processing));
        assert!(BillStatus::Processing.can_transition_to(BillStatus::Completed));
        assert!(!BillStatus::New.can_transition_to(BillStatus::Completed));
        assert!(!BillStatus::Completed.can_transition_to(BillStatus::New));
    }

    #[test]
    fn claim_terminal_states_are_final() {
        assert!(ClaimStatus::Processing.can_transition_to(ClaimStatus::Rejected));
        assert!(ClaimStatus::Processing.can_transition_to(ClaimStatus::Finished));
        assert!(!ClaimStatus::New.can_transition_to(ClaimStatus::Finished));
        for terminal in [ClaimStatus::Finished, ClaimStatus::Rejected] {
            assert!(terminal.valid_transitions().is_empty());
        }
    }

    #[test]
    fn bill_serializes_camel_case() {
        let bill = Bill {
            id: BillId(1),
            user_id: UserId(9),
            window_start: 0,
            window_end: 10,
            order_ids: vec![OrderId(3)],
            net_profit: 12.5,
            commission: 3.75,
            admin_commission: 30.0,
            referral_commission: 0.0,
            status: BillStatus::New,
            claim_id: Some(ClaimId(2)),
        };
        let json = serde_json::to_value(&bill).unwrap();
        assert_eq!(json["netProfit"], 12.5);
        assert_eq!(json["orderIds"][0], 3);
        assert_eq!(json["status"], "new");
        assert_eq!(json["claimId"], 2);
    }
}
