//! Settlement aggregator.
//!
//! Each closed live order is handled under its user's lock: an order already
//! billed is a no-op; otherwise it joins the user's open Bill whose window
//! covers its close, or starts a new Bill windowed around it. A new Bill
//! joins the user's open Claim, or a fresh one. Bills and claims past `New`
//! are never rewritten.
//!
//! All writes for a user go through that user's mutex, so bill and claim
//! totals are always recomputed from a consistent view. Different users
//! settle in parallel.

use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use ladderlab_core::domain::{Order, UserId};
use ladderlab_core::engine::DAY_MS;

use crate::commission::{bill_totals, CommissionRates};
use crate::error::SettlementError;
use crate::model::{Bill, BillId, BillStatus, Claim, ClaimId, ClaimStatus};
use crate::store::SettlementStore;

/// Window around an order's close time, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SettlementConfig {
    pub window_before_ms: i64,
    pub window_after_ms: i64,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self::from_days(2, 1)
    }
}

impl SettlementConfig {
    pub fn from_days(before: i64, after: i64) -> Self {
        Self {
            window_before_ms: before * DAY_MS,
            window_after_ms: after * DAY_MS,
        }
    }

    pub fn validate(&self) -> Result<(), SettlementError> {
        if self.window_before_ms < 0 || self.window_after_ms < 0 {
            return Err(SettlementError::Config(
                "settlement window bounds must be non-negative".into(),
            ));
        }
        Ok(())
    }

    /// Inclusive `[close - before, close + after]`.
    pub fn window(&self, close_ms: i64) -> (i64, i64) {
        (
            close_ms.saturating_sub(self.window_before_ms),
            close_ms.saturating_add(self.window_after_ms),
        )
    }
}

/// Result of settling one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SettlementOutcome {
    /// The order is on `bill`, either newly created or an open bill it joined.
    Attached { bill: Bill, claim: Claim },
    /// The order was already on a bill; nothing new was created.
    AlreadySettled { bill_id: BillId },
}

pub struct SettlementAggregator<S> {
    store: S,
    config: SettlementConfig,
    locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl<S: SettlementStore> SettlementAggregator<S> {
    pub fn new(store: S, config: SettlementConfig) -> Result<Self, SettlementError> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            locks: DashMap::new(),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    /// Settle one closed live order.
    ///
    /// An order already on a bill is a no-op, provided the incoming copy
    /// matches the stored one. Otherwise the order joins the user's `New`
    /// bill whose window covers its close, or starts a new bill windowed
    /// around it. Either way every other unbilled closed order of the user
    /// inside that window is swept in too.
    pub fn settle(
        &self,
        order: &Order,
        rates: &CommissionRates,
    ) -> Result<SettlementOutcome, SettlementError> {
        let user = order.user_id.ok_or(SettlementError::MissingUser(order.id))?;
        if order.is_active() {
            return Err(SettlementError::OrderNotClosed {
                order: order.id,
                status: order.status,
            });
        }
        rates.validate()?;

        let lock = self.user_lock(user);
        let _guard = acquire(&lock);

        if let Some(bill_id) = self.store.bill_of_order(order.id) {
            if self.store.order(order.id).is_some_and(|stored| stored != *order) {
                return Err(SettlementError::OrderChanged {
                    order: order.id,
                    bill: bill_id,
                });
            }
            debug!(order = %order.id, bill = %bill_id, "order already settled");
            return Ok(SettlementOutcome::AlreadySettled { bill_id });
        }

        self.store.upsert_order(order.clone());
        let settled_at = order.settled_at();

        let (mut bill, joined) = match self.open_bill_covering(user, settled_at) {
            Some(bill) => (bill, true),
            None => {
                let (window_start, window_end) = self.config.window(settled_at);
                let bill = Bill {
                    id: self.store.next_bill_id(),
                    user_id: user,
                    window_start,
                    window_end,
                    order_ids: Vec::new(),
                    net_profit: 0.0,
                    commission: 0.0,
                    admin_commission: rates.admin,
                    referral_commission: rates.referral,
                    status: BillStatus::New,
                    claim_id: None,
                };
                (bill, false)
            }
        };

        let swept: Vec<_> = self
            .store
            .orders_for_user(user)
            .into_iter()
            .filter(|o| !o.is_active())
            .filter(|o| (bill.window_start..=bill.window_end).contains(&o.settled_at()))
            .filter(|o| self.store.bill_of_order(o.id).is_none())
            .map(|o| o.id)
            .collect();
        bill.order_ids.extend(swept);
        self.refresh_totals(&mut bill);

        let mut claim = match bill.claim_id.and_then(|id| self.store.claim(id)) {
            Some(claim) => claim,
            None => match self.store.open_claim_for(user) {
                Some(claim) => claim,
                None => Claim::new(self.store.next_claim_id(), user),
            },
        };
        if !claim.bill_ids.contains(&bill.id) {
            claim.bill_ids.push(bill.id);
        }
        bill.claim_id = Some(claim.id);
        self.store.put_bill(bill.clone());
        claim.amount = self.claim_amount(&claim);
        self.store.put_claim(claim.clone());

        info!(
            user = %user,
            order = %order.id,
            bill = %bill.id,
            claim = %claim.id,
            joined,
            orders = bill.order_ids.len(),
            net_profit = bill.net_profit,
            commission = bill.commission,
            "order billed"
        );
        Ok(SettlementOutcome::Attached { bill, claim })
    }

    /// Attach an unclaimed bill to a user's `New` claim.
    pub fn attach_bill(&self, bill_id: BillId, claim_id: ClaimId) -> Result<Claim, SettlementError> {
        let user = self.load_bill(bill_id)?.user_id;
        let lock = self.user_lock(user);
        let _guard = acquire(&lock);

        let mut bill = self.load_bill(bill_id)?;
        let mut claim = self.load_claim(claim_id)?;
        if let Some(existing) = bill.claim_id {
            return Err(SettlementError::BillAlreadyClaimed {
                bill: bill_id,
                claim: existing,
            });
        }
        if claim.user_id != bill.user_id {
            return Err(SettlementError::UserMismatch {
                bill: bill_id,
                bill_user: bill.user_id,
                claim: claim_id,
                claim_user: claim.user_id,
            });
        }
        ensure_open(&claim)?;

        bill.claim_id = Some(claim_id);
        claim.bill_ids.push(bill_id);
        self.store.put_bill(bill);
        claim.amount = self.claim_amount(&claim);
        self.store.put_claim(claim.clone());
        Ok(claim)
    }

    /// Detach a bill from its `New` claim. Returns the updated claim.
    pub fn detach_bill(&self, bill_id: BillId) -> Result<Claim, SettlementError> {
        let user = self.load_bill(bill_id)?.user_id;
        let lock = self.user_lock(user);
        let _guard = acquire(&lock);

        let mut bill = self.load_bill(bill_id)?;
        let claim_id = bill.claim_id.ok_or(SettlementError::BillNotClaimed(bill_id))?;
        let mut claim = self.load_claim(claim_id)?;
        ensure_open(&claim)?;

        bill.claim_id = None;
        claim.bill_ids.retain(|b| *b != bill_id);
        self.store.put_bill(bill);
        claim.amount = self.claim_amount(&claim);
        self.store.put_claim(claim.clone());
        Ok(claim)
    }

    pub fn transition_bill(&self, bill_id: BillId, to: BillStatus) -> Result<Bill, SettlementError> {
        let user = self.load_bill(bill_id)?.user_id;
        let lock = self.user_lock(user);
        let _guard = acquire(&lock);

        let mut bill = self.load_bill(bill_id)?;
        if !bill.status.can_transition_to(to) {
            return Err(SettlementError::InvalidBillTransition {
                id: bill_id,
                from: bill.status,
                to,
            });
        }
        bill.status = to;
        self.store.put_bill(bill.clone());
        Ok(bill)
    }

    pub fn transition_claim(&self, claim_id: ClaimId, to: ClaimStatus) -> Result<Claim, SettlementError> {
        let user = self.load_claim(claim_id)?.user_id;
        let lock = self.user_lock(user);
        let _guard = acquire(&lock);

        let mut claim = self.load_claim(claim_id)?;
        if !claim.status.can_transition_to(to) {
            return Err(SettlementError::InvalidClaimTransition {
                id: claim_id,
                from: claim.status,
                to,
            });
        }
        claim.status = to;
        self.store.put_claim(claim.clone());
        Ok(claim)
    }

    /// Recompute a `New` bill's totals from its stored orders, and its open
    /// claim's amount. Bills past `New` and claims past `New` are never rewritten.
    pub fn recompute_bill(&self, bill_id: BillId) -> Result<Bill, SettlementError> {
        let user = self.load_bill(bill_id)?.user_id;
        let lock = self.user_lock(user);
        let _guard = acquire(&lock);
        self.recompute_bill_locked(bill_id)
    }

    fn recompute_bill_locked(&self, bill_id: BillId) -> Result<Bill, SettlementError> {
        let mut bill = self.load_bill(bill_id)?;
        if bill.status != BillStatus::New {
            return Err(SettlementError::BillLocked {
                id: bill_id,
                status: bill.status,
            });
        }
        let claim = bill.claim_id.map(|id| self.load_claim(id)).transpose()?;
        if let Some(claim) = &claim {
            ensure_open(claim)?;
        }

        self.refresh_totals(&mut bill);
        self.store.put_bill(bill.clone());
        if let Some(mut claim) = claim {
            claim.amount = self.claim_amount(&claim);
            self.store.put_claim(claim);
        }
        Ok(bill)
    }

    /// The user's oldest `New` bill covering `at` whose claim is still open.
    fn open_bill_covering(&self, user: UserId, at: i64) -> Option<Bill> {
        self.store.bills_for_user(user).into_iter().find(|b| {
            b.status == BillStatus::New
                && (b.window_start..=b.window_end).contains(&at)
                && b
                    .claim_id
                    .map_or(true, |id| self.store.claim(id).is_some_and(|c| c.is_open()))
        })
    }

    /// Re-sum a bill from its stored orders at the rates it was created with.
    fn refresh_totals(&self, bill: &mut Bill) {
        let orders: Vec<Order> = bill
            .order_ids
            .iter()
            .filter_map(|id| self.store.order(*id))
            .collect();
        let rates = CommissionRates::new(bill.admin_commission, bill.referral_commission);
        let (net_profit, commission) = bill_totals(&orders, &rates);
        bill.net_profit = net_profit;
        bill.commission = commission;
    }

    fn claim_amount(&self, claim: &Claim) -> f64 {
        claim
            .bill_ids
            .iter()
            .filter_map(|id| self.store.bill(*id))
            .map(|b| b.net_profit)
            .sum()
    }

    fn user_lock(&self, user: UserId) -> Arc<Mutex<()>> {
        self.locks.entry(user).or_default().clone()
    }

    fn load_bill(&self, id: BillId) -> Result<Bill, SettlementError> {
        self.store.bill(id).ok_or(SettlementError::UnknownBill(id))
    }

    fn load_claim(&self, id: ClaimId) -> Result<Claim, SettlementError> {
        self.store.claim(id).ok_or(SettlementError::UnknownClaim(id))
    }
}

/// The mutex guards no data, so a poisoned lock is still usable.
fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn ensure_open(claim: &Claim) -> Result<(), SettlementError> {
    if claim.is_open() {
        Ok(())
    } else {
        Err(SettlementError::ClaimLocked {
            id: claim.id,
            status: claim.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_is_two_days_back_one_forward() {
        let cfg = SettlementConfig::default();
        assert_eq!(cfg.window(10 * DAY_MS), (8 * DAY_MS, 11 * DAY_MS));
    }

    #[test]
    fn rejects_negative_window() {
        let cfg = SettlementConfig {
            window_before_ms: -1,
            window_after_ms: 0,
        };
        assert!(cfg.validate().is_err());
    }
}
