//! Storage seam for settlement state.
//!
//! The aggregator serializes writes per user; implementations only need
//! to be safe for concurrent access across users.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use ladderlab_core::domain::{Order, OrderId, UserId};

use crate::model::{Bill, BillId, Claim, ClaimId};

pub trait SettlementStore: Send + Sync {
    /// Insert or replace an order.
    fn upsert_order(&self, order: Order);
    fn order(&self, id: OrderId) -> Option<Order>;
    /// All orders of a user, ordered by id.
    fn orders_for_user(&self, user: UserId) -> Vec<Order>;
    /// Bill an order is attached to, if any.
    fn bill_of_order(&self, id: OrderId) -> Option<BillId>;

    fn next_bill_id(&self) -> BillId;
    /// Insert or replace a bill and index its orders.
    fn put_bill(&self, bill: Bill);
    fn bill(&self, id: BillId) -> Option<Bill>;
    /// All bills of a user, ordered by id.
    fn bills_for_user(&self, user: UserId) -> Vec<Bill>;

    fn next_claim_id(&self) -> ClaimId;
    fn put_claim(&self, claim: Claim);
    fn claim(&self, id: ClaimId) -> Option<Claim>;
    /// The user's claim still in `New`, if any.
    fn open_claim_for(&self, user: UserId) -> Option<Claim>;
}

/// `DashMap`-backed store for tests, demos and the CLI.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    orders: DashMap<OrderId, Order>,
    order_bills: DashMap<OrderId, BillId>,
    bills: DashMap<BillId, Bill>,
    claims: DashMap<ClaimId, Claim>,
    bill_seq: AtomicU64,
    claim_seq: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn bill_count(&self) -> usize {
        self.bills.len()
    }

    pub fn claim_count(&self) -> usize {
        self.claims.len()
    }
}

impl SettlementStore for InMemoryStore {
    fn upsert_order(&self, order: Order) {
        self.orders.insert(order.id, order);
    }

    fn order(&self, id: OrderId) -> Option<Order> {
        self.orders.get(&id).map(|o| o.clone())
    }

    fn orders_for_user(&self, user: UserId) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|o| o.user_id == Some(user))
            .map(|o| o.value().clone())
            .collect();
        orders.sort_by_key(|o| o.id);
        orders
    }

    fn bill_of_order(&self, id: OrderId) -> Option<BillId> {
        self.order_bills.get(&id).map(|b| *b)
    }

    fn next_bill_id(&self) -> BillId {
        BillId(self.bill_seq.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn put_bill(&self, bill: Bill) {
        for order in &bill.order_ids {
            self.order_bills.insert(*order, bill.id);
        }
        self.bills.insert(bill.id, bill);
    }

    fn bill(&self, id: BillId) -> Option<Bill> {
        self.bills.get(&id).map(|b| b.clone())
    }

    fn bills_for_user(&self, user: UserId) -> Vec<Bill> {
        let mut bills: Vec<Bill> = self
            .bills
            .iter()
            .filter(|b| b.user_id == user)
            .map(|b| b.value().clone())
            .collect();
        bills.sort_by_key(|b| b.id);
        bills
    }

    fn next_claim_id(&self) -> ClaimId {
        ClaimId(self.claim_seq.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn put_claim(&self, claim: Claim) {
        self.claims.insert(claim.id, claim);
    }

    fn claim(&self, id: ClaimId) -> Option<Claim> {
        self.claims.get(&id).map(|c| c.clone())
    }

    fn open_claim_for(&self, user: UserId) -> Option<Claim> {
        self.claims
            .iter()
            .filter(|c| c.user_id == user && c.is_open())
            .map(|c| c.value().clone())
            .min_by_key(|c| c.id)
    }
}
