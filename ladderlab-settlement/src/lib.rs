//! LadderLab Settlement: aggregates closed live orders into bills and claims.
//!
//! - `SettlementAggregator::settle` is the entry point, one call per closed order
//! - `SettlementStore` is the persistence seam; `InMemoryStore` backs tests and the CLI
//! - Commission rates accept whole percents or fractions

pub mod aggregator;
pub mod commission;
pub mod error;
pub mod model;
pub mod store;

pub use aggregator::{SettlementAggregator, SettlementConfig, SettlementOutcome};
pub use commission::{normalize_rate, CommissionRates};
pub use error::SettlementError;
pub use model::{Bill, BillId, BillStatus, Claim, ClaimId, ClaimStatus};
pub use store::{InMemoryStore, SettlementStore};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn aggregator_is_send_sync() {
        assert_send::<SettlementAggregator<InMemoryStore>>();
        assert_sync::<SettlementAggregator<InMemoryStore>>();
    }
}
