//! Commission rates and the percent-or-fraction rule.
//!
//! Rates arrive either as whole percents (`30`) or fractions (`0.30`). Any
//! value above 1 is read as a percent, so a literal 1% must be written `0.01`.

use serde::{Deserialize, Serialize};

use ladderlab_core::domain::Order;

use crate::error::SettlementError;

/// Admin and referral commission for one settlement.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CommissionRates {
    pub admin: f64,
    pub referral: f64,
}

impl CommissionRates {
    pub fn new(admin: f64, referral: f64) -> Self {
        Self { admin, referral }
    }

    pub fn validate(&self) -> Result<(), SettlementError> {
        for (name, rate) in [("admin", self.admin), ("referral", self.referral)] {
            if !(rate.is_finite() && rate >= 0.0) {
                return Err(SettlementError::Config(format!(
                    "{name} commission must be non-negative, got {rate}"
                )));
            }
        }
        Ok(())
    }

    /// Combined rate as a fraction.
    pub fn combined(&self) -> f64 {
        normalize_rate(self.admin) + normalize_rate(self.referral)
    }

    /// Commission owed on one order's net profit. Losses owe nothing.
    pub fn on_profit(&self, net_profit: f64) -> f64 {
        if net_profit > 0.0 {
            net_profit * self.combined()
        } else {
            0.0
        }
    }
}

/// `p / 100` when `p > 1`, else `p`.
pub fn normalize_rate(p: f64) -> f64 {
    if p > 1.0 {
        p / 100.0
    } else {
        p
    }
}

/// Net profit and commission over a set of orders.
pub fn bill_totals<'a>(orders: impl IntoIterator<Item = &'a Order>, rates: &CommissionRates) -> (f64, f64) {
    orders.into_iter().fold((0.0, 0.0), |(net, commission), o| {
        (net + o.net_profit, commission + rates.on_profit(o.net_profit))
    })
}
