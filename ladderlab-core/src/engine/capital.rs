use crate::domain::EquityPoint;

/// Capital ledger for one simulation run.
///
/// Owned by the run's state and threaded through every step; never shared.
/// Conservation identity: `available + committed == initial + realized`.
#[derive(Debug, Clone)]
pub struct CapitalLedger {
    initial: f64,
    available: f64,
    committed: f64,
    realized_pnl: f64,
}

impl CapitalLedger {
    pub fn new(initial: f64) -> Self {
        Self {
            initial,
            available: initial,
            committed: 0.0,
            realized_pnl: 0.0,
        }
    }

    /// Whether a position with this budget can be funded.
    pub fn can_fund(&self, budget: f64) -> bool {
        budget > 0.0 && budget <= self.available
    }

    /// Move `budget` from available to committed.
    pub fn commit(&mut self, budget: f64) {
        self.available -= budget;
        self.committed += budget;
    }

    /// Release a closed position's budget plus its net profit.
    pub fn release(&mut self, budget: f64, net_profit: f64) {
        self.committed -= budget;
        self.available += budget + net_profit;
        self.realized_pnl += net_profit;
    }

    pub fn initial(&self) -> f64 {
        self.initial
    }

    pub fn available(&self) -> f64 {
        self.available
    }

    pub fn committed(&self) -> f64 {
        self.committed
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    /// Initial capital plus realized P&L.
    pub fn equity(&self) -> f64 {
        self.initial + self.realized_pnl
    }

    /// `(available + committed) - (initial + realized)`; zero up to rounding.
    pub fn conservation_gap(&self) -> f64 {
        (self.available + self.committed) - self.equity()
    }

    pub fn snapshot(&self, timestamp: i64) -> EquityPoint {
        EquityPoint {
            timestamp,
            equity: self.equity(),
            available: self.available,
            committed: self.committed,
        }
    }
}
