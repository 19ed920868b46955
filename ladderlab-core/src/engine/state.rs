//! Engine configuration, per-run mutable state, and run result types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::capital::CapitalLedger;
use crate::domain::{EquityPoint, IdGen, LedgerEntry, Order, OrderError, SeriesError};
use crate::strategy::StrategyError;

/// One day in milliseconds.
pub const DAY_MS: i64 = 86_400_000;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),
    #[error("price series error: {0}")]
    Series(#[from] SeriesError),
    #[error("order error: {0}")]
    Order(#[from] OrderError),
    #[error("invalid engine config: {0}")]
    Config(String),
    #[error("year {0} is out of range")]
    InvalidYear(i32),
}

/// Configuration for a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub initial_capital: f64,
    /// Candle period used for close-before-boundary, in milliseconds.
    pub candle_period_ms: i64,
    /// Fee as a fraction of traded notional, charged on entry and exit notional at close.
    pub fee_rate: f64,
    /// Maximum concurrently open positions per strategy.
    pub max_open_per_strategy: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            candle_period_ms: DAY_MS,
            fee_rate: 0.0,
            max_open_per_strategy: 1,
        }
    }
}

impl EngineConfig {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(EngineError::Config(format!(
                "initial_capital must be positive, got {}",
                self.initial_capital
            )));
        }
        if self.candle_period_ms <= 0 {
            return Err(EngineError::Config(format!(
                "candle_period_ms must be positive, got {}",
                self.candle_period_ms
            )));
        }
        if !(self.fee_rate.is_finite() && self.fee_rate >= 0.0) {
            return Err(EngineError::Config(format!(
                "fee_rate must be non-negative, got {}",
                self.fee_rate
            )));
        }
        if self.max_open_per_strategy == 0 {
            return Err(EngineError::Config(
                "max_open_per_strategy must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// An open order and the plan node that owns it.
#[derive(Debug, Clone)]
pub struct OpenPosition {
    pub order: Order,
    pub node: usize,
    /// Sample index of the entry; evaluation starts on the next sample.
    pub opened_index: usize,
}

/// Mutable state that evolves sample-by-sample during one run.
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub capital: CapitalLedger,
    pub open: Vec<OpenPosition>,
    pub closed: Vec<Order>,
    pub ledger: Vec<LedgerEntry>,
    pub equity_curve: Vec<EquityPoint>,
    pub ids: IdGen,
    pub skipped_opens: usize,
}

impl SimulationState {
    pub fn new(initial_capital: f64, start_timestamp: i64) -> Self {
        let capital = CapitalLedger::new(initial_capital);
        let first_point = capital.snapshot(start_timestamp);
        Self {
            capital,
            open: Vec::new(),
            closed: Vec::new(),
            ledger: Vec::new(),
            equity_curve: vec![first_point],
            ids: IdGen::new(),
            skipped_opens: 0,
        }
    }

    pub fn open_count(&self, node: usize) -> usize {
        self.open.iter().filter(|p| p.node == node).count()
    }

    pub fn into_result(self, sample_count: usize) -> SimulationResult {
        SimulationResult {
            initial_capital: self.capital.initial(),
            final_equity: self.capital.equity(),
            final_available: self.capital.available(),
            ledger: self.ledger,
            equity_curve: self.equity_curve,
            closed_orders: self.closed,
            open_orders: self.open.into_iter().map(|p| p.order).collect(),
            skipped_opens: self.skipped_opens,
            sample_count,
        }
    }
}

/// Complete output of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub initial_capital: f64,
    /// Initial capital plus realized P&L.
    pub final_equity: f64,
    pub final_available: f64,
    /// Timestamp-ordered advance/close events.
    pub ledger: Vec<LedgerEntry>,
    /// Initial point plus one point per ledger event.
    pub equity_curve: Vec<EquityPoint>,
    pub closed_orders: Vec<Order>,
    /// Positions still open after the last sample.
    pub open_orders: Vec<Order>,
    /// Opens skipped for lack of capital or below minimum size.
    pub skipped_opens: usize,
    pub sample_count: usize,
}

impl SimulationResult {
    pub fn closed_trade_count(&self) -> usize {
        self.ledger.iter().filter(|e| e.is_close()).count()
    }

    pub fn equity_values(&self) -> Vec<f64> {
        self.equity_curve.iter().map(|p| p.equity).collect()
    }
}
