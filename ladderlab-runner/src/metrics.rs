//! Performance metrics: pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: ledger and/or equity curve in, scalar out.
//! Empty inputs produce zeroed metrics, never an error.

use ladderlab_core::domain::{EquityPoint, LedgerEntry};
use ladderlab_core::engine::DAY_MS;
use serde::{Deserialize, Serialize};

const YEAR_MS: f64 = 365.0 * DAY_MS as f64;

/// Aggregate performance metrics for a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    /// Final minus initial equity, in quote currency.
    pub total_return: f64,
    pub total_return_percent: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    /// Largest peak-to-trough equity decline, as a positive amount.
    pub max_drawdown: f64,
    pub max_drawdown_percent: f64,
    /// Fraction of closed trades with positive P&L, 0..1.
    pub win_rate: f64,
    pub total_trades: usize,
    /// `+inf` when there are wins and no losses; serialized as `"Infinity"`.
    #[serde(with = "infinite_f64")]
    pub profit_factor: f64,
    pub avg_trade: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
}

impl PerformanceMetrics {
    /// Compute all metrics from a ledger and its equity curve.
    pub fn compute(ledger: &[LedgerEntry], equity_curve: &[EquityPoint], initial_capital: f64) -> Self {
        let pnls = closed_pnls(ledger);
        let equity: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
        let final_equity = equity.last().copied().unwrap_or(initial_capital);
        let (dd, dd_pct) = max_drawdown(&equity);
        let returns = trade_returns(ledger);
        let per_year = trades_per_year(ledger);

        Self {
            total_return: final_equity - initial_capital,
            total_return_percent: total_return_percent(initial_capital, final_equity),
            sharpe_ratio: sharpe_ratio(&returns, per_year),
            sortino_ratio: sortino_ratio(&returns, per_year),
            max_drawdown: dd,
            max_drawdown_percent: dd_pct,
            win_rate: win_rate(&pnls),
            total_trades: pnls.len(),
            profit_factor: profit_factor(&pnls),
            avg_trade: mean_f64(&pnls),
            best_trade: pnls.iter().copied().reduce(f64::max).unwrap_or(0.0),
            worst_trade: pnls.iter().copied().reduce(f64::min).unwrap_or(0.0),
            max_consecutive_wins: max_consecutive(&pnls, true),
            max_consecutive_losses: max_consecutive(&pnls, false),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Realized P&L of each closing ledger event, in ledger order.
pub fn closed_pnls(ledger: &[LedgerEntry]) -> Vec<f64> {
    ledger.iter().filter_map(|e| e.pnl).collect()
}

/// Per-trade return on committed budget.
pub fn trade_returns(ledger: &[LedgerEntry]) -> Vec<f64> {
    ledger.iter().filter_map(LedgerEntry::return_on_budget).collect()
}

/// `(final - initial) / initial × 100`; 0 for a non-positive initial.
pub fn total_return_percent(initial: f64, final_equity: f64) -> f64 {
    if initial <= 0.0 {
        return 0.0;
    }
    (final_equity - initial) / initial * 100.0
}

/// Closed trades per year, from the span between the first and last close.
///
/// Spans shorter than one day count as one day.
pub fn trades_per_year(ledger: &[LedgerEntry]) -> f64 {
    let mut closes = ledger.iter().filter(|e| e.is_close());
    let Some(first) = closes.next() else {
        return 0.0;
    };
    let (count, last) = closes.fold((1usize, first.timestamp), |(n, _), e| (n + 1, e.timestamp));
    let span = ((last - first.timestamp) as f64).max(DAY_MS as f64);
    count as f64 / (span / YEAR_MS)
}

/// Annualized Sharpe ratio of per-trade returns.
///
/// Sharpe = mean(returns) / std(returns) × sqrt(trades per year).
/// Returns 0.0 with fewer than 2 trades or zero variance.
pub fn sharpe_ratio(returns: &[f64], trades_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(returns) / std * trades_per_year.sqrt()
}

/// Annualized Sortino ratio (downside deviation only).
///
/// Returns 0.0 with fewer than 2 trades or no losing trades.
pub fn sortino_ratio(returns: &[f64], trades_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let downside_sq: f64 = returns.iter().filter(|&&r| r < 0.0).map(|r| r * r).sum();
    let downside_std = (downside_sq / returns.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    mean_f64(returns) / downside_std * trades_per_year.sqrt()
}

/// Maximum peak-to-trough decline as `(amount, percent of peak)`, both
/// non-negative. `(0, 0)` for flat or rising curves.
pub fn max_drawdown(equity: &[f64]) -> (f64, f64) {
    let Some(&first) = equity.first() else {
        return (0.0, 0.0);
    };
    let mut peak = first;
    let mut worst = (0.0_f64, 0.0_f64);

    for &eq in equity {
        if eq > peak {
            peak = eq;
        }
        let dd = peak - eq;
        if dd > worst.0 {
            let pct = if peak > 0.0 { dd / peak * 100.0 } else { 0.0 };
            worst = (dd, pct);
        }
    }
    worst
}

/// Win rate: fraction of trades with positive P&L.
pub fn win_rate(pnls: &[f64]) -> f64 {
    if pnls.is_empty() {
        return 0.0;
    }
    pnls.iter().filter(|&&p| p > 0.0).count() as f64 / pnls.len() as f64
}

/// Profit factor: gross profits / gross losses.
///
/// `+inf` with wins and no losses; 0.0 with no trades or no wins.
pub fn profit_factor(pnls: &[f64]) -> f64 {
    let gross_profit: f64 = pnls.iter().filter(|&&p| p > 0.0).sum();
    let gross_loss: f64 = pnls.iter().filter(|&&p| p < 0.0).map(|p| p.abs()).sum();

    if gross_profit <= 0.0 {
        return 0.0;
    }
    if gross_loss <= 0.0 {
        return f64::INFINITY;
    }
    gross_profit / gross_loss
}

// ─── Helpers ────────────────────────────────────────────────────────

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn max_consecutive(pnls: &[f64], winners: bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;

    for &pnl in pnls {
        if (pnl > 0.0) == winners {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}

/// Serde adapter writing infinite values as the strings `"Infinity"` / `"-Infinity"`.
pub mod infinite_f64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() {
            serializer.serialize_str(if *value > 0.0 { "Infinity" } else { "-Infinity" })
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(n),
            Repr::Text(s) => match s.as_str() {
                "Infinity" => Ok(f64::INFINITY),
                "-Infinity" => Ok(f64::NEG_INFINITY),
                other => Err(serde::de::Error::custom(format!(
                    "expected a number or \"Infinity\", got {other:?}"
                ))),
            },
        }
    }
}
