//! Simulation runner: wires together the strategy book, a price provider,
//! the driver and the analytics.
//!
//! Two entry points:
//! - `run_simulation()`: fetches the year's prices from a provider, then runs. Used by the CLI.
//! - `run_from_samples()`: takes pre-loaded samples. Used by batch runs and tests.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use ladderlab_core::data::{PriceSeriesProvider, ProviderError};
use ladderlab_core::domain::{
    EquityPoint, LedgerEntry, Order, PriceSample, RunId, StrategyId, TokenId,
};
use ladderlab_core::engine::{simulate_year, year_window, EngineConfig, EngineError};
use ladderlab_core::fingerprint::{LedgerDigest, RunKey};
use ladderlab_core::strategy::{StrategyBook, StrategyError, StrategyPlan};

use crate::metrics::PerformanceMetrics;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("price data error: {0}")]
    Data(#[from] ProviderError),
    #[error("failed to fingerprint run: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

/// What to simulate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRequest {
    #[serde(rename = "token")]
    pub token_id: TokenId,
    pub year: i32,
    pub strategy_id: StrategyId,
    pub initial_capital: f64,
}

/// Complete result of a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub ledger_digest: LedgerDigest,
    pub request: SimulationRequest,
    /// Display pair of the simulated token, e.g. "BTC/USDT".
    pub token: String,
    pub final_equity: f64,
    #[serde(flatten)]
    pub metrics: PerformanceMetrics,
    /// Advance and close events in timestamp order.
    pub trades: Vec<LedgerEntry>,
    pub equity_curve: Vec<EquityPoint>,
    pub closed_orders: Vec<Order>,
    pub open_orders: Vec<Order>,
    pub skipped_opens: usize,
    pub sample_count: usize,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Fetch the requested year's prices and run the simulation.
pub fn run_simulation(
    book: &StrategyBook,
    engine: &EngineConfig,
    request: &SimulationRequest,
    provider: &dyn PriceSeriesProvider,
) -> Result<SimulationReport, RunError> {
    let plan = book.plan(request.strategy_id, request.token_id)?;
    let (from, to) = year_window(request.year)?;
    let samples = provider.fetch(&plan.token, from, to)?;
    info!(
        provider = provider.name(),
        token = %plan.token.pair(),
        year = request.year,
        samples = samples.len(),
        "loaded price series"
    );
    run_from_samples(&plan, engine, request, &samples)
}

/// Run with pre-loaded samples; no I/O.
///
/// Samples outside the request's year are ignored.
pub fn run_from_samples(
    plan: &StrategyPlan,
    engine: &EngineConfig,
    request: &SimulationRequest,
    samples: &[PriceSample],
) -> Result<SimulationReport, RunError> {
    let config = EngineConfig {
        initial_capital: request.initial_capital,
        ..engine.clone()
    };
    let result = simulate_year(plan, &config, samples, request.year)?;

    let series_digest = LedgerDigest::of_json(samples)?;
    let run_id = RunKey {
        token_id: request.token_id,
        year: Some(request.year),
        strategy_id: request.strategy_id,
        engine: &config,
        plan,
        series_digest: &series_digest.0,
    }
    .run_id()?;
    let ledger_digest = LedgerDigest::of_ledger(&result.ledger)?;
    let metrics =
        PerformanceMetrics::compute(&result.ledger, &result.equity_curve, result.initial_capital);

    info!(
        run_id = %run_id,
        strategy = %request.strategy_id,
        token = %plan.token.pair(),
        year = request.year,
        trades = metrics.total_trades,
        total_return = metrics.total_return,
        skipped = result.skipped_opens,
        "simulation complete"
    );

    Ok(SimulationReport {
        schema_version: SCHEMA_VERSION,
        run_id,
        ledger_digest,
        request: *request,
        token: plan.token.pair(),
        final_equity: result.final_equity,
        metrics,
        trades: result.ledger,
        equity_curve: result.equity_curve,
        closed_orders: result.closed_orders,
        open_orders: result.open_orders,
        skipped_opens: result.skipped_opens,
        sample_count: result.sample_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ladderlab_core::data::InMemoryProvider;
    use ladderlab_core::domain::{Strategy, Target, TargetId, Token};

    fn book() -> StrategyBook {
        StrategyBook::new(
            vec![Token::new(TokenId(1), "BTC", "USDT")],
            vec![Strategy::new(StrategyId(1), "seed", 50.0)],
            vec![Target {
                id: TargetId(1),
                strategy_id: StrategyId(1),
                token_id: None,
                target_percent: 1.0,
                stoploss_percent: -1.0,
            }],
        )
        .unwrap()
    }

    fn request() -> SimulationRequest {
        SimulationRequest {
            token_id: TokenId(1),
            year: 2024,
            strategy_id: StrategyId(1),
            initial_capital: 1_000.0,
        }
    }

    #[test]
    fn runs_against_provider_year() {
        let (start, _) = year_window(2024).unwrap();
        let samples = vec![
            PriceSample::new(start - 10, 50.0),
            PriceSample::new(start, 100.0),
            PriceSample::new(start + 1, 102.0),
        ];
        let provider = InMemoryProvider::new().with_series(TokenId(1), samples).unwrap();
        let report = run_simulation(&book(), &EngineConfig::default(), &request(), &provider).unwrap();

        assert_eq!(report.sample_count, 2);
        assert_eq!(report.metrics.total_trades, 1);
        assert!((report.final_equity - 1_010.0).abs() < 1e-9);
        assert_eq!(report.token, "BTC/USDT");
    }

    #[test]
    fn unknown_strategy_is_an_error() {
        let provider = InMemoryProvider::new();
        let mut req = request();
        req.strategy_id = StrategyId(99);
        assert!(matches!(
            run_simulation(&book(), &EngineConfig::default(), &req, &provider),
            Err(RunError::Strategy(_))
        ));
    }

    #[test]
    fn report_uses_camel_case_keys() {
        let plan = book().plan(StrategyId(1), TokenId(1)).unwrap();
        let report = run_from_samples(&plan, &EngineConfig::default(), &request(), &[]).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        for key in [
            "trades",
            "equityCurve",
            "totalReturn",
            "totalReturnPercent",
            "sharpeRatio",
            "maxDrawdown",
            "maxDrawdownPercent",
            "winRate",
            "totalTrades",
            "profitFactor",
            "avgTrade",
            "bestTrade",
            "worstTrade",
            "runId",
            "ledgerDigest",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["request"]["token"], 1);
        assert_eq!(json["request"]["strategyId"], 1);
    }
}
