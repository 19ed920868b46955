//! BDD tests for the runner: config → simulation → report.

use ladderlab_core::domain::{StrategyId, TokenId};
use ladderlab_runner::{
    run_simulation, BacktestConfig, BatchRunner, PriceSource, SimulationRequest,
    SyntheticProvider,
};

const CONFIG: &str = r#"
[engine]
initial_capital = 10000.0
fee_rate = 0.0005
candle_period_ms = 86400000

[[tokens]]
id = 1
name = "BTC"
quote_symbol = "USDT"

[[tokens]]
id = 2
name = "ETH"
quote_symbol = "USDT"

[[strategies]]
id = 1
name = "seed"
contribution_percent = 20.0

[[strategies]]
id = 2
name = "hedge"
contribution_percent = 10.0
parent_id = 1
direction = "opposite"

[[targets]]
id = 1
strategy_id = 1
target_percent = 0.0
stoploss_percent = -1.85

[[targets]]
id = 2
strategy_id = 1
target_percent = 0.6
stoploss_percent = 0.6

[[targets]]
id = 3
strategy_id = 2
target_percent = 1.0
stoploss_percent = -1.0

[[runs]]
token = 1
year = 2024
strategy = 1
source = { kind = "synthetic", seed = 11 }

[[runs]]
token = 2
year = 2024
strategy = 1
initial_capital = 5000.0
source = { kind = "synthetic", seed = 11, volatility_percent = 1.0 }
"#;

#[test]
fn bdd_scenario_config_to_report() {
    // GIVEN a validated config with one synthetic run
    let config = BacktestConfig::from_toml(CONFIG).expect("config should parse");
    let book = config.book().unwrap();
    let request = config.requests()[0];

    // WHEN the run executes against a seeded synthetic provider
    let provider = SyntheticProvider::new(11);
    let report = run_simulation(&book, &config.engine, &request, &provider)
        .expect("simulation should succeed");

    // THEN the report covers the whole leap year of hourly samples
    assert_eq!(report.sample_count, 366 * 24);
    assert_eq!(report.token, "BTC/USDT");
    // AND trades happened and equity reconciles with the metrics
    assert!(report.metrics.total_trades > 0);
    assert!((report.final_equity - (10_000.0 + report.metrics.total_return)).abs() < 1e-6);
    assert_eq!(report.equity_curve.len(), report.trades.len() + 1);
    // AND every equity point conserves capital
    for p in &report.equity_curve {
        assert!((p.available + p.committed - p.equity).abs() < 1e-6);
    }
}

#[test]
fn bdd_scenario_same_inputs_same_run_id_and_digest() {
    // GIVEN the same request run twice
    let config = BacktestConfig::from_toml(CONFIG).unwrap();
    let book = config.book().unwrap();
    let request = config.requests()[0];
    let provider = SyntheticProvider::new(11);

    // WHEN both runs complete
    let a = run_simulation(&book, &config.engine, &request, &provider).unwrap();
    let b = run_simulation(&book, &config.engine, &request, &provider).unwrap();

    // THEN identity and ledger digest match exactly
    assert_eq!(a.run_id, b.run_id);
    assert_eq!(a.ledger_digest, b.ledger_digest);
    assert_eq!(a, b);

    // WHEN the capital changes
    let other = SimulationRequest {
        initial_capital: 20_000.0,
        ..request
    };
    let c = run_simulation(&book, &config.engine, &other, &provider).unwrap();

    // THEN the run id changes too
    assert_ne!(a.run_id, c.run_id);
}

#[test]
fn bdd_scenario_batch_runs_every_entry() {
    // GIVEN a config with two runs on different tokens
    let config = BacktestConfig::from_toml(CONFIG).unwrap();
    assert!(matches!(config.runs[1].source, PriceSource::Synthetic { .. }));

    // WHEN the batch executes in parallel
    let results = BatchRunner::new().run_config(&config).expect("batch should succeed");

    // THEN one report per run comes back in config order
    assert_eq!(results.len(), 2);
    assert_eq!(results.all()[0].request.token_id, TokenId(1));
    assert_eq!(results.all()[1].request.token_id, TokenId(2));
    assert_eq!(results.all()[1].request.initial_capital, 5_000.0);
    assert_eq!(results.all()[0].request.strategy_id, StrategyId(1));

    // AND the sequential batch produces the same reports
    let sequential = BatchRunner::new()
        .with_parallelism(false)
        .run_config(&config)
        .unwrap();
    assert_eq!(results.all(), sequential.all());
}

#[test]
fn bdd_scenario_missing_csv_fails_the_batch() {
    // GIVEN a run whose CSV file does not exist
    let toml = CONFIG.replace(
        "source = { kind = \"synthetic\", seed = 11 }",
        "source = { kind = \"csv\", path = \"/nonexistent/btc.csv\" }",
    );
    let config = BacktestConfig::from_toml(&toml).unwrap();

    // WHEN the batch executes
    let err = BatchRunner::new().run_config(&config).unwrap_err();

    // THEN the data error surfaces
    assert!(err.to_string().contains("price data error"));
}
