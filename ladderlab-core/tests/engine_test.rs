//! Integration tests for the simulation driver.
//!
//! Tests:
//! 1. Determinism: identical inputs give identical ledgers and digests
//! 2. Capital conservation at every equity point
//! 3. Trigger chaining: parent ladder signals open child positions
//! 4. Candle-boundary closure
//! 5. Capital and minimum-size skips
//! 6. Year window restriction
//! 7. Leverage and fees

use ladderlab_core::domain::{
    CloseOutcome, CloseReason, Direction, LedgerEvent, OrderStatus, PriceSample, Side, Strategy,
    StrategyId, Target, TargetId, Token, TokenId,
};
use ladderlab_core::engine::{simulate, simulate_year, year_window, EngineConfig};
use ladderlab_core::fingerprint::LedgerDigest;
use ladderlab_core::strategy::{StrategyBook, StrategyPlan};

fn leg(id: u64, strategy: u64, target: f64, stop: f64) -> Target {
    Target {
        id: TargetId(id),
        strategy_id: StrategyId(strategy),
        token_id: None,
        target_percent: target,
        stoploss_percent: stop,
    }
}

fn btc() -> Token {
    Token::new(TokenId(1), "BTC", "USDT")
}

fn single(contribution: f64, legs: &[(f64, f64)]) -> StrategyPlan {
    let targets = legs
        .iter()
        .enumerate()
        .map(|(i, &(t, s))| leg(i as u64 + 1, 1, t, s))
        .collect();
    StrategyBook::new(
        vec![btc()],
        vec![Strategy::new(StrategyId(1), "seed", contribution)],
        targets,
    )
    .unwrap()
    .plan(StrategyId(1), TokenId(1))
    .unwrap()
}

/// Samples one minute apart, all inside one day.
fn minutes(prices: &[f64]) -> Vec<PriceSample> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &p)| PriceSample::new(i as i64 * 60_000, p))
        .collect()
}

fn zigzag(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 100.0 + (i as f64 * 0.37).sin() * 4.0 + (i as f64 * 0.05))
        .collect()
}

// ── 1. Determinism ───────────────────────────────────────────────────

#[test]
fn identical_inputs_produce_identical_results() {
    let plan = single(40.0, &[(0.0, -1.5), (1.0, 0.5), (2.5, 1.5)]);
    let samples = minutes(&zigzag(500));
    let config = EngineConfig::new(10_000.0);

    let a = simulate(&plan, &config, &samples).unwrap();
    let b = simulate(&plan, &config, &samples).unwrap();

    assert!(!a.ledger.is_empty());
    assert_eq!(a, b);
    assert_eq!(
        LedgerDigest::of_ledger(&a.ledger).unwrap(),
        LedgerDigest::of_ledger(&b.ledger).unwrap()
    );
}

// ── 2. Conservation ──────────────────────────────────────────────────

#[test]
fn capital_is_conserved_at_every_point() {
    let plan = single(60.0, &[(0.0, -2.0), (1.5, 0.5)]);
    let result = simulate(&plan, &EngineConfig::new(5_000.0), &minutes(&zigzag(800))).unwrap();

    assert_eq!(result.equity_curve.len(), result.ledger.len() + 1);
    for point in &result.equity_curve {
        let gap = point.available + point.committed - point.equity;
        assert!(gap.abs() < 1e-6, "conservation gap {gap} at {}", point.timestamp);
    }
    let realized: f64 = result.ledger.iter().filter_map(|e| e.pnl).sum();
    assert!((result.final_equity - (5_000.0 + realized)).abs() < 1e-6);
}

#[test]
fn ledger_is_ordered_and_sequenced() {
    let plan = single(30.0, &[(0.0, -1.0), (1.0, 0.2)]);
    let result = simulate(&plan, &EngineConfig::new(1_000.0), &minutes(&zigzag(300))).unwrap();
    for (i, entry) in result.ledger.iter().enumerate() {
        assert_eq!(entry.seq, i as u64);
    }
    assert!(result
        .ledger
        .windows(2)
        .all(|w| w[0].timestamp <= w[1].timestamp));
    for order in &result.closed_orders {
        assert!(order.status.is_terminal());
        assert_eq!(order.recompute_net_profit(), Some(order.net_profit));
    }
}

// ── 3. Trigger chaining ──────────────────────────────────────────────

#[test]
fn parent_advance_opens_opposite_child() {
    // GIVEN: a Buy root with the two-leg profit-lock ladder and an Opposite child
    let root = Strategy::new(StrategyId(1), "root", 50.0);
    let mut child = Strategy::new(StrategyId(2), "hedge", 20.0);
    child.parent_id = Some(StrategyId(1));
    child.direction = Direction::Opposite;
    let plan = StrategyBook::new(
        vec![btc()],
        vec![root, child],
        vec![leg(1, 1, 0.0, -1.85), leg(2, 1, 0.6, 0.6), leg(3, 2, 1.0, -1.0)],
    )
    .unwrap()
    .plan(StrategyId(1), TokenId(1))
    .unwrap();

    // WHEN: entry at 100, up to 100.7 (advance), back to 100.6 (lock)
    let result = simulate(
        &plan,
        &EngineConfig::new(1_000.0),
        &minutes(&[100.0, 100.7, 100.6]),
    )
    .unwrap();

    // THEN: root advanced then closed Finished; child opened Sell at 100.7
    assert_eq!(result.ledger.len(), 2);
    assert_eq!(result.ledger[0].event, LedgerEvent::Advance { leg: 1 });
    assert_eq!(
        result.ledger[1].event,
        LedgerEvent::Close {
            outcome: CloseOutcome::Finished,
            reason: CloseReason::StopLoss
        }
    );
    assert_eq!(result.closed_orders.len(), 1);
    assert!((result.closed_orders[0].net_profit - 3.0).abs() < 1e-9);

    assert_eq!(result.open_orders.len(), 1);
    let hedge = &result.open_orders[0];
    assert_eq!(hedge.strategy_id, StrategyId(2));
    assert_eq!(hedge.side, Side::Sell);
    assert_eq!(hedge.entry_price, 100.7);
    // 20% of the 500 left after the root committed its budget
    assert!((hedge.budget - 100.0).abs() < 1e-9);
}

#[test]
fn trigger_at_concurrency_limit_opens_nothing() {
    // GIVEN: a root whose advance and close both signal a Same-side child
    let root = Strategy::new(StrategyId(1), "root", 50.0);
    let mut child = Strategy::new(StrategyId(2), "follow", 20.0);
    child.parent_id = Some(StrategyId(1));
    let plan = StrategyBook::new(
        vec![btc()],
        vec![root, child],
        vec![leg(1, 1, 0.0, -1.85), leg(2, 1, 0.6, 0.6), leg(3, 2, 5.0, -5.0)],
    )
    .unwrap()
    .plan(StrategyId(1), TokenId(1))
    .unwrap();

    // WHEN: the root advances at 100.7 and closes at 100.6 while the child is open
    let result = simulate(
        &plan,
        &EngineConfig::new(1_000.0),
        &minutes(&[100.0, 100.7, 100.6]),
    )
    .unwrap();

    // THEN: the second signal is dropped without opening or counting a skip
    let children: Vec<_> = result
        .open_orders
        .iter()
        .chain(&result.closed_orders)
        .filter(|o| o.strategy_id == StrategyId(2))
        .collect();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].entry_price, 100.7);
    assert_eq!(children[0].side, Side::Buy);
    assert_eq!(result.skipped_opens, 0);
}

// ── 4. Candle boundary ───────────────────────────────────────────────

#[test]
fn close_before_boundary_forces_finished_close() {
    // GIVEN: a strategy flagged close-before-boundary, 1s candles
    let mut s = Strategy::new(StrategyId(1), "intraday", 50.0);
    s.close_before_boundary = true;
    let plan = StrategyBook::new(vec![btc()], vec![s], vec![leg(1, 1, 10.0, -10.0)])
        .unwrap()
        .plan(StrategyId(1), TokenId(1))
        .unwrap();
    let config = EngineConfig {
        candle_period_ms: 1_000,
        ..EngineConfig::new(1_000.0)
    };
    let samples = vec![
        PriceSample::new(0, 100.0),
        PriceSample::new(500, 101.0),
        PriceSample::new(1_000, 102.0),
        PriceSample::new(1_500, 103.0),
    ];

    // WHEN
    let result = simulate(&plan, &config, &samples).unwrap();

    // THEN: each candle's position is closed at its last sample
    assert_eq!(result.closed_orders.len(), 2);
    assert!(result.open_orders.is_empty());
    for entry in &result.ledger {
        assert_eq!(
            entry.event,
            LedgerEvent::Close {
                outcome: CloseOutcome::Finished,
                reason: CloseReason::Boundary
            }
        );
    }
    assert_eq!(result.ledger[0].price, 101.0);
    assert_eq!(result.ledger[1].price, 103.0);
}

#[test]
fn positions_stay_open_without_boundary_flag() {
    let plan = single(50.0, &[(10.0, -10.0)]);
    let result = simulate(&plan, &EngineConfig::new(1_000.0), &minutes(&[100.0, 101.0])).unwrap();
    assert!(result.ledger.is_empty());
    assert_eq!(result.open_orders.len(), 1);
    assert_eq!(result.open_orders[0].status, OrderStatus::Active);
    assert_eq!(result.open_orders[0].mark_price, 101.0);
}

// ── 5. Skips ─────────────────────────────────────────────────────────

#[test]
fn below_minimum_quantity_is_skipped() {
    let mut token = btc();
    token.min_order_qty = 1_000.0;
    let plan = StrategyBook::new(
        vec![token],
        vec![Strategy::new(StrategyId(1), "tiny", 10.0)],
        vec![leg(1, 1, 1.0, -1.0)],
    )
    .unwrap()
    .plan(StrategyId(1), TokenId(1))
    .unwrap();

    let result = simulate(&plan, &EngineConfig::new(1_000.0), &minutes(&[100.0, 100.5, 99.8])).unwrap();
    assert_eq!(result.skipped_opens, 3);
    assert!(result.closed_orders.is_empty());
    assert!(result.open_orders.is_empty());
    assert_eq!(result.final_equity, 1_000.0);
}

#[test]
fn empty_series_gives_empty_run() {
    let plan = single(50.0, &[(1.0, -1.0)]);
    let result = simulate(&plan, &EngineConfig::new(1_000.0), &[]).unwrap();
    assert_eq!(result.sample_count, 0);
    assert_eq!(result.closed_trade_count(), 0);
    assert_eq!(result.equity_values(), vec![1_000.0]);
}

// ── 6. Year window ───────────────────────────────────────────────────

#[test]
fn year_restricts_series() {
    let (start, end) = year_window(2024).unwrap();
    let samples = vec![
        PriceSample::new(start - 1, 100.0),
        PriceSample::new(start, 100.0),
        PriceSample::new(start + 60_000, 100.2),
        PriceSample::new(end - 1, 100.1),
        PriceSample::new(end, 100.0),
    ];
    let plan = single(50.0, &[(5.0, -5.0)]);
    let result = simulate_year(&plan, &EngineConfig::new(1_000.0), &samples, 2024).unwrap();
    assert_eq!(result.sample_count, 3);
    assert_eq!(result.equity_curve[0].timestamp, start);
    assert_eq!(result.open_orders[0].opened_at, start);
}

// ── 7. Leverage and fees ─────────────────────────────────────────────

#[test]
fn leverage_scales_quantity_and_fee_is_charged_on_close() {
    let mut token = btc();
    token.leverage_cap = 5.0;
    let mut s = Strategy::new(StrategyId(1), "lev", 50.0);
    s.leverage = 2.0;
    let plan = StrategyBook::new(vec![token], vec![s], vec![leg(1, 1, 1.0, -1.0)])
        .unwrap()
        .plan(StrategyId(1), TokenId(1))
        .unwrap();
    let config = EngineConfig {
        fee_rate: 0.001,
        ..EngineConfig::new(1_000.0)
    };

    let result = simulate(&plan, &config, &minutes(&[100.0, 102.0])).unwrap();
    let order = &result.closed_orders[0];
    assert_eq!(order.quantity, 10.0);
    assert!((order.fee - 0.001 * (100.0 + 102.0) * 10.0).abs() < 1e-12);
    assert!((order.net_profit - (20.0 - order.fee)).abs() < 1e-9);
    assert!((result.final_equity - (1_000.0 + order.net_profit)).abs() < 1e-9);
}
