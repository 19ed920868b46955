//! Sample-by-sample simulation driver.
//!
//! Four phases per sample:
//! 1. Evaluate: every position opened on an earlier sample goes through the
//!    ladder evaluator; closes release capital, advances move the leg pointer.
//! 2. Triggers: ladder signals from phase 1 open positions for child strategies.
//! 3. Boundary: at the last sample of a candle period, positions of
//!    close-before-boundary strategies are force-closed.
//! 4. Entry: the root strategy opens a position if below its concurrency limit
//!    and it did not close a position on this sample.
//!
//! All state lives in `SimulationState`; nothing here reads the clock or a
//! random source, so identical inputs give identical outputs.

use chrono::{NaiveDate, TimeZone, Utc};
use tracing::{debug, warn};

use super::evaluator::{evaluate, LegDecision};
use super::state::{EngineConfig, EngineError, OpenPosition, SimulationResult, SimulationState};
use crate::domain::{
    validate_series, CloseOutcome, CloseReason, LedgerEntry, LedgerEvent, Order, PriceSample,
};
use crate::strategy::StrategyPlan;

/// Run a simulation over every sample of `samples`.
pub fn simulate(
    plan: &StrategyPlan,
    config: &EngineConfig,
    samples: &[PriceSample],
) -> Result<SimulationResult, EngineError> {
    config.validate()?;
    validate_series(samples)?;
    let start = samples.first().map(|s| s.timestamp).unwrap_or(0);
    run(plan, config, samples, start)
}

/// Run a simulation over the samples that fall in calendar `year` (UTC).
pub fn simulate_year(
    plan: &StrategyPlan,
    config: &EngineConfig,
    samples: &[PriceSample],
    year: i32,
) -> Result<SimulationResult, EngineError> {
    config.validate()?;
    validate_series(samples)?;
    let (start, end) = year_window(year)?;
    let lo = samples.partition_point(|s| s.timestamp < start);
    let hi = samples.partition_point(|s| s.timestamp < end);
    run(plan, config, &samples[lo..hi], start)
}

/// `[Jan 1 year, Jan 1 year+1)` in epoch milliseconds.
pub fn year_window(year: i32) -> Result<(i64, i64), EngineError> {
    let bound = |y: i32| {
        NaiveDate::from_ymd_opt(y, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| Utc.from_utc_datetime(&dt).timestamp_millis())
            .ok_or(EngineError::InvalidYear(year))
    };
    Ok((bound(year)?, bound(year + 1)?))
}

/// Whether `samples[index]` is the last sample of its candle period.
///
/// The final sample of the series always ends a period.
pub fn is_period_end(samples: &[PriceSample], index: usize, period_ms: i64) -> bool {
    match samples.get(index + 1) {
        None => true,
        Some(next) => {
            samples[index].timestamp.div_euclid(period_ms) != next.timestamp.div_euclid(period_ms)
        }
    }
}

fn run(
    plan: &StrategyPlan,
    config: &EngineConfig,
    samples: &[PriceSample],
    start: i64,
) -> Result<SimulationResult, EngineError> {
    let mut state = SimulationState::new(config.initial_capital, start);
    for index in 0..samples.len() {
        step(&mut state, plan, config, samples, index)?;
    }
    debug!(
        samples = samples.len(),
        events = state.ledger.len(),
        skipped = state.skipped_opens,
        "simulation finished"
    );
    Ok(state.into_result(samples.len()))
}

/// Advance the run by one sample.
pub fn step(
    state: &mut SimulationState,
    plan: &StrategyPlan,
    config: &EngineConfig,
    samples: &[PriceSample],
    index: usize,
) -> Result<(), EngineError> {
    let sample = &samples[index];
    let boundary = is_period_end(samples, index, config.candle_period_ms);
    let mut signals: Vec<usize> = Vec::new();
    let mut closed_nodes: Vec<usize> = Vec::new();

    // ─── Phase 1: Evaluate ───
    let mut i = 0;
    while i < state.open.len() {
        if state.open[i].opened_index >= index {
            i += 1;
            continue;
        }
        let node = state.open[i].node;
        match evaluate(&state.open[i].order, &plan.nodes[node].ladder, sample) {
            LegDecision::Hold => {
                state.open[i].order.mark(sample.price, sample.timestamp);
                i += 1;
            }
            LegDecision::AdvanceLeg { next_leg } => {
                let order = &mut state.open[i].order;
                order.mark(sample.price, sample.timestamp);
                order.advance_to(next_leg, sample.timestamp)?;
                let order = order.clone();
                debug!(order = %order.id, leg = next_leg, price = sample.price, "leg advanced");
                record(
                    state,
                    &order,
                    LedgerEvent::Advance { leg: next_leg },
                    sample.price,
                    None,
                    sample.timestamp,
                );
                signals.push(node);
                i += 1;
            }
            LegDecision::Close {
                outcome,
                price,
                reason,
            } => {
                close_position(state, config, i, outcome, price, reason, sample.timestamp)?;
                signals.push(node);
                closed_nodes.push(node);
            }
        }
    }

    // ─── Phase 2: Triggers ───
    for &node in &signals {
        for &child in &plan.nodes[node].children {
            try_open(state, plan, config, child, sample, index, boundary);
        }
    }

    // ─── Phase 3: Boundary ───
    if boundary {
        let mut i = 0;
        while i < state.open.len() {
            let node = state.open[i].node;
            if plan.nodes[node].strategy.close_before_boundary {
                close_position(
                    state,
                    config,
                    i,
                    CloseOutcome::Finished,
                    sample.price,
                    CloseReason::Boundary,
                    sample.timestamp,
                )?;
                closed_nodes.push(node);
            } else {
                i += 1;
            }
        }
    }

    // ─── Phase 4: Entry ───
    if !closed_nodes.contains(&0) {
        try_open(state, plan, config, 0, sample, index, boundary);
    }

    Ok(())
}

fn try_open(
    state: &mut SimulationState,
    plan: &StrategyPlan,
    config: &EngineConfig,
    node: usize,
    sample: &PriceSample,
    index: usize,
    boundary: bool,
) {
    let plan_node = &plan.nodes[node];
    let strategy = &plan_node.strategy;
    if state.open_count(node) >= config.max_open_per_strategy {
        // The root sits at its limit on every sample it holds a position.
        if plan_node.parent.is_some() {
            debug!(
                strategy = %strategy.id,
                limit = config.max_open_per_strategy,
                timestamp = sample.timestamp,
                "trigger dropped: strategy at concurrency limit"
            );
        }
        return;
    }
    // Would be force-closed on this very sample.
    if boundary && strategy.close_before_boundary {
        return;
    }

    let budget = strategy.budget_for(state.capital.available());
    if !state.capital.can_fund(budget) {
        warn!(
            strategy = %strategy.id,
            budget,
            available = state.capital.available(),
            timestamp = sample.timestamp,
            "skipping open: insufficient capital"
        );
        state.skipped_opens += 1;
        return;
    }
    let quantity = budget * strategy.leverage / sample.price;
    if !plan.token.accepts_quantity(quantity) {
        warn!(
            strategy = %strategy.id,
            quantity,
            min = plan.token.min_order_qty,
            timestamp = sample.timestamp,
            "skipping open: below minimum order quantity"
        );
        state.skipped_opens += 1;
        return;
    }

    let order = Order::open(
        state.ids.next_order_id(),
        strategy.id,
        plan.token.id,
        plan_node.side,
        sample.price,
        budget,
        strategy.leverage,
        sample.timestamp,
    );
    state.capital.commit(budget);
    debug!(
        order = %order.id,
        strategy = %strategy.id,
        side = ?order.side,
        price = sample.price,
        budget,
        "position opened"
    );
    state.open.push(OpenPosition {
        order,
        node,
        opened_index: index,
    });
}

fn close_position(
    state: &mut SimulationState,
    config: &EngineConfig,
    position: usize,
    outcome: CloseOutcome,
    price: f64,
    reason: CloseReason,
    timestamp: i64,
) -> Result<(), EngineError> {
    let mut pos = state.open.remove(position);
    let fee = config.fee_rate * (pos.order.entry_price + price) * pos.order.quantity;
    let pnl = pos.order.close(outcome, price, fee, timestamp)?;
    state.capital.release(pos.order.budget, pnl);
    debug!(
        order = %pos.order.id,
        ?outcome,
        ?reason,
        price,
        pnl,
        "position closed"
    );
    record(
        state,
        &pos.order,
        LedgerEvent::Close { outcome, reason },
        price,
        Some(pnl),
        timestamp,
    );
    state.closed.push(pos.order);
    Ok(())
}

/// Append a ledger entry and the equity point that follows it.
fn record(
    state: &mut SimulationState,
    order: &Order,
    event: LedgerEvent,
    price: f64,
    pnl: Option<f64>,
    timestamp: i64,
) {
    state.ledger.push(LedgerEntry {
        seq: state.ledger.len() as u64,
        timestamp,
        order_id: order.id,
        strategy_id: order.strategy_id,
        side: order.side,
        event,
        price,
        quantity: order.quantity,
        entry_price: order.entry_price,
        budget: order.budget,
        pnl,
    });
    let point = state.capital.snapshot(timestamp);
    state.equity_curve.push(point);
}
