//! Simulation engine: ladder evaluation and the sample-by-sample driver.
//!
//! The driver consumes a validated `StrategyPlan` and an ordered price series
//! and runs four phases per sample:
//!
//! 1. Evaluate open positions against their ladders
//! 2. Open child positions for ladder signals
//! 3. Force-close at candle boundaries
//! 4. Open a root position

pub mod capital;
pub mod driver;
pub mod evaluator;
pub mod state;

pub use capital::CapitalLedger;
pub use driver::{is_period_end, simulate, simulate_year, step, year_window};
pub use evaluator::{evaluate, LegDecision, PERCENT_EPSILON};
pub use state::{
    EngineConfig, EngineError, OpenPosition, SimulationResult, SimulationState, DAY_MS,
};
