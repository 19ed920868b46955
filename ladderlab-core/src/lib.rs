//! LadderLab Core: domain types, strategy book, ladder evaluator, simulation driver.
//!
//! This crate contains the simulation engine:
//! - Domain types (tokens, price samples, orders, ledger entries)
//! - Strategy book loading and validation, per-token ladders, trigger chains
//! - Target ladder evaluator (pure state machine)
//! - Sample-by-sample driver with capital accounting and boundary closure
//! - Price series provider trait, run fingerprints, paced ledger replay
//!
//! The crate performs no I/O and never reads the clock or a random source.

pub mod data;
pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod replay;
pub mod strategy;
