//! LadderLab Runner: simulation orchestration, analytics, configuration.
//!
//! This crate builds on `ladderlab-core` to provide:
//! - TOML configuration of engine, strategy book and runs
//! - CSV and seeded synthetic price providers
//! - Single-run simulation with run fingerprinting and performance metrics
//! - Parallel batch runs
//! - JSON and CSV artifact export

pub mod batch;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod synthetic;

pub use batch::{BatchJob, BatchResults, BatchRunner};
pub use config::{BacktestConfig, ConfigError, PriceSource, RunSpec, SettlementSettings};
pub use data_loader::{load_series, provider_for, CsvPriceProvider};
pub use export::{
    export_equity_csv, export_json, export_ledger_csv, import_json, load_artifacts,
    save_artifacts,
};
pub use metrics::PerformanceMetrics;
pub use runner::{
    run_from_samples, run_simulation, RunError, SimulationReport, SimulationRequest,
    SCHEMA_VERSION,
};
pub use synthetic::SyntheticProvider;

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn report_types_are_send_sync() {
        assert_send::<SimulationReport>();
        assert_sync::<SimulationReport>();
        assert_send::<PerformanceMetrics>();
        assert_sync::<PerformanceMetrics>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<BacktestConfig>();
        assert_sync::<BacktestConfig>();
    }

    #[test]
    fn providers_are_send_sync() {
        assert_send::<CsvPriceProvider>();
        assert_sync::<CsvPriceProvider>();
        assert_send::<SyntheticProvider>();
        assert_sync::<SyntheticProvider>();
        assert_sync::<BatchJob>();
    }
}
