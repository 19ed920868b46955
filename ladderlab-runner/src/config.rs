//! TOML configuration for simulation runs.
//!
//! One file describes the engine settings, the strategy book (tokens,
//! strategies, ladder legs), the runs to execute and where their prices come
//! from, plus settlement defaults. Everything is validated on load.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ladderlab_core::domain::{Strategy, StrategyId, Target, Token, TokenId};
use ladderlab_core::engine::{EngineConfig, EngineError};
use ladderlab_core::strategy::{StrategyBook, StrategyError};

use crate::runner::SimulationRequest;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid engine settings: {0}")]
    Engine(#[from] EngineError),
    #[error("invalid strategy book: {0}")]
    Strategy(#[from] StrategyError),
    #[error("run {index}: {message}")]
    Run { index: usize, message: String },
    #[error("invalid settlement settings: {0}")]
    Settlement(String),
}

/// Where a run's price series comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriceSource {
    /// CSV file with `timestamp,price,high,low` columns.
    Csv { path: PathBuf },
    /// Seeded random walk covering the run's year.
    Synthetic {
        seed: u64,
        #[serde(default = "default_start_price")]
        start_price: f64,
        /// Largest single-step move, in percent.
        #[serde(default = "default_volatility")]
        volatility_percent: f64,
        #[serde(default = "default_interval")]
        interval_ms: i64,
    },
}

fn default_start_price() -> f64 {
    100.0
}

fn default_volatility() -> f64 {
    0.5
}

fn default_interval() -> i64 {
    3_600_000
}

/// One `[[runs]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSpec {
    pub token: TokenId,
    pub year: i32,
    pub strategy: StrategyId,
    /// Defaults to `[engine].initial_capital`.
    #[serde(default)]
    pub initial_capital: Option<f64>,
    pub source: PriceSource,
}

/// `[settlement]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementSettings {
    /// Days before an order's close time included in its bill window.
    pub window_before_days: i64,
    /// Days after an order's close time included in its bill window.
    pub window_after_days: i64,
    /// Admin commission, whole percent or fraction.
    pub admin_commission: f64,
    /// Referral commission, whole percent or fraction.
    pub referral_commission: f64,
}

impl Default for SettlementSettings {
    fn default() -> Self {
        Self {
            window_before_days: 2,
            window_after_days: 1,
            admin_commission: 0.0,
            referral_commission: 0.0,
        }
    }
}

/// Complete configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub strategies: Vec<Strategy>,
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default)]
    pub runs: Vec<RunSpec>,
    #[serde(default)]
    pub settlement: SettlementSettings,
}

impl BacktestConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Engine settings, strategy book, every run's plan and the settlement
    /// window are checked up front so no run fails halfway through a batch.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        let book = self.book()?;
        for (index, run) in self.runs.iter().enumerate() {
            book.plan(run.strategy, run.token)?;
            if let Some(capital) = run.initial_capital {
                if !(capital.is_finite() && capital > 0.0) {
                    return Err(ConfigError::Run {
                        index,
                        message: format!("initial_capital must be positive, got {capital}"),
                    });
                }
            }
            if let PriceSource::Synthetic {
                start_price,
                volatility_percent,
                interval_ms,
                ..
            } = &run.source
            {
                if *start_price <= 0.0 || *volatility_percent < 0.0 || *interval_ms <= 0 {
                    return Err(ConfigError::Run {
                        index,
                        message: "synthetic source needs start_price > 0, volatility_percent >= 0, interval_ms > 0".into(),
                    });
                }
            }
        }
        let s = &self.settlement;
        if s.window_before_days < 0 || s.window_after_days < 0 {
            return Err(ConfigError::Settlement(
                "window days must be non-negative".into(),
            ));
        }
        if s.admin_commission < 0.0 || s.referral_commission < 0.0 {
            return Err(ConfigError::Settlement(
                "commission rates must be non-negative".into(),
            ));
        }
        Ok(())
    }

    /// Build the validated strategy book.
    pub fn book(&self) -> Result<StrategyBook, StrategyError> {
        StrategyBook::new(
            self.tokens.clone(),
            self.strategies.clone(),
            self.targets.clone(),
        )
    }

    /// The simulation request of each `[[runs]]` entry.
    pub fn requests(&self) -> Vec<SimulationRequest> {
        self.runs
            .iter()
            .map(|run| SimulationRequest {
                token_id: run.token,
                year: run.year,
                strategy_id: run.strategy,
                initial_capital: run.initial_capital.unwrap_or(self.engine.initial_capital),
            })
            .collect()
    }
}
