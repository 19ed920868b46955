//! Run fingerprinting: deterministic identification of simulation runs.
//!
//! - `RunKey`: everything that determines a run's output.
//! - `RunId`: BLAKE3 of the canonical JSON of a `RunKey`.
//! - `LedgerDigest`: BLAKE3 of the canonical JSON of a ledger, used to check
//!   that two runs produced identical trades.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{LedgerEntry, RunId, StrategyId, TokenId};
use crate::engine::EngineConfig;
use crate::strategy::StrategyPlan;

/// Inputs that fully determine a simulation's output.
#[derive(Debug, Clone, Serialize)]
pub struct RunKey<'a> {
    pub token_id: TokenId,
    pub year: Option<i32>,
    pub strategy_id: StrategyId,
    pub engine: &'a EngineConfig,
    pub plan: &'a StrategyPlan,
    /// Digest of the price series fed to the driver.
    pub series_digest: &'a str,
}

impl RunKey<'_> {
    /// Struct fields serialize in declaration order, so the JSON is canonical.
    pub fn run_id(&self) -> Result<RunId, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        Ok(RunId::from_bytes(&json))
    }
}

/// BLAKE3 hex digest of a ledger or series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerDigest(pub String);

impl LedgerDigest {
    pub fn of_ledger(ledger: &[LedgerEntry]) -> Result<Self, serde_json::Error> {
        Self::of_json(ledger)
    }

    /// Digest of any serializable value's JSON form.
    pub fn of_json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_vec(value)?;
        Ok(Self(blake3::hash(&json).to_hex().to_string()))
    }
}

impl fmt::Display for LedgerDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PriceSample, Strategy, Target, TargetId, Token};
    use crate::strategy::StrategyBook;

    fn plan(stop: f64) -> StrategyPlan {
        StrategyBook::new(
            vec![Token::new(TokenId(1), "BTC", "USDT")],
            vec![Strategy::new(StrategyId(1), "seed", 50.0)],
            vec![Target {
                id: TargetId(1),
                strategy_id: StrategyId(1),
                token_id: None,
                target_percent: 1.0,
                stoploss_percent: stop,
            }],
        )
        .unwrap()
        .plan(StrategyId(1), TokenId(1))
        .unwrap()
    }

    fn key<'a>(engine: &'a EngineConfig, plan: &'a StrategyPlan, series: &'a str) -> RunKey<'a> {
        RunKey {
            token_id: TokenId(1),
            year: Some(2024),
            strategy_id: StrategyId(1),
            engine,
            plan,
            series_digest: series,
        }
    }

    #[test]
    fn run_id_is_stable_and_sensitive_to_inputs() {
        let engine = EngineConfig::default();
        let (a, b) = (plan(-1.0), plan(-2.0));
        let id_a = key(&engine, &a, "s").run_id().unwrap();
        assert_eq!(id_a, key(&engine, &a, "s").run_id().unwrap());
        assert_ne!(id_a, key(&engine, &b, "s").run_id().unwrap());
        assert_ne!(id_a, key(&engine, &a, "t").run_id().unwrap());
        assert_eq!(id_a.0.len(), 64);
    }

    #[test]
    fn series_digest_changes_with_prices() {
        let one = vec![PriceSample::new(0, 100.0)];
        let two = vec![PriceSample::new(0, 100.5)];
        assert_ne!(
            LedgerDigest::of_json(&one).unwrap(),
            LedgerDigest::of_json(&two).unwrap()
        );
        assert_eq!(LedgerDigest::of_ledger(&[]).unwrap(), LedgerDigest::of_ledger(&[]).unwrap());
    }
}
