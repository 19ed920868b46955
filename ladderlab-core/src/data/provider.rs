//! Price series provider trait and structured error types.
//!
//! The `PriceSeriesProvider` trait abstracts over where samples come from
//! (CSV files, a synthetic generator, an exchange history API) so the driver
//! can be fed from any of them and mocked in tests.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::domain::{validate_series, PriceSample, SeriesError, Token, TokenId};

/// Structured error types for price series operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no price series for token {token}")]
    UnknownToken { token: String },

    #[error("malformed price series: {0}")]
    Series(#[from] SeriesError),

    #[error("failed to read price series: {0}")]
    Io(String),

    #[error("failed to parse price series: {0}")]
    Parse(String),
}

/// Source of ordered price samples for a token.
pub trait PriceSeriesProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Samples for `token` with `from_ms <= timestamp < to_ms`, in timestamp order.
    fn fetch(&self, token: &Token, from_ms: i64, to_ms: i64)
        -> Result<Vec<PriceSample>, ProviderError>;
}

/// Provider backed by series held in memory, keyed by token id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    series: BTreeMap<TokenId, Vec<PriceSample>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a series. The series is validated up front.
    pub fn insert(&mut self, token: TokenId, samples: Vec<PriceSample>) -> Result<(), ProviderError> {
        validate_series(&samples)?;
        self.series.insert(token, samples);
        Ok(())
    }

    pub fn with_series(mut self, token: TokenId, samples: Vec<PriceSample>) -> Result<Self, ProviderError> {
        self.insert(token, samples)?;
        Ok(self)
    }
}

impl PriceSeriesProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn fetch(
        &self,
        token: &Token,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<PriceSample>, ProviderError> {
        let series = self
            .series
            .get(&token.id)
            .ok_or_else(|| ProviderError::UnknownToken {
                token: token.pair(),
            })?;
        let lo = series.partition_point(|s| s.timestamp < from_ms);
        let hi = series.partition_point(|s| s.timestamp < to_ms);
        Ok(series[lo..hi].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn btc() -> Token {
        Token::new(TokenId(1), "BTC", "USDT")
    }

    #[test]
    fn fetch_slices_half_open_range() {
        let samples = (0..10).map(|i| PriceSample::new(i * 10, 100.0)).collect();
        let provider = InMemoryProvider::new().with_series(TokenId(1), samples).unwrap();
        let got = provider.fetch(&btc(), 20, 50).unwrap();
        assert_eq!(
            got.iter().map(|s| s.timestamp).collect::<Vec<_>>(),
            vec![20, 30, 40]
        );
    }

    #[test]
    fn unknown_token_is_an_error() {
        let provider = InMemoryProvider::new();
        assert!(matches!(
            provider.fetch(&btc(), 0, 1),
            Err(ProviderError::UnknownToken { .. })
        ));
    }

    #[test]
    fn rejects_unsorted_series_on_insert() {
        let mut provider = InMemoryProvider::new();
        let bad = vec![PriceSample::new(5, 1.0), PriceSample::new(1, 1.0)];
        assert!(matches!(
            provider.insert(TokenId(1), bad),
            Err(ProviderError::Series(_))
        ));
    }
}
