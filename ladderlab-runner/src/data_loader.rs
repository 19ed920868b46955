//! Price series loading: CSV files and the provider chosen by a run's config.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ladderlab_core::data::{PriceSeriesProvider, ProviderError};
use ladderlab_core::domain::{validate_series, PriceSample, Token, TokenId};

use crate::config::PriceSource;
use crate::synthetic::SyntheticProvider;

/// Read a `timestamp,price,high,low` CSV. `high` and `low` may be empty.
///
/// The series is validated: timestamps non-decreasing, prices finite and positive.
pub fn load_series(path: &Path) -> Result<Vec<PriceSample>, ProviderError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| ProviderError::Io(format!("{}: {e}", path.display())))?;
    let samples = reader
        .deserialize::<PriceSample>()
        .enumerate()
        .map(|(row, record)| {
            record.map_err(|e| ProviderError::Parse(format!("{} row {}: {e}", path.display(), row + 1)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    validate_series(&samples)?;
    Ok(samples)
}

/// Provider backed by one CSV file per token. Files are read on each fetch.
#[derive(Debug, Clone, Default)]
pub struct CsvPriceProvider {
    files: BTreeMap<TokenId, PathBuf>,
}

impl CsvPriceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, token: TokenId, path: impl Into<PathBuf>) -> Self {
        self.files.insert(token, path.into());
        self
    }
}

impl PriceSeriesProvider for CsvPriceProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(
        &self,
        token: &Token,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<PriceSample>, ProviderError> {
        let path = self
            .files
            .get(&token.id)
            .ok_or_else(|| ProviderError::UnknownToken { token: token.pair() })?;
        let series = load_series(path)?;
        let lo = series.partition_point(|s| s.timestamp < from_ms);
        let hi = series.partition_point(|s| s.timestamp < to_ms);
        Ok(series[lo..hi].to_vec())
    }
}

/// Provider for one `[[runs]]` entry's price source.
pub fn provider_for(source: &PriceSource, token: TokenId) -> Box<dyn PriceSeriesProvider> {
    match source {
        PriceSource::Csv { path } => Box::new(CsvPriceProvider::new().with_file(token, path)),
        PriceSource::Synthetic {
            seed,
            start_price,
            volatility_percent,
            interval_ms,
        } => Box::new(SyntheticProvider {
            seed: *seed,
            start_price: *start_price,
            volatility_percent: *volatility_percent,
            interval_ms: *interval_ms,
        }),
    }
}
