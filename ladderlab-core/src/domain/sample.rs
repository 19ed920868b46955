//! Price samples and series validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::order::Side;

/// One price observation (tick or candle close) for a single token.
///
/// `high`/`low` are optional; when present they enable intrabar threshold
/// checks against the bar's extremes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
}

#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("timestamp goes backwards at index {index}: {previous} > {current}")]
    NonMonotonic {
        index: usize,
        previous: i64,
        current: i64,
    },
    #[error("invalid price {price} at index {index}")]
    InvalidPrice { index: usize, price: f64 },
}

impl PriceSample {
    pub fn new(timestamp: i64, price: f64) -> Self {
        Self {
            timestamp,
            price,
            high: None,
            low: None,
        }
    }

    pub fn with_range(timestamp: i64, price: f64, high: f64, low: f64) -> Self {
        Self {
            timestamp,
            price,
            high: Some(high),
            low: Some(low),
        }
    }

    /// Returns true if price (and any extreme) is finite and positive, and
    /// the extremes bracket the price.
    pub fn is_sane(&self) -> bool {
        let positive = |p: f64| p.is_finite() && p > 0.0;
        if !positive(self.price) {
            return false;
        }
        match (self.high, self.low) {
            (Some(h), Some(l)) => positive(h) && positive(l) && h >= self.price && l <= self.price,
            (Some(h), None) => positive(h) && h >= self.price,
            (None, Some(l)) => positive(l) && l <= self.price,
            (None, None) => true,
        }
    }

    /// The worst price seen in this sample for a position on `side`.
    pub fn adverse_extreme(&self, side: Side) -> f64 {
        match side {
            Side::Buy => self.low.unwrap_or(self.price),
            Side::Sell => self.high.unwrap_or(self.price),
        }
    }

    /// The best price seen in this sample for a position on `side`.
    pub fn favorable_extreme(&self, side: Side) -> f64 {
        match side {
            Side::Buy => self.high.unwrap_or(self.price),
            Side::Sell => self.low.unwrap_or(self.price),
        }
    }
}

/// Validate a price series: non-decreasing timestamps, sane prices.
///
/// Gaps are permitted; no resampling is performed.
pub fn validate_series(samples: &[PriceSample]) -> Result<(), SeriesError> {
    for (index, sample) in samples.iter().enumerate() {
        if !sample.is_sane() {
            return Err(SeriesError::InvalidPrice {
                index,
                price: sample.price,
            });
        }
        if index > 0 {
            let previous = samples[index - 1].timestamp;
            if sample.timestamp < previous {
                return Err(SeriesError::NonMonotonic {
                    index,
                    previous,
                    current: sample.timestamp,
                });
            }
        }
    }
    Ok(())
}
