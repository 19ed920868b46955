//! Seeded synthetic price series for demos and tests.
//!
//! Produces a bounded random walk with intrabar high/low. These are clearly
//! fake; reports built from them should say so.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ladderlab_core::data::{PriceSeriesProvider, ProviderError};
use ladderlab_core::domain::{PriceSample, Token};

/// Random-walk provider. The same seed, token and range always give the
/// same series.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticProvider {
    pub seed: u64,
    pub start_price: f64,
    /// Largest single-step move, in percent.
    pub volatility_percent: f64,
    pub interval_ms: i64,
}

impl SyntheticProvider {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            start_price: 100.0,
            volatility_percent: 0.5,
            interval_ms: 3_600_000,
        }
    }

    /// Generate samples at `from_ms, from_ms + interval, ...` below `to_ms`.
    pub fn generate(&self, token: &Token, from_ms: i64, to_ms: i64) -> Vec<PriceSample> {
        // Mix the token into the seed so different tokens get different walks.
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(&token.id.0.to_le_bytes());
        hasher.update(token.name.as_bytes());
        let mut rng = StdRng::from_seed(*hasher.finalize().as_bytes());

        let vol = self.volatility_percent / 100.0;
        let mut price = self.start_price;
        let mut samples = Vec::new();
        let mut ts = from_ms;
        while ts < to_ms {
            let (step, up, down) = if vol > 0.0 {
                (
                    rng.gen_range(-vol..=vol),
                    rng.gen_range(0.0..=vol / 2.0),
                    rng.gen_range(0.0..=vol / 2.0),
                )
            } else {
                (0.0, 0.0, 0.0)
            };
            price *= 1.0 + step;
            samples.push(PriceSample::with_range(
                ts,
                price,
                price * (1.0 + up),
                price * (1.0 - down),
            ));
            ts += self.interval_ms;
        }
        samples
    }
}

impl PriceSeriesProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        token: &Token,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<PriceSample>, ProviderError> {
        if self.interval_ms <= 0 {
            return Err(ProviderError::Parse(format!(
                "synthetic interval must be positive, got {}",
                self.interval_ms
            )));
        }
        Ok(self.generate(token, from_ms, to_ms))
    }
}
