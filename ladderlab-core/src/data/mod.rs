//! Price series sources.

pub mod provider;

pub use provider::{InMemoryProvider, PriceSeriesProvider, ProviderError};
