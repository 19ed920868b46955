//! Tradable instruments.

use super::ids::TokenId;
use serde::{Deserialize, Serialize};

/// Instrument metadata. Immutable once referenced by an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    pub id: TokenId,
    pub name: String,
    /// Quote-currency symbol (e.g. "USDT").
    pub quote_symbol: String,
    /// Smallest tradable quantity; positions below it are not opened.
    #[serde(default)]
    pub min_order_qty: f64,
    /// Maximum leverage any strategy may apply on this token.
    #[serde(default = "default_leverage_cap")]
    pub leverage_cap: f64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_leverage_cap() -> f64 {
    1.0
}

fn default_active() -> bool {
    true
}

impl Token {
    pub fn new(id: TokenId, name: impl Into<String>, quote_symbol: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            quote_symbol: quote_symbol.into(),
            min_order_qty: 0.0,
            leverage_cap: default_leverage_cap(),
            active: true,
        }
    }

    /// Display pair, e.g. "BTC/USDT".
    pub fn pair(&self) -> String {
        format!("{}/{}", self.name, self.quote_symbol)
    }

    /// Whether `quantity` meets the minimum order size.
    pub fn accepts_quantity(&self, quantity: f64) -> bool {
        quantity > 0.0 && quantity >= self.min_order_qty
    }
}
