use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! surrogate_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

surrogate_id!(
    /// Token (tradable instrument) ID
    TokenId
);
surrogate_id!(
    /// Strategy ID
    StrategyId
);
surrogate_id!(
    /// Target (ladder leg) ID
    TargetId
);
surrogate_id!(
    /// Order (position) ID
    OrderId
);
surrogate_id!(
    /// User ID, present on live orders only
    UserId
);

/// Deterministic run ID (content hash of request + strategy book)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    /// BLAKE3 over the canonical bytes, hex encoded.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sequential ID generator owned by a single run.
///
/// Starts at 1 so that `OrderId(0)` never appears in a ledger.
#[derive(Debug, Clone)]
pub struct IdGen {
    next: u64,
}

impl IdGen {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_order_id(&mut self) -> OrderId {
        let id = OrderId(self.next);
        self.next += 1;
        id
    }
}

impl Default for IdGen {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_deterministic() {
        let a = RunId::from_bytes(b"btc-2024-strategy-7");
        let b = RunId::from_bytes(b"btc-2024-strategy-7");
        assert_eq!(a, b);
        assert_eq!(a.0.len(), 64);
    }

    #[test]
    fn run_id_differs_for_different_input() {
        assert_ne!(RunId::from_bytes(b"a"), RunId::from_bytes(b"b"));
    }

    #[test]
    fn id_gen_is_sequential_from_one() {
        let mut ids = IdGen::new();
        assert_eq!(ids.next_order_id(), OrderId(1));
        assert_eq!(ids.next_order_id(), OrderId(2));
    }

    #[test]
    fn surrogate_ids_serialize_as_plain_numbers() {
        let json = serde_json::to_string(&StrategyId(42)).unwrap();
        assert_eq!(json, "42");
    }
}
