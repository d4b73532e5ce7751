//! Read-only views of book state: levels, BBO, and depth snapshots.

use crate::ids::Symbol;
use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};

/// Aggregate view of a single price level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelInfo {
    pub price: Price,
    pub quantity: Quantity,
    pub order_count: u32,
}

/// Best bid and offer for a symbol. Either side may be empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bbo {
    pub symbol: Symbol,
    pub best_bid: Option<LevelInfo>,
    pub best_ask: Option<LevelInfo>,
    /// Unix nanoseconds at capture.
    pub timestamp: i64,
}

/// Point-in-time depth snapshot, taken atomically inside the owning
/// book's exclusive section. Bids descending, asks ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub symbol: Symbol,
    pub bids: Vec<LevelInfo>,
    pub asks: Vec<LevelInfo>,
    pub timestamp: i64,
}

impl BookSnapshot {
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_serde_roundtrip() {
        let snap = BookSnapshot {
            symbol: Symbol::new("BTC-USDT"),
            bids: vec![LevelInfo {
                price: Price::from_u64(50_000),
                quantity: Quantity::parse("1.5").unwrap(),
                order_count: 2,
            }],
            asks: vec![],
            timestamp: 1_708_123_456_789_000_000,
        };
        let json = serde_json::to_string(&snap).unwrap();
        let back: BookSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snap, back);
        assert!(!snap.is_empty());
    }
}
