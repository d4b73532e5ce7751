//! Client-facing feed messages.
//!
//! Every message carries its `type`, symbol, payload, and timestamp.
//! Snapshots include a SHA-256 checksum over the level data so clients can
//! verify integrity after a reconnect.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use types::{LevelInfo, Symbol, TradeExecution};

/// Messages on the market-data channel.
///
/// A subscription always starts with one `Snapshot`; `BookUpdate` follows
/// every committed mutation that changed the book, and `BboUpdate` is
/// added whenever the best bid or ask moved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    Snapshot {
        symbol: Symbol,
        bids: Vec<LevelInfo>,
        asks: Vec<LevelInfo>,
        checksum: String,
        timestamp: i64,
    },
    BookUpdate {
        symbol: Symbol,
        best_bid: Option<LevelInfo>,
        best_ask: Option<LevelInfo>,
        timestamp: i64,
    },
    BboUpdate {
        symbol: Symbol,
        best_bid: Option<LevelInfo>,
        best_ask: Option<LevelInfo>,
        timestamp: i64,
    },
}

impl FeedMessage {
    pub fn symbol(&self) -> &Symbol {
        match self {
            FeedMessage::Snapshot { symbol, .. }
            | FeedMessage::BookUpdate { symbol, .. }
            | FeedMessage::BboUpdate { symbol, .. } => symbol,
        }
    }
}

/// Messages on the trade channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TradeMessage {
    Trade {
        symbol: Symbol,
        trade: TradeExecution,
        timestamp: i64,
    },
}

/// SHA-256 over the level data, hex-encoded.
pub fn book_checksum(bids: &[LevelInfo], asks: &[LevelInfo]) -> String {
    let mut hasher = Sha256::new();
    for level in bids {
        hasher.update(level.price.to_string().as_bytes());
        hasher.update(b":");
        hasher.update(level.quantity.to_string().as_bytes());
        hasher.update(b"|");
    }
    hasher.update(b"---");
    for level in asks {
        hasher.update(level.price.to_string().as_bytes());
        hasher.update(b":");
        hasher.update(level.quantity.to_string().as_bytes());
        hasher.update(b"|");
    }
    format!("{:x}", hasher.finalize())
}
