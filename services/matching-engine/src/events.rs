//! Events emitted by the engine toward the dissemination layer.
//!
//! The engine pushes one `EventBatch` per committed mutating operation,
//! while still inside that symbol's exclusive section. Batches on the
//! stream therefore arrive in commit order per symbol, and the events of
//! one operation are contiguous. The channel is unbounded so emission
//! never blocks the matching path; the consumer applies its own
//! backpressure per subscriber.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use types::{Bbo, OrderId, Price, Quantity, Side, Symbol, TradeExecution};

/// One engine event with its per-symbol sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineEvent {
    /// Per-symbol monotonic sequence, assigned at emission.
    pub sequence: u64,
    /// Unix nanoseconds of the originating operation.
    pub timestamp: i64,
    pub payload: EventPayload,
}

/// Event payloads, in the vocabulary of the book they describe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EventPayload {
    /// An order (or its remainder) was placed on the book.
    OrderAccepted {
        order_id: OrderId,
        symbol: Symbol,
        side: Side,
        price: Price,
        /// Quantity that went to rest (the unfilled remainder).
        quantity: Quantity,
    },

    /// A submission failed validation; nothing was mutated.
    OrderRejected {
        order_id: OrderId,
        symbol: Symbol,
        reason: String,
    },

    OrderPartiallyFilled {
        order_id: OrderId,
        symbol: Symbol,
        filled_quantity: Quantity,
        remaining_quantity: Quantity,
    },

    OrderFilled {
        order_id: OrderId,
        symbol: Symbol,
    },

    /// An order stopped resting with quantity left (user cancel, or an
    /// IOC/market/FOK remainder).
    OrderCanceled {
        order_id: OrderId,
        symbol: Symbol,
        side: Side,
        price: Option<Price>,
        remaining_quantity: Quantity,
    },

    TradeExecuted { trade: TradeExecution },

    /// Committed top-of-book after a mutation that changed the book.
    BookChanged { bbo: Bbo },
}

impl EventPayload {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            EventPayload::OrderAccepted { .. } => "order_accepted",
            EventPayload::OrderRejected { .. } => "order_rejected",
            EventPayload::OrderPartiallyFilled { .. } => "order_partially_filled",
            EventPayload::OrderFilled { .. } => "order_filled",
            EventPayload::OrderCanceled { .. } => "order_canceled",
            EventPayload::TradeExecuted { .. } => "trade_executed",
            EventPayload::BookChanged { .. } => "book_changed",
        }
    }
}

/// All events of one committed operation, pushed atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct EventBatch {
    pub symbol: Symbol,
    pub events: Vec<EngineEvent>,
}

pub type EventSender = mpsc::UnboundedSender<EventBatch>;
pub type EventReceiver = mpsc::UnboundedReceiver<EventBatch>;

/// Create the engine → dissemination channel.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_serde_is_tagged() {
        let payload = EventPayload::OrderFilled {
            order_id: OrderId::new(),
            symbol: Symbol::new("BTC-USDT"),
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"event_type\":\"order_filled\""));
        let back: EventPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(payload, back);
    }

    #[test]
    fn labels_match_variants() {
        let payload = EventPayload::OrderRejected {
            order_id: OrderId::new(),
            symbol: Symbol::new("BTC-USDT"),
            reason: "bad".to_string(),
        };
        assert_eq!(payload.label(), "order_rejected");
    }
}
