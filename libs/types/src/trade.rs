//! Trade execution records.

use crate::ids::{OrderId, Symbol, TradeId};
use crate::numeric::{Price, Quantity};
use crate::order::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An executed trade between a resting maker and an incoming taker.
///
/// Immutable once emitted. The price is always the maker's resting price;
/// a crossing taker never executes worse than the best available level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeExecution {
    pub trade_id: TradeId,
    /// Per-symbol monotonic trade sequence.
    pub sequence: u64,
    pub symbol: Symbol,
    pub price: Price,
    pub quantity: Quantity,
    /// Side of the incoming (liquidity-taking) order.
    pub aggressor_side: Side,
    pub maker_order_id: OrderId,
    pub taker_order_id: OrderId,
    /// Unix nanoseconds at execution.
    pub executed_at: i64,
    /// Fee charged to the taker, if a fee hook is installed.
    pub fee: Option<Decimal>,
}

impl TradeExecution {
    /// Notional value of the trade (price × quantity).
    pub fn trade_value(&self) -> Decimal {
        self.price.as_decimal() * self.quantity.as_decimal()
    }
}
