//! Trade construction and the post-match fee hook.

use rust_decimal::Decimal;
use std::sync::Arc;

use types::{OrderId, Price, Quantity, Side, Symbol, TradeExecution, TradeId};

/// Post-match fee computation, applied to each trade as it is generated.
///
/// Fee policy lives outside the matching core; the engine only records the
/// result on the trade. The default installation charges nothing.
pub trait FeeHook: Send + Sync {
    fn taker_fee(&self, price: Price, quantity: Quantity) -> Option<Decimal>;
}

/// No-fee default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFees;

impl FeeHook for NoFees {
    fn taker_fee(&self, _price: Price, _quantity: Quantity) -> Option<Decimal> {
        None
    }
}

/// Builds immutable trade records with maker-price execution.
pub struct TradeRecorder {
    fee_hook: Arc<dyn FeeHook>,
}

impl TradeRecorder {
    pub fn new(fee_hook: Arc<dyn FeeHook>) -> Self {
        Self { fee_hook }
    }

    /// Record one execution. `price` is the maker's resting price and
    /// `sequence` the per-symbol trade sequence assigned by the book.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &self,
        sequence: u64,
        symbol: Symbol,
        maker_order_id: OrderId,
        taker_order_id: OrderId,
        aggressor_side: Side,
        price: Price,
        quantity: Quantity,
        executed_at: i64,
    ) -> TradeExecution {
        TradeExecution {
            trade_id: TradeId::new(),
            sequence,
            symbol,
            price,
            quantity,
            aggressor_side,
            maker_order_id,
            taker_order_id,
            executed_at,
            fee: self.fee_hook.taker_fee(price, quantity),
        }
    }
}

impl Default for TradeRecorder {
    fn default() -> Self {
        Self::new(Arc::new(NoFees))
    }
}
