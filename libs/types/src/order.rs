//! Order lifecycle types.

use crate::ids::{OrderId, Symbol};
use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Order execution policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Execute at any price; remainder is cancelled when liquidity runs out.
    Market,
    /// Execute up to the limit price; remainder rests on the book.
    Limit,
    /// Immediate-or-cancel: limit-priced, never rests.
    Ioc,
    /// Fill-or-kill: limit-priced, fills in full atomically or not at all.
    Fok,
}

impl OrderType {
    /// Whether a price must accompany this order type.
    pub fn requires_price(&self) -> bool {
        !matches!(self, OrderType::Market)
    }

    /// Whether an unfilled remainder may rest on the book.
    pub fn may_rest(&self) -> bool {
        matches!(self, OrderType::Limit)
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Market => write!(f, "market"),
            OrderType::Limit => write!(f, "limit"),
            OrderType::Ioc => write!(f, "ioc"),
            OrderType::Fok => write!(f, "fok"),
        }
    }
}

/// Order state machine.
///
/// `Filled`, `Cancelled`, and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

/// A single order as recorded by the engine.
///
/// Invariant: `filled_quantity + remaining_quantity == quantity`, and the
/// status is coherent with the fill ratio while the order is live
/// (`Pending` means zero filled, `PartiallyFilled` means strictly between
/// zero and the full quantity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Quantity,
    /// Absent for market orders, present for limit/IOC/FOK.
    pub price: Option<Price>,
    pub filled_quantity: Quantity,
    pub remaining_quantity: Quantity,
    pub status: OrderStatus,
    /// Per-book admission sequence. Strictly increasing within a book;
    /// this, not the wall clock, is what time priority is decided on.
    pub sequence: u64,
    /// Wall-clock admission time in Unix nanoseconds, metadata only.
    pub created_at: i64,
    pub user_id: Option<String>,
}

impl Order {
    /// Create a freshly admitted, unfilled order.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_id: OrderId,
        symbol: Symbol,
        side: Side,
        order_type: OrderType,
        quantity: Quantity,
        price: Option<Price>,
        sequence: u64,
        created_at: i64,
        user_id: Option<String>,
    ) -> Self {
        Self {
            order_id,
            symbol,
            side,
            order_type,
            quantity,
            price,
            filled_quantity: Quantity::zero(),
            remaining_quantity: quantity,
            status: OrderStatus::Pending,
            sequence,
            created_at,
            user_id,
        }
    }

    pub fn is_filled(&self) -> bool {
        self.remaining_quantity.is_zero()
    }

    /// `filled + remaining == quantity` and status/fill coherence.
    pub fn invariant_holds(&self) -> bool {
        if self.filled_quantity + self.remaining_quantity != self.quantity {
            return false;
        }
        match self.status {
            OrderStatus::Pending => self.filled_quantity.is_zero(),
            OrderStatus::PartiallyFilled => {
                !self.filled_quantity.is_zero() && !self.remaining_quantity.is_zero()
            }
            OrderStatus::Filled => self.remaining_quantity.is_zero(),
            // Terminal by cancel/reject: any fill ratio below full.
            OrderStatus::Cancelled | OrderStatus::Rejected => true,
        }
    }

    /// Record a fill of `qty` and move the status accordingly.
    ///
    /// Returns `false` (leaving the order untouched) if `qty` exceeds the
    /// remaining quantity; the caller treats that as an internal error.
    #[must_use]
    pub fn apply_fill(&mut self, qty: Quantity) -> bool {
        let Some(remaining) = self.remaining_quantity.checked_sub(qty) else {
            return false;
        };
        self.filled_quantity = self.filled_quantity + qty;
        self.remaining_quantity = remaining;
        self.status = if self.remaining_quantity.is_zero() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        debug_assert!(self.invariant_holds());
        true
    }

    /// Cancel whatever is left of the order. Fills already made stand.
    pub fn cancel_remaining(&mut self) {
        debug_assert!(!self.status.is_terminal());
        self.status = OrderStatus::Cancelled;
    }

    /// Mark a never-admitted order as rejected.
    pub fn reject(&mut self) {
        self.status = OrderStatus::Rejected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order(qty: &str) -> Order {
        Order::new(
            OrderId::new(),
            Symbol::new("BTC-USDT"),
            Side::Buy,
            OrderType::Limit,
            Quantity::parse(qty).unwrap(),
            Some(Price::from_u64(50_000)),
            1,
            1_708_123_456_789_000_000,
            None,
        )
    }

    #[test]
    fn side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }

    #[test]
    fn order_type_price_rules() {
        assert!(!OrderType::Market.requires_price());
        assert!(OrderType::Limit.requires_price());
        assert!(OrderType::Ioc.requires_price());
        assert!(OrderType::Fok.requires_price());
        assert!(OrderType::Limit.may_rest());
        assert!(!OrderType::Ioc.may_rest());
    }

    #[test]
    fn new_order_is_pending_and_coherent() {
        let order = sample_order("1.0");
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.remaining_quantity, order.quantity);
        assert!(order.invariant_holds());
    }

    #[test]
    fn partial_then_full_fill() {
        let mut order = sample_order("1.0");

        assert!(order.apply_fill(Quantity::parse("0.3").unwrap()));
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
        assert!(order.invariant_holds());

        assert!(order.apply_fill(Quantity::parse("0.7").unwrap()));
        assert_eq!(order.status, OrderStatus::Filled);
        assert!(order.is_filled());
        assert!(order.invariant_holds());
    }

    #[test]
    fn overfill_is_refused() {
        let mut order = sample_order("1.0");
        assert!(!order.apply_fill(Quantity::parse("1.5").unwrap()));
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.invariant_holds());
    }

    #[test]
    fn cancel_after_partial_fill_keeps_fills() {
        let mut order = sample_order("2.0");
        assert!(order.apply_fill(Quantity::parse("0.5").unwrap()));
        order.cancel_remaining();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.filled_quantity, Quantity::parse("0.5").unwrap());
        assert!(order.invariant_holds());
    }

    #[test]
    fn serde_uses_lowercase_tags() {
        let order = sample_order("1.0");
        let json = serde_json::to_string(&order).unwrap();
        assert!(json.contains("\"side\":\"buy\""));
        assert!(json.contains("\"order_type\":\"limit\""));
        assert!(json.contains("\"status\":\"pending\""));
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, back);
    }
}
