//! Per-symbol order book.
//!
//! Owns both sorted sides, the order records, and the resting-order index,
//! and runs the price-time priority matching loop. A `SymbolBook` is only
//! ever touched inside its symbol's exclusive section; nothing here locks.

use std::collections::HashMap;

use tracing::trace;

use types::{
    Bbo, BookSnapshot, EngineError, LevelInfo, Order, OrderId, Price, Quantity, Side, Symbol,
    TradeExecution,
};

use crate::book::SideBook;
use crate::matching::crossing;
use crate::matching::executor::TradeRecorder;

/// Result of running a taker against the book.
#[derive(Debug, Default)]
pub struct MatchOutcome {
    /// Trades in generation order.
    pub trades: Vec<TradeExecution>,
    /// Makers that were completely consumed, in consumption order.
    pub filled_makers: Vec<OrderId>,
}

/// Book state for a single symbol.
///
/// Invariants, restored before every operation returns:
/// - each resting order appears in exactly one level queue and exactly one
///   index entry; the index is a bijection with the resting set
/// - level aggregates equal the sum of their queued remainders
/// - the book is never left crossed (`best_bid < best_ask` when both exist)
#[derive(Debug)]
pub struct SymbolBook {
    symbol: Symbol,
    bids: SideBook,
    asks: SideBook,
    /// Every order ever admitted on this symbol, terminal ones included;
    /// `get_order` reads from here.
    orders: HashMap<OrderId, Order>,
    /// order_id → (side, price) for orders currently resting.
    resting: HashMap<OrderId, (Side, Price)>,
    admission_seq: u64,
    event_seq: u64,
    trade_seq: u64,
}

impl SymbolBook {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            bids: SideBook::new(Side::Buy),
            asks: SideBook::new(Side::Sell),
            orders: HashMap::new(),
            resting: HashMap::new(),
            admission_seq: 0,
            event_seq: 0,
            trade_seq: 0,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Next admission sequence; strictly increasing per book, this is the
    /// time-priority order.
    pub fn next_admission_seq(&mut self) -> u64 {
        self.admission_seq += 1;
        self.admission_seq
    }

    /// Next per-symbol event sequence.
    pub fn next_event_seq(&mut self) -> u64 {
        self.event_seq += 1;
        self.event_seq
    }

    /// Store (or update) an order record.
    pub fn record_order(&mut self, order: Order) {
        self.orders.insert(order.order_id, order);
    }

    pub fn order(&self, order_id: &OrderId) -> Option<&Order> {
        self.orders.get(order_id)
    }

    /// Place a limit-priced, non-marketable remainder on its own side.
    pub fn insert_resting(&mut self, order: &Order) -> Result<(), EngineError> {
        let price = order.price.ok_or_else(|| {
            EngineError::internal(format!("order {} rests without a price", order.order_id))
        })?;
        debug_assert!(order.order_type.may_rest());
        debug_assert!(!order.remaining_quantity.is_zero());

        let side_book = match order.side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        side_book.insert(price, order.order_id, order.remaining_quantity);
        self.resting.insert(order.order_id, (order.side, price));
        trace!(order_id = %order.order_id, price = %price, "order resting");
        Ok(())
    }

    /// Cancel a resting order: remove it from its level and index, mark the
    /// record cancelled, and return the updated record.
    pub fn cancel(&mut self, order_id: OrderId) -> Result<Order, EngineError> {
        let Some(&(side, price)) = self.resting.get(&order_id) else {
            return match self.orders.get(&order_id) {
                Some(order) => Err(EngineError::InvalidState {
                    order_id,
                    status: order.status,
                }),
                None => Err(EngineError::NotFound { order_id }),
            };
        };

        let side_book = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        side_book.remove_order(price, order_id).ok_or_else(|| {
            EngineError::internal(format!("resting index points at missing order {order_id}"))
        })?;
        self.resting.remove(&order_id);

        let order = self.orders.get_mut(&order_id).ok_or_else(|| {
            EngineError::internal(format!("resting order {order_id} has no record"))
        })?;
        order.cancel_remaining();
        Ok(order.clone())
    }

    /// Run the taker against the opposite side under price-time priority.
    ///
    /// Consumes best levels first and level heads strictly FIFO; every
    /// trade executes at the maker's resting price. Stops when the taker is
    /// filled, liquidity runs out, or the next level's price is no longer
    /// acceptable. Fully consumed makers and emptied levels are removed as
    /// they go, so the book is never observed crossed.
    pub fn execute_taker(
        &mut self,
        taker: &mut Order,
        limit: Option<Price>,
        recorder: &TradeRecorder,
        now: i64,
    ) -> Result<MatchOutcome, EngineError> {
        let mut outcome = MatchOutcome::default();

        while !taker.remaining_quantity.is_zero() {
            let opposite = match taker.side {
                Side::Buy => &mut self.asks,
                Side::Sell => &mut self.bids,
            };
            let Some((level_price, head)) = opposite.peek_best() else {
                break;
            };
            if !crossing::taker_accepts(taker.side, limit, level_price) {
                break;
            }

            let fill = taker.remaining_quantity.min(head.remaining_quantity);
            self.trade_seq += 1;
            let trade = recorder.record(
                self.trade_seq,
                self.symbol.clone(),
                head.order_id,
                taker.order_id,
                taker.side,
                level_price,
                fill,
                now,
            );

            let maker = self.orders.get_mut(&head.order_id).ok_or_else(|| {
                EngineError::internal(format!("maker {} has no order record", head.order_id))
            })?;
            if !maker.apply_fill(fill) {
                return Err(EngineError::internal(format!(
                    "maker {} level entry exceeds record remainder",
                    head.order_id
                )));
            }
            let maker_filled = maker.is_filled();

            if !taker.apply_fill(fill) {
                return Err(EngineError::internal(format!(
                    "taker {} overfilled in matching loop",
                    taker.order_id
                )));
            }

            let (head_removed, _) = opposite.fill_best(fill).ok_or_else(|| {
                EngineError::internal("best level emptied mid-match".to_string())
            })?;
            if head_removed != maker_filled {
                return Err(EngineError::internal(format!(
                    "level entry and record for maker {} disagree",
                    head.order_id
                )));
            }
            if maker_filled {
                self.resting.remove(&head.order_id);
                outcome.filled_makers.push(head.order_id);
            }

            outcome.trades.push(trade);
        }

        debug_assert!(!self.is_crossed(), "matching left the book crossed");
        Ok(outcome)
    }

    /// Liquidity on the opposite side at prices the taker accepts, walked
    /// best-first with early exit once `needed` is covered. The
    /// fill-or-kill dry run.
    pub fn available_opposite(
        &self,
        taker_side: Side,
        limit: Option<Price>,
        needed: Quantity,
    ) -> Quantity {
        let opposite = match taker_side {
            Side::Buy => &self.asks,
            Side::Sell => &self.bids,
        };
        opposite.available_while(|price| crossing::taker_accepts(taker_side, limit, price), needed)
    }

    pub fn best_bid(&self) -> Option<LevelInfo> {
        self.bids.best()
    }

    pub fn best_ask(&self) -> Option<LevelInfo> {
        self.asks.best()
    }

    pub fn bbo(&self, timestamp: i64) -> Bbo {
        Bbo {
            symbol: self.symbol.clone(),
            best_bid: self.bids.best(),
            best_ask: self.asks.best(),
            timestamp,
        }
    }

    /// Top `depth` levels per side, best first.
    pub fn snapshot(&self, depth: usize, timestamp: i64) -> BookSnapshot {
        BookSnapshot {
            symbol: self.symbol.clone(),
            bids: self.bids.depth(depth),
            asks: self.asks.depth(depth),
            timestamp,
        }
    }

    pub fn is_crossed(&self) -> bool {
        match (self.bids.best(), self.asks.best()) {
            (Some(bid), Some(ask)) => crossing::crosses(bid.price, ask.price),
            _ => false,
        }
    }

    pub fn resting_count(&self) -> usize {
        self.resting.len()
    }

    /// Structural self-check used by tests and post-operation assertions:
    /// index bijection, record/level agreement, and the uncrossed property.
    pub fn verify_integrity(&self) -> Result<(), String> {
        for (order_id, &(side, price)) in &self.resting {
            let order = self
                .orders
                .get(order_id)
                .ok_or_else(|| format!("resting {order_id} has no record"))?;
            if order.status.is_terminal() {
                return Err(format!("resting {order_id} is terminal ({:?})", order.status));
            }
            if order.side != side || order.price != Some(price) {
                return Err(format!("index entry for {order_id} disagrees with record"));
            }
            if !order.invariant_holds() {
                return Err(format!("record {order_id} violates fill invariant"));
            }
        }

        let bid_total: usize = self.bids.depth(usize::MAX).iter().map(|l| l.order_count as usize).sum();
        let ask_total: usize = self.asks.depth(usize::MAX).iter().map(|l| l.order_count as usize).sum();
        if bid_total + ask_total != self.resting.len() {
            return Err(format!(
                "index has {} entries but levels hold {} orders",
                self.resting.len(),
                bid_total + ask_total
            ));
        }

        if self.is_crossed() {
            return Err("book is crossed".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{OrderStatus, OrderType};

    fn book() -> SymbolBook {
        SymbolBook::new(Symbol::new("BTC-USDT"))
    }

    fn qty(s: &str) -> Quantity {
        Quantity::parse(s).unwrap()
    }

    fn rest_order(book: &mut SymbolBook, side: Side, price: u64, quantity: &str) -> Order {
        let seq = book.next_admission_seq();
        let order = Order::new(
            OrderId::new(),
            book.symbol().clone(),
            side,
            OrderType::Limit,
            qty(quantity),
            Some(Price::from_u64(price)),
            seq,
            0,
            None,
        );
        book.record_order(order.clone());
        book.insert_resting(&order).unwrap();
        order
    }

    fn taker(book: &mut SymbolBook, side: Side, order_type: OrderType, price: Option<u64>, quantity: &str) -> Order {
        let seq = book.next_admission_seq();
        Order::new(
            OrderId::new(),
            book.symbol().clone(),
            side,
            order_type,
            qty(quantity),
            price.map(Price::from_u64),
            seq,
            0,
            None,
        )
    }

    #[test]
    fn taker_consumes_best_level_at_maker_price() {
        let mut book = book();
        rest_order(&mut book, Side::Sell, 100, "1.0");

        let mut buy = taker(&mut book, Side::Buy, OrderType::Limit, Some(101), "1.0");
        let limit = buy.price;
        let recorder = TradeRecorder::default();
        let outcome = book.execute_taker(&mut buy, limit, &recorder, 0).unwrap();

        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].price, Price::from_u64(100));
        assert_eq!(outcome.trades[0].aggressor_side, Side::Buy);
        assert!(buy.is_filled());
        assert_eq!(outcome.filled_makers.len(), 1);
        assert!(book.best_ask().is_none());
        book.verify_integrity().unwrap();
    }

    #[test]
    fn fifo_within_level() {
        let mut book = book();
        let first = rest_order(&mut book, Side::Sell, 100, "1.0");
        let second = rest_order(&mut book, Side::Sell, 100, "1.0");

        let mut buy = taker(&mut book, Side::Buy, OrderType::Market, None, "1.5");
        let recorder = TradeRecorder::default();
        let outcome = book.execute_taker(&mut buy, None, &recorder, 0).unwrap();

        assert_eq!(outcome.trades.len(), 2);
        assert_eq!(outcome.trades[0].maker_order_id, first.order_id);
        assert_eq!(outcome.trades[0].quantity, qty("1.0"));
        assert_eq!(outcome.trades[1].maker_order_id, second.order_id);
        assert_eq!(outcome.trades[1].quantity, qty("0.5"));

        assert_eq!(book.order(&first.order_id).unwrap().status, OrderStatus::Filled);
        let b = book.order(&second.order_id).unwrap();
        assert_eq!(b.status, OrderStatus::PartiallyFilled);
        assert_eq!(b.remaining_quantity, qty("0.5"));
        book.verify_integrity().unwrap();
    }

    #[test]
    fn limit_stops_at_unacceptable_level() {
        let mut book = book();
        rest_order(&mut book, Side::Sell, 100, "1.0");
        rest_order(&mut book, Side::Sell, 102, "1.0");

        let mut buy = taker(&mut book, Side::Buy, OrderType::Limit, Some(101), "3.0");
        let limit = buy.price;
        let recorder = TradeRecorder::default();
        let outcome = book.execute_taker(&mut buy, limit, &recorder, 0).unwrap();

        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(buy.remaining_quantity, qty("2.0"));
        assert_eq!(book.best_ask().unwrap().price, Price::from_u64(102));
        book.verify_integrity().unwrap();
    }

    #[test]
    fn cancel_restores_book_and_marks_record() {
        let mut book = book();
        let order = rest_order(&mut book, Side::Buy, 99, "1.0");
        assert_eq!(book.resting_count(), 1);

        let cancelled = book.cancel(order.order_id).unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(book.resting_count(), 0);
        assert!(book.best_bid().is_none());
        book.verify_integrity().unwrap();
    }

    #[test]
    fn double_cancel_is_invalid_state() {
        let mut book = book();
        let order = rest_order(&mut book, Side::Buy, 99, "1.0");
        book.cancel(order.order_id).unwrap();

        let err = book.cancel(order.order_id).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState { .. }));
    }

    #[test]
    fn cancel_unknown_is_not_found() {
        let mut book = book();
        let err = book.cancel(OrderId::new()).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[test]
    fn available_opposite_respects_limit() {
        let mut book = book();
        rest_order(&mut book, Side::Sell, 100, "1.0");
        rest_order(&mut book, Side::Sell, 102, "5.0");

        let available =
            book.available_opposite(Side::Buy, Some(Price::from_u64(101)), qty("10.0"));
        assert_eq!(available, qty("1.0"));
    }

    #[test]
    fn snapshot_orders_sides_best_first() {
        let mut book = book();
        rest_order(&mut book, Side::Buy, 99, "1.0");
        rest_order(&mut book, Side::Buy, 98, "2.0");
        rest_order(&mut book, Side::Sell, 101, "1.5");
        rest_order(&mut book, Side::Sell, 103, "0.5");

        let snap = book.snapshot(10, 0);
        assert_eq!(snap.bids[0].price, Price::from_u64(99));
        assert_eq!(snap.bids[1].price, Price::from_u64(98));
        assert_eq!(snap.asks[0].price, Price::from_u64(101));
        assert_eq!(snap.asks[1].price, Price::from_u64(103));
        assert!(!book.is_crossed());
    }
}
