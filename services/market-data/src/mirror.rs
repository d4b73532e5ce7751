//! In-memory book mirror rebuilt from the engine's event stream.
//!
//! The dissemination layer never queries the engine; subscribe-time
//! snapshots are served from this mirror. It tracks resting orders from
//! accept/trade/cancel events, compresses empty levels, and enforces
//! monotonic event sequencing.

use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use matching_engine::{EngineEvent, EventPayload};
use types::{LevelInfo, OrderId, Price, Quantity, Side, Symbol};

#[derive(Debug, Clone)]
struct MirrorLevel {
    quantity: Quantity,
    order_count: u32,
}

#[derive(Debug, Clone)]
struct RestingRef {
    side: Side,
    price: Price,
    remaining: Quantity,
}

/// Mirrored book state for one symbol.
#[derive(Debug)]
pub struct BookMirror {
    symbol: Symbol,
    bids: BTreeMap<Price, MirrorLevel>,
    asks: BTreeMap<Price, MirrorLevel>,
    orders: HashMap<OrderId, RestingRef>,
    last_sequence: u64,
    /// Last best bid/ask published to subscribers, for change detection.
    published_bbo: Option<(Option<LevelInfo>, Option<LevelInfo>)>,
}

impl BookMirror {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            orders: HashMap::new(),
            last_sequence: 0,
            published_bbo: None,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Apply one engine event. Stale or duplicate sequences are dropped.
    pub fn apply(&mut self, event: &EngineEvent) {
        if event.sequence <= self.last_sequence {
            warn!(
                symbol = %self.symbol,
                sequence = event.sequence,
                last = self.last_sequence,
                "dropping stale event"
            );
            return;
        }
        self.last_sequence = event.sequence;

        match &event.payload {
            EventPayload::OrderAccepted {
                order_id,
                side,
                price,
                quantity,
                ..
            } => self.add_order(*order_id, *side, *price, *quantity),
            EventPayload::TradeExecuted { trade } => {
                self.reduce_maker(trade.maker_order_id, trade.quantity)
            }
            EventPayload::OrderCanceled { order_id, .. } => self.remove_order(*order_id),
            // Lifecycle and book-changed events do not alter mirrored depth.
            _ => {}
        }
    }

    fn add_order(&mut self, order_id: OrderId, side: Side, price: Price, quantity: Quantity) {
        let levels = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        let level = levels.entry(price).or_insert(MirrorLevel {
            quantity: Quantity::zero(),
            order_count: 0,
        });
        level.quantity = level.quantity + quantity;
        level.order_count += 1;

        self.orders.insert(
            order_id,
            RestingRef {
                side,
                price,
                remaining: quantity,
            },
        );
    }

    fn reduce_maker(&mut self, maker: OrderId, quantity: Quantity) {
        let Some(resting) = self.orders.get_mut(&maker) else {
            // Taker-side fills never touch the mirror.
            return;
        };
        resting.remaining = resting
            .remaining
            .checked_sub(quantity)
            .unwrap_or_else(Quantity::zero);
        let done = resting.remaining.is_zero();
        let (side, price) = (resting.side, resting.price);
        if done {
            self.orders.remove(&maker);
        }

        let levels = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        if let Some(level) = levels.get_mut(&price) {
            level.quantity = level
                .quantity
                .checked_sub(quantity)
                .unwrap_or_else(Quantity::zero);
            if done {
                level.order_count = level.order_count.saturating_sub(1);
            }
            if level.quantity.is_zero() || level.order_count == 0 {
                levels.remove(&price);
            }
        }
    }

    fn remove_order(&mut self, order_id: OrderId) {
        // Only resting orders are mirrored; a cancelled IOC/market
        // remainder was never here.
        let Some(resting) = self.orders.remove(&order_id) else {
            return;
        };
        let levels = match resting.side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        if let Some(level) = levels.get_mut(&resting.price) {
            level.quantity = level
                .quantity
                .checked_sub(resting.remaining)
                .unwrap_or_else(Quantity::zero);
            level.order_count = level.order_count.saturating_sub(1);
            if level.quantity.is_zero() || level.order_count == 0 {
                levels.remove(&resting.price);
            }
        }
    }

    /// Top `depth` levels per side, best first.
    pub fn depth(&self, depth: usize) -> (Vec<LevelInfo>, Vec<LevelInfo>) {
        let bids = self
            .bids
            .iter()
            .rev()
            .take(depth)
            .map(|(price, level)| LevelInfo {
                price: *price,
                quantity: level.quantity,
                order_count: level.order_count,
            })
            .collect();
        let asks = self
            .asks
            .iter()
            .take(depth)
            .map(|(price, level)| LevelInfo {
                price: *price,
                quantity: level.quantity,
                order_count: level.order_count,
            })
            .collect();
        (bids, asks)
    }

    /// Record the BBO published with a committed book change; returns
    /// whether it differs from the previously published one.
    pub fn observe_bbo(
        &mut self,
        best_bid: Option<LevelInfo>,
        best_ask: Option<LevelInfo>,
    ) -> bool {
        let current = (best_bid, best_ask);
        let changed = self
            .published_bbo
            .as_ref()
            .map_or(true, |previous| *previous != current);
        self.published_bbo = Some(current);
        changed
    }
}
