//! One side of a book: price levels in a sorted map.
//!
//! `BTreeMap` gives O(log n) insertion and removal at arbitrary prices and
//! deterministic iteration. Best-first order is descending for bids and
//! ascending for asks; the side knows its own direction so callers never
//! reverse by hand.

use std::collections::BTreeMap;

use types::{LevelInfo, OrderId, Price, Quantity, Side};

use super::price_level::{LevelEntry, PriceLevel};

/// All price levels on one side of a symbol's book.
#[derive(Debug, Clone)]
pub struct SideBook {
    side: Side,
    levels: BTreeMap<Price, PriceLevel>,
}

impl SideBook {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Append an order to the level at `price`, creating the level on
    /// first use.
    pub fn insert(&mut self, price: Price, order_id: OrderId, quantity: Quantity) {
        self.levels
            .entry(price)
            .or_insert_with(PriceLevel::new)
            .push_back(order_id, quantity);
    }

    /// Remove a specific order from the level at `price`, dropping the
    /// level if it empties. Returns the removed remaining quantity.
    pub fn remove_order(&mut self, price: Price, order_id: OrderId) -> Option<Quantity> {
        let level = self.levels.get_mut(&price)?;
        let removed = level.remove(order_id)?;
        if level.is_empty() {
            self.levels.remove(&price);
        }
        Some(removed)
    }

    /// Price and head entry of the best level, if any. Best is the highest
    /// bid or the lowest ask.
    pub fn peek_best(&self) -> Option<(Price, LevelEntry)> {
        let (price, level) = self.best_level()?;
        let entry = level.front()?;
        Some((price, entry))
    }

    /// Reduce the best level's head order by `qty`, removing the order and
    /// the level as they empty.
    ///
    /// Returns `(head_removed, level_removed)`, or `None` when the side is
    /// empty or `qty` exceeds the head's remaining quantity.
    pub fn fill_best(&mut self, qty: Quantity) -> Option<(bool, bool)> {
        let (price, level) = self.best_level_mut()?;
        let head_removed = level.fill_front(qty)?;
        let level_removed = level.is_empty();
        if level_removed {
            self.levels.remove(&price);
        }
        Some((head_removed, level_removed))
    }

    /// Aggregate view of the best level.
    pub fn best(&self) -> Option<LevelInfo> {
        self.best_level().map(|(price, level)| LevelInfo {
            price,
            quantity: level.total_quantity(),
            order_count: level.order_count(),
        })
    }

    /// Top `depth` levels, best first.
    pub fn depth(&self, depth: usize) -> Vec<LevelInfo> {
        let to_info = |(price, level): (&Price, &PriceLevel)| LevelInfo {
            price: *price,
            quantity: level.total_quantity(),
            order_count: level.order_count(),
        };
        match self.side {
            Side::Buy => self.levels.iter().rev().take(depth).map(to_info).collect(),
            Side::Sell => self.levels.iter().take(depth).map(to_info).collect(),
        }
    }

    /// Walk levels best-first while `accept(price)` holds, summing level
    /// quantities. Stops early once `needed` is reached. Used for the
    /// fill-or-kill dry run.
    pub fn available_while(
        &self,
        accept: impl Fn(Price) -> bool,
        needed: Quantity,
    ) -> Quantity {
        let mut available = Quantity::zero();
        let mut walk = |price: &Price, level: &PriceLevel| -> bool {
            if !accept(*price) {
                return false;
            }
            available = available + level.total_quantity();
            available < needed
        };
        match self.side {
            Side::Buy => {
                for (price, level) in self.levels.iter().rev() {
                    if !walk(price, level) {
                        break;
                    }
                }
            }
            Side::Sell => {
                for (price, level) in self.levels.iter() {
                    if !walk(price, level) {
                        break;
                    }
                }
            }
        }
        available
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    fn best_level(&self) -> Option<(Price, &PriceLevel)> {
        match self.side {
            Side::Buy => self.levels.iter().next_back(),
            Side::Sell => self.levels.iter().next(),
        }
        .map(|(price, level)| (*price, level))
    }

    fn best_level_mut(&mut self) -> Option<(Price, &mut PriceLevel)> {
        match self.side {
            Side::Buy => self.levels.iter_mut().next_back(),
            Side::Sell => self.levels.iter_mut().next(),
        }
        .map(|(price, level)| (*price, level))
    }
}
