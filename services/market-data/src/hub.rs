//! Subscriber registry and fan-out.
//!
//! Two channels per symbol: market-data (snapshot, book updates, BBO
//! updates) and trades. Each subscriber owns a bounded queue; publishing
//! uses `try_send` so the hot path never waits. A full queue evicts the
//! subscriber, a closed one is quietly removed. Registry and mirrors sit
//! behind one mutex that is independent of any engine lock.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use matching_engine::{EventBatch, EventPayload};
use types::time::unix_nanos;
use types::Symbol;

use crate::config::HubConfig;
use crate::messages::{book_checksum, FeedMessage, TradeMessage};
use crate::mirror::BookMirror;

/// Handle identifying one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

struct Sink<T> {
    id: SubscriberId,
    tx: mpsc::Sender<T>,
}

#[derive(Default)]
struct HubState {
    mirrors: HashMap<Symbol, BookMirror>,
    feed_subs: HashMap<Symbol, Vec<Sink<FeedMessage>>>,
    trade_subs: HashMap<Symbol, Vec<Sink<TradeMessage>>>,
    next_id: u64,
}

/// Per-symbol dissemination hub.
pub struct MarketDataHub {
    config: HubConfig,
    state: Mutex<HubState>,
}

impl MarketDataHub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            config,
            state: Mutex::new(HubState::default()),
        }
    }

    /// Register a market-data subscriber. The receiver's first message is
    /// always a snapshot of the mirrored book, enqueued atomically with
    /// registration so no update can slip in front of it.
    pub fn subscribe_market_data(
        &self,
        symbol: Symbol,
    ) -> (SubscriberId, mpsc::Receiver<FeedMessage>) {
        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let mut state = self.lock_state();
        let id = next_id(&mut state);

        let depth = self.config.effective_snapshot_depth();
        let mirror = state
            .mirrors
            .entry(symbol.clone())
            .or_insert_with(|| BookMirror::new(symbol.clone()));
        let (bids, asks) = mirror.depth(depth);
        let snapshot = FeedMessage::Snapshot {
            symbol: symbol.clone(),
            checksum: book_checksum(&bids, &asks),
            bids,
            asks,
            timestamp: unix_nanos(),
        };
        // Capacity is at least one, and the receiver is still in hand.
        if tx.try_send(snapshot).is_err() {
            warn!(%symbol, "failed to enqueue initial snapshot");
        }

        state
            .feed_subs
            .entry(symbol.clone())
            .or_default()
            .push(Sink { id, tx });
        info!(%symbol, subscriber = id.0, "market-data subscriber added");
        (id, rx)
    }

    /// Register a trade-stream subscriber.
    pub fn subscribe_trades(&self, symbol: Symbol) -> (SubscriberId, mpsc::Receiver<TradeMessage>) {
        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let mut state = self.lock_state();
        let id = next_id(&mut state);
        state
            .trade_subs
            .entry(symbol.clone())
            .or_default()
            .push(Sink { id, tx });
        info!(%symbol, subscriber = id.0, "trade subscriber added");
        (id, rx)
    }

    /// Remove a subscription. Effective from the next delivery attempt.
    pub fn unsubscribe(&self, id: SubscriberId) {
        let mut state = self.lock_state();
        for subs in state.feed_subs.values_mut() {
            subs.retain(|sink| sink.id != id);
        }
        for subs in state.trade_subs.values_mut() {
            subs.retain(|sink| sink.id != id);
        }
        debug!(subscriber = id.0, "unsubscribed");
    }

    /// Apply one committed operation's events and fan the derived messages
    /// out. Called by the dissemination task in stream order; the whole
    /// batch applies under the lock, so subscribe-time snapshots always
    /// sit on an operation boundary.
    pub fn apply_batch(&self, batch: EventBatch) {
        let mut state = self.lock_state();
        let state = &mut *state;

        let mirror = state
            .mirrors
            .entry(batch.symbol.clone())
            .or_insert_with(|| BookMirror::new(batch.symbol.clone()));

        for event in &batch.events {
            mirror.apply(event);

            match &event.payload {
                EventPayload::TradeExecuted { trade } => {
                    if let Some(subs) = state.trade_subs.get_mut(&batch.symbol) {
                        let message = TradeMessage::Trade {
                            symbol: batch.symbol.clone(),
                            trade: trade.clone(),
                            timestamp: event.timestamp,
                        };
                        fan_out(subs, &message, "trades", &batch.symbol);
                    }
                }
                EventPayload::BookChanged { bbo } => {
                    if let Some(subs) = state.feed_subs.get_mut(&batch.symbol) {
                        let update = FeedMessage::BookUpdate {
                            symbol: batch.symbol.clone(),
                            best_bid: bbo.best_bid.clone(),
                            best_ask: bbo.best_ask.clone(),
                            timestamp: event.timestamp,
                        };
                        fan_out(subs, &update, "market-data", &batch.symbol);
                    }
                    if mirror.observe_bbo(bbo.best_bid.clone(), bbo.best_ask.clone()) {
                        if let Some(subs) = state.feed_subs.get_mut(&batch.symbol) {
                            let update = FeedMessage::BboUpdate {
                                symbol: batch.symbol.clone(),
                                best_bid: bbo.best_bid.clone(),
                                best_ask: bbo.best_ask.clone(),
                                timestamp: event.timestamp,
                            };
                            fan_out(subs, &update, "market-data", &batch.symbol);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Drop every subscriber channel; receivers observe end-of-stream.
    pub fn close_all(&self) {
        let mut state = self.lock_state();
        state.feed_subs.clear();
        state.trade_subs.clear();
        info!("all subscriber channels closed");
    }

    pub fn feed_subscriber_count(&self, symbol: &Symbol) -> usize {
        self.lock_state()
            .feed_subs
            .get(symbol)
            .map_or(0, |subs| subs.len())
    }

    pub fn trade_subscriber_count(&self, symbol: &Symbol) -> usize {
        self.lock_state()
            .trade_subs
            .get(symbol)
            .map_or(0, |subs| subs.len())
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, HubState> {
        // Registry state is plain data; a poisoned lock only means a
        // panicking thread mid-update, and the data is still usable.
        self.state.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

fn next_id(state: &mut HubState) -> SubscriberId {
    state.next_id += 1;
    SubscriberId(state.next_id)
}

/// Deliver to every sink, evicting the slow and the gone.
fn fan_out<T: Clone>(subs: &mut Vec<Sink<T>>, message: &T, channel: &str, symbol: &Symbol) {
    subs.retain(|sink| match sink.tx.try_send(message.clone()) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            warn!(
                subscriber = sink.id.0,
                %symbol,
                channel,
                "subscriber queue overflow, evicting"
            );
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!(subscriber = sink.id.0, %symbol, channel, "subscriber gone, removing");
            false
        }
    });
}
