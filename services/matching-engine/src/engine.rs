//! The multi-symbol matching engine.
//!
//! One `MatchingEngine` instance owns every book. Mutations for a symbol
//! serialize through that book's mutex; different symbols proceed in
//! parallel. Events are pushed to the dissemination stream while the
//! section is still held, so the per-symbol event order always equals the
//! commit order. Emission is an unbounded channel send and never blocks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use types::time::unix_nanos;
use types::{
    Bbo, BookSnapshot, EngineError, Order, OrderId, OrderStatus, OrderType, Quantity, Symbol,
    ValidationError,
};

use crate::admission::{self, OrderRequest};
use crate::config::EngineConfig;
use crate::events::{
    event_channel, EngineEvent, EventBatch, EventPayload, EventReceiver, EventSender,
};
use crate::matching::executor::{FeeHook, NoFees, TradeRecorder};
use crate::order_book::{MatchOutcome, SymbolBook};

/// Successful submit response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitAck {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub filled_quantity: Quantity,
    pub remaining_quantity: Quantity,
}

/// Successful cancel response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelAck {
    pub order_id: OrderId,
    pub status: OrderStatus,
}

/// Multi-symbol matching engine.
///
/// Constructed once at startup with an explicit `start`/`shutdown`
/// lifecycle; there are no process-wide statics. Shutdown drains in-flight
/// operations on every book and closes the event stream.
pub struct MatchingEngine {
    config: EngineConfig,
    books: DashMap<Symbol, Mutex<SymbolBook>>,
    /// Where each admitted order lives, for symbol-less lookups.
    symbol_by_order: DashMap<OrderId, Symbol>,
    recorder: TradeRecorder,
    sink: Mutex<Option<EventSender>>,
    running: AtomicBool,
}

impl MatchingEngine {
    /// Engine with the default (no-op) fee hook.
    pub fn new(config: EngineConfig) -> (Self, EventReceiver) {
        Self::with_fee_hook(config, Arc::new(NoFees))
    }

    /// Engine with a custom post-match fee hook.
    pub fn with_fee_hook(config: EngineConfig, fee_hook: Arc<dyn FeeHook>) -> (Self, EventReceiver) {
        let (sink, stream) = event_channel();
        let books = DashMap::new();
        for symbol in &config.symbols {
            books.insert(symbol.clone(), Mutex::new(SymbolBook::new(symbol.clone())));
        }
        let engine = Self {
            config,
            books,
            symbol_by_order: DashMap::new(),
            recorder: TradeRecorder::new(fee_hook),
            sink: Mutex::new(Some(sink)),
            running: AtomicBool::new(false),
        };
        (engine, stream)
    }

    /// Begin accepting mutating operations.
    pub fn start(&self) {
        self.running.store(true, Ordering::Release);
        info!(symbols = self.books.len(), "matching engine started");
    }

    /// Stop accepting mutating operations, wait for in-flight ones to
    /// commit, and close the event stream.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Release);
        // Passing through every book's section means anything that was
        // already inside has committed and emitted.
        for entry in self.books.iter() {
            drop(entry.value().lock());
        }
        if let Ok(mut sink) = self.sink.lock() {
            sink.take();
        }
        info!("matching engine stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Submit an order. Validates, admits, executes the type-specific
    /// policy inside the symbol's exclusive section, and emits the
    /// operation's events before returning.
    pub fn submit(&self, request: OrderRequest) -> Result<SubmitAck, EngineError> {
        if !self.is_running() {
            return Err(EngineError::NotRunning);
        }
        if let Err(validation) = admission::validate(&self.config, &request) {
            return Err(self.record_rejection(&request, validation));
        }

        let symbol = request.symbol.clone();
        self.with_book(&symbol, |book| {
            let now = unix_nanos();
            let sequence = book.next_admission_seq();
            let mut taker = Order::new(
                OrderId::new(),
                symbol.clone(),
                request.side,
                request.order_type,
                request.quantity,
                request.price,
                sequence,
                now,
                request.user_id.clone(),
            );
            let order_id = taker.order_id;

            let outcome = self.dispatch(book, &mut taker, now)?;
            let rested = taker.order_type.may_rest() && !taker.is_filled();

            book.record_order(taker.clone());
            if rested {
                book.insert_resting(&taker)?;
            }
            self.symbol_by_order.insert(order_id, symbol.clone());

            debug_assert!(book.verify_integrity().is_ok(), "book integrity after submit");

            let events = build_submit_events(book, &taker, &outcome, rested, now);
            self.emit(EventBatch {
                symbol: symbol.clone(),
                events,
            });

            debug!(
                order_id = %order_id,
                status = ?taker.status,
                trades = outcome.trades.len(),
                "submit committed"
            );

            Ok(SubmitAck {
                order_id,
                status: taker.status,
                filled_quantity: taker.filled_quantity,
                remaining_quantity: taker.remaining_quantity,
            })
        })
    }

    /// Cancel a resting order. Atomic with respect to matching on the same
    /// book.
    pub fn cancel(&self, order_id: OrderId) -> Result<CancelAck, EngineError> {
        if !self.is_running() {
            return Err(EngineError::NotRunning);
        }
        let symbol = self
            .symbol_by_order
            .get(&order_id)
            .map(|entry| entry.value().clone())
            .ok_or(EngineError::NotFound { order_id })?;

        self.with_book(&symbol, |book| {
            let now = unix_nanos();
            let cancelled = book.cancel(order_id)?;

            debug_assert!(book.verify_integrity().is_ok(), "book integrity after cancel");

            let payloads = vec![
                EventPayload::BookChanged { bbo: book.bbo(now) },
                EventPayload::OrderCanceled {
                    order_id,
                    symbol: symbol.clone(),
                    side: cancelled.side,
                    price: cancelled.price,
                    remaining_quantity: cancelled.remaining_quantity,
                },
            ];
            let events = seal_events(book, payloads, now);
            self.emit(EventBatch {
                symbol: symbol.clone(),
                events,
            });

            debug!(order_id = %order_id, "cancel committed");
            Ok(CancelAck {
                order_id,
                status: cancelled.status,
            })
        })
    }

    /// Current recorded state of an order, terminal ones included.
    pub fn get_order(&self, order_id: OrderId) -> Result<Order, EngineError> {
        let symbol = self
            .symbol_by_order
            .get(&order_id)
            .map(|entry| entry.value().clone())
            .ok_or(EngineError::NotFound { order_id })?;
        self.with_book(&symbol, |book| {
            book.order(&order_id)
                .cloned()
                .ok_or(EngineError::NotFound { order_id })
        })
    }

    /// Consistent depth snapshot, taken inside the symbol's section.
    /// `depth` is clamped to the configured cap.
    pub fn get_book_snapshot(
        &self,
        symbol: &Symbol,
        depth: usize,
    ) -> Result<BookSnapshot, EngineError> {
        let depth = self.config.clamp_depth(depth);
        self.with_book(symbol, |book| Ok(book.snapshot(depth, unix_nanos())))
    }

    /// Current best bid and offer.
    pub fn get_bbo(&self, symbol: &Symbol) -> Result<Bbo, EngineError> {
        self.with_book(symbol, |book| Ok(book.bbo(unix_nanos())))
    }

    /// Run one order through its type-specific execution policy.
    fn dispatch(
        &self,
        book: &mut SymbolBook,
        taker: &mut Order,
        now: i64,
    ) -> Result<MatchOutcome, EngineError> {
        let limit = taker.price;
        match taker.order_type {
            OrderType::Market => {
                let outcome = book.execute_taker(taker, None, &self.recorder, now)?;
                // Whatever liquidity could not provide is cancelled.
                if !taker.is_filled() {
                    taker.cancel_remaining();
                }
                Ok(outcome)
            }
            OrderType::Limit => book.execute_taker(taker, limit, &self.recorder, now),
            OrderType::Ioc => {
                let outcome = book.execute_taker(taker, limit, &self.recorder, now)?;
                if !taker.is_filled() {
                    taker.cancel_remaining();
                }
                Ok(outcome)
            }
            OrderType::Fok => {
                // Dry run first: either the whole quantity is available at
                // acceptable prices or nothing happens at all.
                let available = book.available_opposite(taker.side, limit, taker.quantity);
                if available < taker.quantity {
                    taker.cancel_remaining();
                    return Ok(MatchOutcome::default());
                }
                let outcome = book.execute_taker(taker, limit, &self.recorder, now)?;
                if !taker.is_filled() {
                    return Err(EngineError::internal(format!(
                        "fill-or-kill {} unfilled after passing its dry run",
                        taker.order_id
                    )));
                }
                Ok(outcome)
            }
        }
    }

    /// Record and report a validation rejection. The attempted order gets a
    /// REJECTED record and a rejection event; the book is not touched.
    fn record_rejection(&self, request: &OrderRequest, validation: ValidationError) -> EngineError {
        warn!(symbol = %request.symbol, reason = %validation, "submission rejected");

        if let Some(entry) = self.books.get(&request.symbol) {
            if let Ok(mut book) = entry.lock() {
                let now = unix_nanos();
                let sequence = book.next_admission_seq();
                let mut order = Order::new(
                    OrderId::new(),
                    request.symbol.clone(),
                    request.side,
                    request.order_type,
                    request.quantity,
                    request.price,
                    sequence,
                    now,
                    request.user_id.clone(),
                );
                order.reject();
                let order_id = order.order_id;
                book.record_order(order);
                self.symbol_by_order.insert(order_id, request.symbol.clone());

                let payloads = vec![EventPayload::OrderRejected {
                    order_id,
                    symbol: request.symbol.clone(),
                    reason: validation.to_string(),
                }];
                let events = seal_events(&mut book, payloads, now);
                self.emit(EventBatch {
                    symbol: request.symbol.clone(),
                    events,
                });
            }
        }

        EngineError::Validation(validation)
    }

    fn with_book<R>(
        &self,
        symbol: &Symbol,
        f: impl FnOnce(&mut SymbolBook) -> Result<R, EngineError>,
    ) -> Result<R, EngineError> {
        let entry = self.books.get(symbol).ok_or_else(|| {
            EngineError::Validation(ValidationError::UnsupportedSymbol {
                symbol: symbol.to_string(),
            })
        })?;
        let mut book = entry
            .lock()
            .map_err(|_| EngineError::internal(format!("book mutex poisoned for {symbol}")))?;
        f(&mut book)
    }

    /// Push a committed operation's events. Called inside the symbol's
    /// section so the stream order equals the commit order; the send is
    /// non-blocking. A closed stream (consumer gone) is not an error for
    /// the matching path.
    fn emit(&self, batch: EventBatch) {
        if let Ok(guard) = self.sink.lock() {
            if let Some(sink) = guard.as_ref() {
                if sink.send(batch).is_err() {
                    debug!("event stream closed, dropping batch");
                }
            }
        }
    }
}

/// Assemble the event list for a committed submit, in emission order:
/// trades, then the committed book change, then lifecycle events for the
/// taker and any fully consumed makers.
fn build_submit_events(
    book: &mut SymbolBook,
    taker: &Order,
    outcome: &MatchOutcome,
    rested: bool,
    now: i64,
) -> Vec<EngineEvent> {
    let symbol = book.symbol().clone();
    let mut payloads: Vec<EventPayload> = Vec::new();

    for trade in &outcome.trades {
        payloads.push(EventPayload::TradeExecuted {
            trade: trade.clone(),
        });
    }

    if !outcome.trades.is_empty() || rested {
        payloads.push(EventPayload::BookChanged { bbo: book.bbo(now) });
    }

    match taker.status {
        OrderStatus::Filled => payloads.push(EventPayload::OrderFilled {
            order_id: taker.order_id,
            symbol: symbol.clone(),
        }),
        OrderStatus::PartiallyFilled => payloads.push(EventPayload::OrderPartiallyFilled {
            order_id: taker.order_id,
            symbol: symbol.clone(),
            filled_quantity: taker.filled_quantity,
            remaining_quantity: taker.remaining_quantity,
        }),
        OrderStatus::Cancelled => {
            if !taker.filled_quantity.is_zero() {
                payloads.push(EventPayload::OrderPartiallyFilled {
                    order_id: taker.order_id,
                    symbol: symbol.clone(),
                    filled_quantity: taker.filled_quantity,
                    remaining_quantity: taker.remaining_quantity,
                });
            }
            payloads.push(EventPayload::OrderCanceled {
                order_id: taker.order_id,
                symbol: symbol.clone(),
                side: taker.side,
                price: taker.price,
                remaining_quantity: taker.remaining_quantity,
            });
        }
        // Pending taker rests; the accepted event below covers it.
        OrderStatus::Pending | OrderStatus::Rejected => {}
    }

    if rested {
        if let Some(price) = taker.price {
            payloads.push(EventPayload::OrderAccepted {
                order_id: taker.order_id,
                symbol: symbol.clone(),
                side: taker.side,
                price,
                quantity: taker.remaining_quantity,
            });
        }
    }

    for maker_id in &outcome.filled_makers {
        payloads.push(EventPayload::OrderFilled {
            order_id: *maker_id,
            symbol: symbol.clone(),
        });
    }

    seal_events(book, payloads, now)
}

/// Stamp payloads with the book's event sequence and the operation time.
fn seal_events(book: &mut SymbolBook, payloads: Vec<EventPayload>, now: i64) -> Vec<EngineEvent> {
    payloads
        .into_iter()
        .map(|payload| EngineEvent {
            sequence: book.next_event_seq(),
            timestamp: now,
            payload,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::Side;

    fn engine() -> (MatchingEngine, EventReceiver) {
        let (engine, stream) = MatchingEngine::new(EngineConfig::with_symbols(["BTC-USDT"]));
        engine.start();
        (engine, stream)
    }

    #[test]
    fn submit_requires_running_engine() {
        let (engine, _stream) = MatchingEngine::new(EngineConfig::with_symbols(["BTC-USDT"]));
        let err = engine
            .submit(OrderRequest::limit("BTC-USDT", Side::Buy, "100", "1.0"))
            .unwrap_err();
        assert!(matches!(err, EngineError::NotRunning));
    }

    #[test]
    fn resting_limit_acks_pending() {
        let (engine, _stream) = engine();
        let ack = engine
            .submit(OrderRequest::limit("BTC-USDT", Side::Buy, "100", "1.0"))
            .unwrap();
        assert_eq!(ack.status, OrderStatus::Pending);
        assert_eq!(ack.remaining_quantity, Quantity::parse("1.0").unwrap());
        assert!(ack.filled_quantity.is_zero());
    }

    #[test]
    fn unknown_symbol_rejected_without_record() {
        let (engine, mut stream) = engine();
        let err = engine
            .submit(OrderRequest::limit("ETH-USDT", Side::Buy, "100", "1.0"))
            .unwrap_err();
        assert_eq!(err.code(), "validation_error");
        // No book, no channel: nothing emitted.
        assert!(stream.try_recv().is_err());
    }

    #[test]
    fn rejection_event_carries_reason() {
        let (engine, mut stream) = engine();
        let err = engine
            .submit(OrderRequest::limit("BTC-USDT", Side::Buy, "100", "0"))
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::NonPositiveQuantity)
        ));

        let batch = stream.try_recv().unwrap();
        assert_eq!(batch.events.len(), 1);
        assert!(matches!(
            batch.events[0].payload,
            EventPayload::OrderRejected { .. }
        ));
    }

    #[test]
    fn simple_cross_emits_ordered_batch() {
        let (engine, mut stream) = engine();
        engine
            .submit(OrderRequest::limit("BTC-USDT", Side::Sell, "100", "1.0"))
            .unwrap();
        let _ = stream.try_recv().unwrap();

        let ack = engine
            .submit(OrderRequest::limit("BTC-USDT", Side::Buy, "101", "1.0"))
            .unwrap();
        assert_eq!(ack.status, OrderStatus::Filled);

        let batch = stream.try_recv().unwrap();
        let labels: Vec<_> = batch.events.iter().map(|e| e.payload.label()).collect();
        assert_eq!(
            labels,
            vec![
                "trade_executed",
                "book_changed",
                "order_filled", // taker
                "order_filled", // maker
            ]
        );
        // Sequences strictly increase within the symbol stream.
        let seqs: Vec<_> = batch.events.iter().map(|e| e.sequence).collect();
        assert!(seqs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn cancel_then_cancel_again() {
        let (engine, _stream) = engine();
        let ack = engine
            .submit(OrderRequest::limit("BTC-USDT", Side::Buy, "99", "1.0"))
            .unwrap();

        let cancel = engine.cancel(ack.order_id).unwrap();
        assert_eq!(cancel.status, OrderStatus::Cancelled);

        let err = engine.cancel(ack.order_id).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState { .. }));
    }

    #[test]
    fn cancel_unknown_order() {
        let (engine, _stream) = engine();
        let err = engine.cancel(OrderId::new()).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[test]
    fn get_order_tracks_fills() {
        let (engine, _stream) = engine();
        let maker = engine
            .submit(OrderRequest::limit("BTC-USDT", Side::Sell, "100", "2.0"))
            .unwrap();
        engine
            .submit(OrderRequest::market("BTC-USDT", Side::Buy, "0.5"))
            .unwrap();

        let order = engine.get_order(maker.order_id).unwrap();
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
        assert_eq!(order.remaining_quantity, Quantity::parse("1.5").unwrap());
    }

    #[test]
    fn shutdown_closes_stream_and_blocks_mutations() {
        let (engine, mut stream) = engine();
        engine.shutdown();

        let err = engine
            .submit(OrderRequest::limit("BTC-USDT", Side::Buy, "100", "1.0"))
            .unwrap_err();
        assert!(matches!(err, EngineError::NotRunning));

        // Sink dropped: the stream reports disconnected once drained.
        assert!(matches!(
            stream.try_recv(),
            Err(tokio::sync::mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn queries_stay_available_after_shutdown() {
        let (engine, _stream) = engine();
        let ack = engine
            .submit(OrderRequest::limit("BTC-USDT", Side::Buy, "100", "1.0"))
            .unwrap();
        engine.shutdown();

        let order = engine.get_order(ack.order_id).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        let bbo = engine.get_bbo(&Symbol::new("BTC-USDT")).unwrap();
        assert!(bbo.best_bid.is_some());
    }
}
