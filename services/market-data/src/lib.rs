//! Market-data dissemination fabric.
//!
//! Consumes the engine's event stream and fans it out to per-symbol
//! subscribers over two channels:
//! - **market-data**: an initial depth snapshot, then book and BBO updates
//! - **trades**: trade prints
//!
//! Per subscriber, delivery order equals the engine's commit order. Each
//! subscriber sits behind a bounded queue; one that stops draining is
//! evicted rather than ever stalling the matching path. The fabric never
//! calls back into the engine: snapshots come from a book mirror rebuilt
//! from the event stream itself.

pub mod config;
pub mod fanout;
pub mod hub;
pub mod messages;
pub mod mirror;

pub use config::HubConfig;
pub use fanout::run_dissemination;
pub use hub::{MarketDataHub, SubscriberId};
pub use messages::{book_checksum, FeedMessage, TradeMessage};
pub use mirror::BookMirror;
