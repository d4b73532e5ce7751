//! Matching engine service.
//!
//! Price-time priority matching over per-symbol limit order books:
//! - order admission and validation
//! - type-specific execution (market, limit, IOC, FOK)
//! - trade generation at the maker's price (no trade-throughs)
//! - ordered event emission toward the dissemination layer
//!
//! All mutations for one symbol serialize through that symbol's exclusive
//! section; symbols are independent. The matching loop itself performs no
//! I/O and never suspends.

pub mod admission;
pub mod book;
pub mod config;
pub mod engine;
pub mod events;
pub mod matching;
pub mod order_book;

pub use admission::OrderRequest;
pub use config::EngineConfig;
pub use engine::{CancelAck, MatchingEngine, SubmitAck};
pub use events::{EngineEvent, EventBatch, EventPayload, EventReceiver, EventSender};
pub use matching::executor::{FeeHook, NoFees};
