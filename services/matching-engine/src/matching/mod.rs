//! Matching primitives: price acceptability and trade recording.

pub mod crossing;
pub mod executor;

pub use executor::{FeeHook, NoFees, TradeRecorder};
