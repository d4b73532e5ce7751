//! Shared domain types for the matching core.
//!
//! Everything that crosses a crate boundary lives here: identifiers,
//! fixed-point numerics, order and trade records, book views, the error
//! taxonomy, and the clock helper.

pub mod book;
pub mod errors;
pub mod ids;
pub mod numeric;
pub mod order;
pub mod time;
pub mod trade;

pub use book::{Bbo, BookSnapshot, LevelInfo};
pub use errors::{EngineError, ErrorBody, ValidationError};
pub use ids::{OrderId, Symbol, TradeId};
pub use numeric::{Price, Quantity, MAX_DECIMAL_SCALE};
pub use order::{Order, OrderStatus, OrderType, Side};
pub use trade::TradeExecution;
