//! Error taxonomy for the matching core.
//!
//! Every failed call surfaces one of these to the caller; the engine never
//! logs-and-swallows. Insufficient liquidity is deliberately absent: a
//! market or IOC order that runs out of liquidity is an outcome (status
//! CANCELLED with a remaining quantity), not a fault.

use crate::ids::OrderId;
use crate::numeric::NumericError;
use crate::order::OrderStatus;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level engine error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("order not found: {order_id}")]
    NotFound { order_id: OrderId },

    #[error("order {order_id} is already {status:?}")]
    InvalidState {
        order_id: OrderId,
        status: OrderStatus,
    },

    #[error("engine is not running")]
    NotRunning,

    #[error("internal invariant violated: {message}")]
    Internal { message: String },
}

/// Caller-fault input errors. A submission failing validation produces no
/// side effects beyond the rejection record and its lifecycle event.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("unsupported symbol: {symbol}")]
    UnsupportedSymbol { symbol: String },

    #[error("quantity must be positive")]
    NonPositiveQuantity,

    #[error("quantity {quantity} outside allowed range [{min}, {max}]")]
    QuantityOutOfBounds {
        quantity: String,
        min: String,
        max: String,
    },

    #[error("price is required for {order_type} orders")]
    PriceRequired { order_type: String },

    #[error("market orders must not carry a price")]
    PriceForbidden,

    #[error("price {price} outside allowed range [{min}, {max}]")]
    PriceOutOfBounds {
        price: String,
        min: String,
        max: String,
    },

    #[error("invalid decimal: {0}")]
    Numeric(#[from] NumericError),
}

impl EngineError {
    /// Internal-error constructor; the call site logs context separately.
    pub fn internal(message: impl Into<String>) -> Self {
        EngineError::Internal {
            message: message.into(),
        }
    }

    /// Stable machine-readable code for the wire error surface.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation_error",
            EngineError::NotFound { .. } => "not_found",
            EngineError::InvalidState { .. } => "invalid_state",
            EngineError::NotRunning => "unavailable",
            EngineError::Internal { .. } => "internal_error",
        }
    }

    /// Structured body for transports: `{code, message, details?}`.
    pub fn to_body(&self) -> ErrorBody {
        let details = match self {
            EngineError::NotFound { order_id } => Some(order_id.to_string()),
            EngineError::InvalidState { order_id, .. } => Some(order_id.to_string()),
            _ => None,
        };
        ErrorBody {
            code: self.code().to_string(),
            message: self.to_string(),
            details,
        }
    }
}

/// Wire shape of a failed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
