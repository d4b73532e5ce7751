//! Order admission: the submit request shape and its validation.
//!
//! Validation is a pure function of config and request; a failed check
//! produces no side effects beyond the rejection record the engine writes.

use serde::{Deserialize, Serialize};

use types::{OrderType, Price, Quantity, Side, Symbol, ValidationError};

use crate::config::EngineConfig;

/// An order submission as received from the caller.
///
/// Decimal fields deserialize from strings (scale is checked during
/// parsing); `from_decimal_strings` offers the same entry point for
/// non-serde callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Quantity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl OrderRequest {
    /// Build a request from raw decimal strings, the wire representation.
    pub fn from_decimal_strings(
        symbol: &str,
        side: Side,
        order_type: OrderType,
        quantity: &str,
        price: Option<&str>,
        user_id: Option<String>,
    ) -> Result<Self, ValidationError> {
        let symbol = Symbol::try_new(symbol).ok_or_else(|| ValidationError::UnsupportedSymbol {
            symbol: symbol.to_string(),
        })?;
        Ok(Self {
            symbol,
            side,
            order_type,
            quantity: Quantity::parse(quantity)?,
            price: price.map(Price::parse).transpose()?,
            user_id: user_id.filter(|u| !u.is_empty()),
        })
    }

    pub fn market(symbol: &str, side: Side, quantity: &str) -> Self {
        Self::from_decimal_strings(symbol, side, OrderType::Market, quantity, None, None)
            .expect("valid request literals")
    }

    pub fn limit(symbol: &str, side: Side, price: &str, quantity: &str) -> Self {
        Self::from_decimal_strings(symbol, side, OrderType::Limit, quantity, Some(price), None)
            .expect("valid request literals")
    }

    pub fn ioc(symbol: &str, side: Side, price: &str, quantity: &str) -> Self {
        Self::from_decimal_strings(symbol, side, OrderType::Ioc, quantity, Some(price), None)
            .expect("valid request literals")
    }

    pub fn fok(symbol: &str, side: Side, price: &str, quantity: &str) -> Self {
        Self::from_decimal_strings(symbol, side, OrderType::Fok, quantity, Some(price), None)
            .expect("valid request literals")
    }
}

/// Validate a request against engine configuration.
///
/// Checks, in order: known symbol, positive and in-band quantity,
/// type/price coherence, and price band. Decimal scale was already
/// enforced when the `Price`/`Quantity` values were constructed.
pub fn validate(config: &EngineConfig, request: &OrderRequest) -> Result<(), ValidationError> {
    if !config.symbols.contains(&request.symbol) {
        return Err(ValidationError::UnsupportedSymbol {
            symbol: request.symbol.to_string(),
        });
    }

    if request.quantity.is_zero() {
        return Err(ValidationError::NonPositiveQuantity);
    }
    if request.quantity < config.min_order_size || request.quantity > config.max_order_size {
        return Err(ValidationError::QuantityOutOfBounds {
            quantity: request.quantity.to_string(),
            min: config.min_order_size.to_string(),
            max: config.max_order_size.to_string(),
        });
    }

    match (request.order_type.requires_price(), request.price) {
        (true, None) => {
            return Err(ValidationError::PriceRequired {
                order_type: request.order_type.to_string(),
            });
        }
        (false, Some(_)) => return Err(ValidationError::PriceForbidden),
        _ => {}
    }

    if let Some(price) = request.price {
        if price < config.min_price || price > config.max_price {
            return Err(ValidationError::PriceOutOfBounds {
                price: price.to_string(),
                min: config.min_price.to_string(),
                max: config.max_price.to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EngineConfig {
        EngineConfig::with_symbols(["BTC-USDT"])
    }

    #[test]
    fn valid_limit_passes() {
        let request = OrderRequest::limit("BTC-USDT", Side::Buy, "100", "1.0");
        assert!(validate(&config(), &request).is_ok());
    }

    #[test]
    fn unknown_symbol_rejected() {
        let request = OrderRequest::limit("DOGE-USDT", Side::Buy, "100", "1.0");
        let err = validate(&config(), &request).unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedSymbol { .. }));
    }

    #[test]
    fn zero_quantity_rejected() {
        let request = OrderRequest::limit("BTC-USDT", Side::Buy, "100", "0");
        let err = validate(&config(), &request).unwrap_err();
        assert!(matches!(err, ValidationError::NonPositiveQuantity));
    }

    #[test]
    fn oversized_quantity_rejected() {
        let request = OrderRequest::limit("BTC-USDT", Side::Buy, "100", "2000000");
        let err = validate(&config(), &request).unwrap_err();
        assert!(matches!(err, ValidationError::QuantityOutOfBounds { .. }));
    }

    #[test]
    fn limit_without_price_rejected() {
        let request = OrderRequest {
            price: None,
            ..OrderRequest::limit("BTC-USDT", Side::Buy, "100", "1.0")
        };
        let err = validate(&config(), &request).unwrap_err();
        assert!(matches!(err, ValidationError::PriceRequired { .. }));
    }

    #[test]
    fn market_with_price_rejected() {
        let request = OrderRequest {
            price: Some(Price::from_u64(100)),
            ..OrderRequest::market("BTC-USDT", Side::Buy, "1.0")
        };
        let err = validate(&config(), &request).unwrap_err();
        assert!(matches!(err, ValidationError::PriceForbidden));
    }

    #[test]
    fn price_band_enforced() {
        let request = OrderRequest::limit("BTC-USDT", Side::Buy, "5000000", "1.0");
        let err = validate(&config(), &request).unwrap_err();
        assert!(matches!(err, ValidationError::PriceOutOfBounds { .. }));
    }

    #[test]
    fn excessive_scale_fails_at_parse() {
        let err = OrderRequest::from_decimal_strings(
            "BTC-USDT",
            Side::Buy,
            OrderType::Limit,
            "0.123456789",
            Some("100"),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::Numeric(_)));
    }

    #[test]
    fn request_deserializes_from_wire_json() {
        let json = r#"{
            "symbol": "BTC-USDT",
            "side": "buy",
            "order_type": "limit",
            "quantity": "1.5",
            "price": "50000.25"
        }"#;
        let request: OrderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.symbol, Symbol::new("BTC-USDT"));
        assert_eq!(request.price, Some(Price::parse("50000.25").unwrap()));
        assert_eq!(request.user_id, None);
    }
}
