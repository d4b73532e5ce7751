//! Price acceptability for an incoming taker.

use types::{Price, Side};

/// Whether a taker with the given limit accepts a resting level's price.
///
/// A buy accepts asks at or below its limit; a sell accepts bids at or
/// above its limit. `None` is a market taker and accepts any price.
pub fn taker_accepts(taker_side: Side, limit: Option<Price>, level_price: Price) -> bool {
    match (taker_side, limit) {
        (_, None) => true,
        (Side::Buy, Some(limit)) => level_price <= limit,
        (Side::Sell, Some(limit)) => level_price >= limit,
    }
}

/// Whether a bid and an ask price cross.
pub fn crosses(bid: Price, ask: Price) -> bool {
    bid >= ask
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(v: u64) -> Price {
        Price::from_u64(v)
    }

    #[test]
    fn market_taker_accepts_anything() {
        assert!(taker_accepts(Side::Buy, None, price(1_000_000)));
        assert!(taker_accepts(Side::Sell, None, price(1)));
    }

    #[test]
    fn buy_limit_bounds_from_above() {
        assert!(taker_accepts(Side::Buy, Some(price(101)), price(100)));
        assert!(taker_accepts(Side::Buy, Some(price(101)), price(101)));
        assert!(!taker_accepts(Side::Buy, Some(price(101)), price(102)));
    }

    #[test]
    fn sell_limit_bounds_from_below() {
        assert!(taker_accepts(Side::Sell, Some(price(99)), price(100)));
        assert!(taker_accepts(Side::Sell, Some(price(99)), price(99)));
        assert!(!taker_accepts(Side::Sell, Some(price(99)), price(98)));
    }

    #[test]
    fn crossing_is_bid_at_or_above_ask() {
        assert!(crosses(price(100), price(100)));
        assert!(crosses(price(101), price(100)));
        assert!(!crosses(price(99), price(100)));
    }
}
