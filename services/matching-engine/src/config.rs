//! Engine configuration.
//!
//! Defaults can be overridden via environment variables:
//!
//! - `ENGINE_SYMBOLS`            (comma-separated, default: "BTC-USDT,ETH-USDT")
//! - `ENGINE_MIN_ORDER_SIZE`     (default: "0.00000001")
//! - `ENGINE_MAX_ORDER_SIZE`     (default: "1000000")
//! - `ENGINE_MIN_PRICE`          (default: "0.00000001")
//! - `ENGINE_MAX_PRICE`          (default: "1000000")
//! - `ENGINE_SNAPSHOT_DEPTH_CAP` (default: "1000")

use std::env;

use types::{Price, Quantity, Symbol};

/// Engine-wide configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Instruments the engine keeps books for. Submissions against any
    /// other symbol are rejected at validation.
    pub symbols: Vec<Symbol>,

    /// Smallest accepted order quantity.
    pub min_order_size: Quantity,

    /// Largest accepted order quantity.
    pub max_order_size: Quantity,

    /// Lowest accepted limit price.
    pub min_price: Price,

    /// Highest accepted limit price.
    pub max_price: Price,

    /// Hard cap on requested snapshot depth.
    pub snapshot_depth_cap: usize,

    /// Depth used when a caller does not specify one.
    pub default_snapshot_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            min_order_size: Quantity::parse("0.00000001").expect("static default"),
            max_order_size: Quantity::parse("1000000").expect("static default"),
            min_price: Price::parse("0.00000001").expect("static default"),
            max_price: Price::parse("1000000").expect("static default"),
            snapshot_depth_cap: 1000,
            default_snapshot_depth: 10,
        }
    }
}

impl EngineConfig {
    /// Default configuration with the given symbols.
    pub fn with_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Symbol::new).collect(),
            ..Self::default()
        }
    }

    /// Construct from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let symbols = env::var("ENGINE_SYMBOLS")
            .unwrap_or_else(|_| "BTC-USDT,ETH-USDT".to_string())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Symbol::try_new(s).ok_or_else(|| format!("invalid symbol: {s}")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            symbols,
            min_order_size: read_env("ENGINE_MIN_ORDER_SIZE", defaults.min_order_size, Quantity::parse)?,
            max_order_size: read_env("ENGINE_MAX_ORDER_SIZE", defaults.max_order_size, Quantity::parse)?,
            min_price: read_env("ENGINE_MIN_PRICE", defaults.min_price, Price::parse)?,
            max_price: read_env("ENGINE_MAX_PRICE", defaults.max_price, Price::parse)?,
            snapshot_depth_cap: read_env("ENGINE_SNAPSHOT_DEPTH_CAP", defaults.snapshot_depth_cap, |s| {
                s.parse::<usize>().map_err(|e| e.to_string())
            })?,
            default_snapshot_depth: defaults.default_snapshot_depth,
        })
    }

    /// Clamp a requested snapshot depth to `1..=snapshot_depth_cap`.
    pub fn clamp_depth(&self, depth: usize) -> usize {
        depth.max(1).min(self.snapshot_depth_cap)
    }
}

fn read_env<T, E: ToString>(
    key: &str,
    default: T,
    parse: impl Fn(&str) -> Result<T, E>,
) -> Result<T, String> {
    match env::var(key) {
        Ok(raw) => parse(&raw).map_err(|e| format!("{key}: {}", e.to_string())),
        Err(_) => Ok(default),
    }
}
