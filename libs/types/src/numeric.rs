//! Fixed-point decimal types for prices and quantities.
//!
//! Built on `rust_decimal` so arithmetic is exact; nothing here goes
//! through binary floating point. Inputs are limited to 8 fractional
//! digits. Both types serialize as JSON strings to avoid number precision
//! loss in clients.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use std::str::FromStr;

/// Maximum number of fractional digits accepted for prices and quantities.
pub const MAX_DECIMAL_SCALE: u32 = 8;

/// Error constructing a price or quantity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NumericError {
    #[error("value is not a valid decimal: {0}")]
    Unparseable(String),

    #[error("value must be positive, got {0}")]
    NotPositive(Decimal),

    #[error("value must not be negative, got {0}")]
    Negative(Decimal),

    #[error("value {value} exceeds maximum scale of {max_scale} decimal places")]
    ScaleExceeded { value: Decimal, max_scale: u32 },
}

fn check_scale(value: Decimal) -> Result<Decimal, NumericError> {
    // normalize() strips trailing zeros so "1.50000000" parses at scale 1.
    let normalized = value.normalize();
    if normalized.scale() > MAX_DECIMAL_SCALE {
        return Err(NumericError::ScaleExceeded {
            value,
            max_scale: MAX_DECIMAL_SCALE,
        });
    }
    Ok(normalized)
}

/// A strictly positive price with at most 8 fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(Decimal);

impl Price {
    /// Construct from a decimal, enforcing positivity and scale.
    pub fn try_new(value: Decimal) -> Result<Self, NumericError> {
        let value = check_scale(value)?;
        if value <= Decimal::ZERO {
            return Err(NumericError::NotPositive(value));
        }
        Ok(Self(value))
    }

    /// Convenience constructor for whole-number prices.
    pub fn from_u64(value: u64) -> Self {
        Self(Decimal::from(value))
    }

    pub fn parse(s: &str) -> Result<Self, NumericError> {
        let d = Decimal::from_str(s).map_err(|_| NumericError::Unparseable(s.to_string()))?;
        Self::try_new(d)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Price {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A non-negative quantity with at most 8 fractional digits.
///
/// Zero is allowed: filled quantities start at zero and cancelled
/// remainders end there. Order admission separately requires a positive
/// total quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantity(Decimal);

impl Quantity {
    pub fn try_new(value: Decimal) -> Result<Self, NumericError> {
        let value = check_scale(value)?;
        if value < Decimal::ZERO {
            return Err(NumericError::Negative(value));
        }
        Ok(Self(value))
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn from_u64(value: u64) -> Self {
        Self(Decimal::from(value))
    }

    pub fn parse(s: &str) -> Result<Self, NumericError> {
        let d = Decimal::from_str(s).map_err(|_| NumericError::Unparseable(s.to_string()))?;
        Self::try_new(d)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Subtract `rhs`, returning `None` if the result would be negative.
    pub fn checked_sub(&self, rhs: Quantity) -> Option<Quantity> {
        if rhs.0 > self.0 {
            None
        } else {
            Some(Quantity(self.0 - rhs.0))
        }
    }

    /// The smaller of two quantities.
    pub fn min(self, other: Quantity) -> Quantity {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::zero()
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 + rhs.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Quantity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
