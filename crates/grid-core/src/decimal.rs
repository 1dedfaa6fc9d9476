//! Precision-safe decimal types for trading.
//!
//! Uses `rust_decimal` for exact decimal arithmetic, avoiding
//! floating-point rounding errors critical in financial calculations.
//! Exact arithmetic also makes grid-price set membership stable across
//! cycles: a price generated twice from the same inputs compares equal.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};
use std::str::FromStr;

/// Price with exact decimal precision.
///
/// Wraps `Decimal` to provide type safety and prevent mixing
/// prices with sizes in calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Round down to the nearest multiple of `interval`.
    #[inline]
    pub fn floor_to(&self, interval: Price) -> Self {
        if interval.is_zero() {
            return *self;
        }
        Self((self.0 / interval.0).floor() * interval.0)
    }

    /// Round up to the nearest multiple of `interval`.
    #[inline]
    pub fn ceil_to(&self, interval: Price) -> Self {
        if interval.is_zero() {
            return *self;
        }
        Self((self.0 / interval.0).ceil() * interval.0)
    }

    /// Absolute distance to another price.
    #[inline]
    pub fn distance_to(&self, other: Price) -> Decimal {
        (self.0 - other.0).abs()
    }

    /// Scale to integer venue units: `round(price * 10^decimals)`.
    ///
    /// Returns `None` if the scaled value does not fit in `u64`
    /// (negative or too large).
    #[inline]
    pub fn to_raw(&self, decimals: u32) -> Option<u64> {
        let scaled = self.0 * Decimal::from(10u64.checked_pow(decimals)?);
        scaled.round().to_u64()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Price {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div<Decimal> for Price {
    type Output = Self;

    fn div(self, rhs: Decimal) -> Self::Output {
        Self(self.0 / rhs)
    }
}

/// Size/quantity with exact decimal precision.
///
/// Wraps `Decimal` to provide type safety and prevent mixing
/// sizes with prices in calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(pub Decimal);

impl Size {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Scale to integer venue units: `round(size * 10^decimals)`.
    #[inline]
    pub fn to_raw(&self, decimals: u32) -> Option<u64> {
        let scaled = self.0 * Decimal::from(10u64.checked_pow(decimals)?);
        scaled.round().to_u64()
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Size {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Size {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Size {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Size {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Size {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div<Decimal> for Size {
    type Output = Self;

    fn div(self, rhs: Decimal) -> Self::Output {
        Self(self.0 / rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_floor_to_interval() {
        let price = Price::new(dec!(99975));
        let interval = Price::new(dec!(10));

        assert_eq!(price.floor_to(interval).0, dec!(99970));
    }

    #[test]
    fn test_price_ceil_to_interval() {
        let price = Price::new(dec!(100025));
        let interval = Price::new(dec!(10));

        assert_eq!(price.ceil_to(interval).0, dec!(100030));
    }

    #[test]
    fn test_exact_multiple_unchanged() {
        let price = Price::new(dec!(100030));
        let interval = Price::new(dec!(10));

        assert_eq!(price.floor_to(interval), price);
        assert_eq!(price.ceil_to(interval), price);
    }

    #[test]
    fn test_price_to_raw_scaling() {
        let price = Price::new(dec!(99975.5));
        assert_eq!(price.to_raw(1), Some(999755));

        let size = Size::new(dec!(0.001));
        assert_eq!(size.to_raw(4), Some(10));
    }

    #[test]
    fn test_to_raw_rejects_negative() {
        let price = Price::new(dec!(-1));
        assert_eq!(price.to_raw(1), None);
    }

    #[test]
    fn test_price_distance() {
        let a = Price::new(dec!(100030));
        let b = Price::new(dec!(100000));

        assert_eq!(a.distance_to(b), dec!(30));
        assert_eq!(b.distance_to(a), dec!(30));
    }
}
