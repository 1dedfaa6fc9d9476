//! Order domain types.

use crate::decimal::{Price, Size};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    #[inline]
    pub fn is_buy(&self) -> bool {
        matches!(self, OrderSide::Buy)
    }

    #[inline]
    pub fn opposite(&self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

/// How an order interacts with the book on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMode {
    /// Rest on the book, may fill on arrival.
    Limit,
    /// Rejected rather than filled if it would cross.
    PostOnly,
    /// Fill what is possible immediately, cancel the rest.
    Immediate,
}

/// Terminal and live order states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Open,
    Filled,
    Cancelled,
}

/// A resting order as known locally.
///
/// The venue offers no order query endpoint, so this local record is
/// the source of truth between placement and the terminal cancel/fill
/// observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedOrder {
    pub order_id: u64,
    pub market_id: u32,
    pub side: OrderSide,
    pub price: Price,
    pub size: Size,
    /// Local epoch milliseconds at placement.
    pub placed_at_ms: u64,
    pub status: OrderStatus,
}

impl TrackedOrder {
    pub fn new(
        order_id: u64,
        market_id: u32,
        side: OrderSide,
        price: Price,
        size: Size,
        placed_at_ms: u64,
    ) -> Self {
        Self {
            order_id,
            market_id,
            side,
            price,
            size,
            placed_at_ms,
            status: OrderStatus::Open,
        }
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == OrderStatus::Open
    }
}
