//! Market state types.

use crate::decimal::Price;
use serde::{Deserialize, Serialize};

/// Best resting prices on both sides of the book.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookTop {
    pub best_ask: Price,
    pub best_bid: Price,
}

/// Point-in-time market state, read fresh each cycle and never cached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub mid_price: Price,
    pub best_ask: Price,
    pub best_bid: Price,
}

impl MarketSnapshot {
    pub fn new(mid_price: Price, top: BookTop) -> Self {
        Self {
            mid_price,
            best_ask: top.best_ask,
            best_bid: top.best_bid,
        }
    }
}

/// Decimal precision for scaling prices and sizes to venue integer units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketPrecision {
    pub price_decimals: u32,
    pub size_decimals: u32,
}

impl Default for MarketPrecision {
    fn default() -> Self {
        // Venue defaults when /info omits the fields.
        Self {
            price_decimals: 1,
            size_decimals: 4,
        }
    }
}
