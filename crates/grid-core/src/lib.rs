//! Core domain types for the grid trading bot.
//!
//! This crate provides fundamental types used throughout the system:
//! - `Price`, `Size`: precision-safe numeric types
//! - `OrderSide`, `FillMode`, `OrderStatus`, `TrackedOrder`: order domain
//! - `MarketSnapshot`, `BookTop`, `MarketPrecision`: market state
//! - `Clock`: time source abstraction for testable time-dependent logic

pub mod decimal;
pub mod error;
pub mod order;
pub mod time;
pub mod types;

pub use decimal::{Price, Size};
pub use error::{CoreError, Result};
pub use order::{FillMode, OrderSide, OrderStatus, TrackedOrder};
pub use time::{Clock, SystemClock};
pub use types::{BookTop, MarketPrecision, MarketSnapshot};

use std::pin::Pin;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;
