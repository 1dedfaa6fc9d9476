//! Market-regime risk filter.
//!
//! Classifies the market by RSI/ADX into a regime, blocks trading in
//! hostile regimes, and enforces a wall-clock cooldown during which the
//! orchestrator flattens inventory instead of running the grid.

pub mod config;
pub mod cooldown;
pub mod indicators;

pub use config::RiskConfig;
pub use cooldown::{CooldownStatus, MarketCheck, MarketRegime, RiskManager};
pub use indicators::{FixedIndicatorProvider, IndicatorProvider, IndicatorSnapshot};
