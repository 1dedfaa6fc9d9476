//! Grid reconciliation engine.
//!
//! Pure computation: given a market snapshot, current inventory, and the
//! existing resting-order price sets, produce the minimal set of orders
//! to place and cancel to converge toward an inventory-skewed ladder.
//! No network access and no mutable state.

pub mod config;
pub mod engine;

pub use config::StrategyConfig;
pub use engine::{CancelCandidate, GridEngine, GridPlan, PositionRatio};
