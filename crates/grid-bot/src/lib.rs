//! Grid trading bot.
//!
//! Wires the pieces together:
//! - venue client (signed session protocol + market data)
//! - grid reconciliation engine
//! - risk filter and cooldown
//! - local order ledger
//! - the trading cycle orchestrator

pub mod app;
pub mod config;
pub mod error;
pub mod indicators;

pub use app::{AppStatus, Application};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use indicators::HttpIndicatorProvider;
