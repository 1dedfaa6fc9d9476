//! Local order ledger.
//!
//! The venue has no order query endpoint, so resting orders must be
//! tracked locally: added when a placement returns an id, removed when
//! a cancel confirms either cancellation or fill. Terminal orders move
//! into a bounded history.

pub mod ledger;

pub use ledger::{LedgerStats, OrderLedger};
