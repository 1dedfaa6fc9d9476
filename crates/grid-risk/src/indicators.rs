//! Indicator provider seam.
//!
//! Indicator computation happens outside this system; the risk machine
//! only consumes a small numeric snapshot per cycle.

use grid_core::BoxFuture;

/// Momentum/trend indicators for one timeframe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSnapshot {
    pub rsi: f64,
    pub adx: f64,
}

/// External source of indicator snapshots.
///
/// `None` means the indicators are unavailable this cycle, which the
/// risk machine treats as a cooldown trigger.
pub trait IndicatorProvider: Send + Sync {
    fn indicators(&self, timeframe: &str) -> BoxFuture<'_, Option<IndicatorSnapshot>>;
}

/// Fixed-value provider for tests and dry runs.
#[derive(Debug, Default)]
pub struct FixedIndicatorProvider {
    snapshot: parking_lot::Mutex<Option<IndicatorSnapshot>>,
}

impl FixedIndicatorProvider {
    #[must_use]
    pub fn new(snapshot: Option<IndicatorSnapshot>) -> Self {
        Self {
            snapshot: parking_lot::Mutex::new(snapshot),
        }
    }

    pub fn set(&self, snapshot: Option<IndicatorSnapshot>) {
        *self.snapshot.lock() = snapshot;
    }
}

impl IndicatorProvider for FixedIndicatorProvider {
    fn indicators(&self, _timeframe: &str) -> BoxFuture<'_, Option<IndicatorSnapshot>> {
        Box::pin(async move { *self.snapshot.lock() })
    }
}
