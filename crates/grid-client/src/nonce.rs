//! Monotonic nonce generation.
//!
//! Nonces are millisecond timestamps bumped to stay strictly increasing
//! across calls, so bursts within one millisecond and wall-clock
//! regressions both remain valid to the venue.

use std::sync::atomic::{AtomicU64, Ordering};

use grid_core::Clock;

#[derive(Debug)]
pub struct NonceManager<C> {
    last: AtomicU64,
    clock: C,
}

impl<C: Clock> NonceManager<C> {
    pub fn new(clock: C) -> Self {
        Self {
            last: AtomicU64::new(0),
            clock,
        }
    }

    /// Next nonce: `max(previous + 1, now_ms)`.
    pub fn next(&self) -> u64 {
        let now = self.clock.now_ms();
        loop {
            let prev = self.last.load(Ordering::Acquire);
            let candidate = now.max(prev + 1);
            if self
                .last
                .compare_exchange(prev, candidate, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return candidate;
            }
        }
    }
}
