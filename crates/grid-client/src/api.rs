//! Venue abstraction consumed by the trading loop.
//!
//! The orchestrator talks to a [`Venue`] trait object so the cycle
//! logic can be driven in tests against [`MockVenue`] without a network.
//! Trait methods return `Option`/outcome values rather than errors:
//! the trading loop treats any venue failure as "skip this action and
//! keep the loop alive", with details already logged at the client.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use grid_core::{BookTop, BoxFuture, FillMode, OrderSide, Price, Size};

/// Parameters for one order placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceRequest {
    pub side: OrderSide,
    pub price: Price,
    pub size: Size,
    pub fill_mode: FillMode,
    pub reduce_only: bool,
}

/// What happened to a cancel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The venue removed the resting order.
    Cancelled,
    /// The order was gone already; it filled before the cancel landed.
    Filled,
    /// Transport or venue failure; the order may still be resting.
    Failed,
}

pub trait Venue: Send + Sync {
    fn market_id(&self) -> u32;

    /// Current mid price, `None` when market data is unavailable.
    fn mid_price(&self) -> BoxFuture<'_, Option<Price>>;

    /// Best ask and bid, `None` when the book cannot be read.
    fn book_top(&self) -> BoxFuture<'_, Option<BookTop>>;

    /// Place an order; returns the venue order id on success.
    fn place_order(&self, request: PlaceRequest) -> BoxFuture<'_, Option<u64>>;

    fn cancel_order(&self, order_id: u64) -> BoxFuture<'_, CancelOutcome>;

    /// Cancel a batch with pacing between requests; returns the outcome
    /// per order so the caller can credit fills discovered on the way.
    fn cancel_all(&self, order_ids: Vec<u64>) -> BoxFuture<'_, Vec<(u64, CancelOutcome)>>;
}

pub type DynVenue = Arc<dyn Venue>;

/// Scriptable in-memory venue for driving the trading loop in tests
/// and dry runs.
#[derive(Debug, Default)]
pub struct MockVenue {
    market_id: u32,
    mid: Mutex<Option<Price>>,
    top: Mutex<Option<BookTop>>,
    next_order_id: AtomicU64,
    placed: Mutex<Vec<(u64, PlaceRequest)>>,
    cancelled: Mutex<Vec<u64>>,
    filled_on_cancel: Mutex<HashSet<u64>>,
    reject_places: AtomicBool,
}

impl MockVenue {
    #[must_use]
    pub fn new(market_id: u32) -> Self {
        Self {
            market_id,
            next_order_id: AtomicU64::new(1),
            ..Self::default()
        }
    }

    pub fn set_book(&self, best_ask: Price, best_bid: Price) {
        *self.top.lock() = Some(BookTop { best_ask, best_bid });
        *self.mid.lock() = Some(Price::new(
            (best_ask.inner() + best_bid.inner()) / rust_decimal::Decimal::TWO,
        ));
    }

    pub fn set_mid(&self, mid: Option<Price>) {
        *self.mid.lock() = mid;
    }

    pub fn clear_book(&self) {
        *self.top.lock() = None;
        *self.mid.lock() = None;
    }

    /// Subsequent cancels of `order_id` report [`CancelOutcome::Filled`].
    pub fn mark_filled(&self, order_id: u64) {
        self.filled_on_cancel.lock().insert(order_id);
    }

    pub fn reject_places(&self, reject: bool) {
        self.reject_places.store(reject, Ordering::SeqCst);
    }

    #[must_use]
    pub fn placed(&self) -> Vec<(u64, PlaceRequest)> {
        self.placed.lock().clone()
    }

    #[must_use]
    pub fn cancelled(&self) -> Vec<u64> {
        self.cancelled.lock().clone()
    }
}

impl Venue for MockVenue {
    fn market_id(&self) -> u32 {
        self.market_id
    }

    fn mid_price(&self) -> BoxFuture<'_, Option<Price>> {
        Box::pin(async move { *self.mid.lock() })
    }

    fn book_top(&self) -> BoxFuture<'_, Option<BookTop>> {
        Box::pin(async move { *self.top.lock() })
    }

    fn place_order(&self, request: PlaceRequest) -> BoxFuture<'_, Option<u64>> {
        Box::pin(async move {
            if self.reject_places.load(Ordering::SeqCst) {
                return None;
            }
            let order_id = self.next_order_id.fetch_add(1, Ordering::SeqCst);
            self.placed.lock().push((order_id, request));
            Some(order_id)
        })
    }

    fn cancel_order(&self, order_id: u64) -> BoxFuture<'_, CancelOutcome> {
        Box::pin(async move {
            self.cancelled.lock().push(order_id);
            if self.filled_on_cancel.lock().contains(&order_id) {
                CancelOutcome::Filled
            } else {
                CancelOutcome::Cancelled
            }
        })
    }

    fn cancel_all(&self, order_ids: Vec<u64>) -> BoxFuture<'_, Vec<(u64, CancelOutcome)>> {
        Box::pin(async move {
            let mut outcomes = Vec::with_capacity(order_ids.len());
            for order_id in order_ids {
                let outcome = self.cancel_order(order_id).await;
                outcomes.push((order_id, outcome));
            }
            outcomes
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_mock_venue_records_placements() {
        let venue = MockVenue::new(0);
        venue.set_book(Price::from(dec!(100005)), Price::from(dec!(99995)));

        assert_eq!(venue.mid_price().await, Some(Price::from(dec!(100000))));

        let request = PlaceRequest {
            side: OrderSide::Sell,
            price: Price::from(dec!(100030)),
            size: Size::from(dec!(0.001)),
            fill_mode: FillMode::PostOnly,
            reduce_only: false,
        };
        let id = venue.place_order(request).await.unwrap();
        assert_eq!(venue.placed(), vec![(id, request)]);
    }

    #[tokio::test]
    async fn test_mock_venue_cancel_outcomes() {
        let venue = MockVenue::new(0);
        venue.mark_filled(7);

        assert_eq!(venue.cancel_order(3).await, CancelOutcome::Cancelled);
        assert_eq!(venue.cancel_order(7).await, CancelOutcome::Filled);
        assert_eq!(
            venue.cancel_all(vec![3, 7]).await,
            vec![(3, CancelOutcome::Cancelled), (7, CancelOutcome::Filled)]
        );
    }
}
