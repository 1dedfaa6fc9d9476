//! Order bookkeeping: live set keyed by exchange order id, bounded history.

use std::collections::{HashMap, VecDeque};

use rust_decimal::Decimal;
use tracing::debug;

use grid_core::{OrderSide, OrderStatus, Price, TrackedOrder};

const DEFAULT_MAX_HISTORY: usize = 1000;

/// Aggregate counts for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedgerStats {
    pub total_open: usize,
    pub buy_orders: usize,
    pub sell_orders: usize,
    pub total_filled: usize,
    pub total_cancelled: usize,
    pub history_size: usize,
}

/// Tracks resting orders and their terminal outcomes.
///
/// Touched only by the single orchestrator task, so no interior locking.
#[derive(Debug)]
pub struct OrderLedger {
    orders: HashMap<u64, TrackedOrder>,
    history: VecDeque<TrackedOrder>,
    max_history: usize,
}

impl Default for OrderLedger {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl OrderLedger {
    #[must_use]
    pub fn new(max_history: usize) -> Self {
        Self {
            orders: HashMap::new(),
            history: VecDeque::new(),
            max_history,
        }
    }

    /// Start tracking a freshly placed order.
    pub fn add(&mut self, order: TrackedOrder) {
        debug!(
            order_id = order.order_id,
            side = %order.side,
            price = %order.price,
            size = %order.size,
            "tracking new order"
        );
        self.orders.insert(order.order_id, order);
    }

    /// Move an order to history with its terminal status.
    ///
    /// Returns the removed order so the caller can update its position
    /// on a fill. No-op (returns `None`) for unknown ids.
    pub fn remove(&mut self, order_id: u64, status: OrderStatus) -> Option<TrackedOrder> {
        let mut order = self.orders.remove(&order_id)?;
        order.status = status;

        self.history.push_back(order.clone());
        if self.history.len() > self.max_history {
            self.history.pop_front();
        }

        debug!(order_id, ?status, "order removed from live set");
        Some(order)
    }

    /// Open orders, optionally filtered by side, sorted by price ascending.
    #[must_use]
    pub fn open_orders(&self, side: Option<OrderSide>) -> Vec<TrackedOrder> {
        let mut orders: Vec<TrackedOrder> = self
            .orders
            .values()
            .filter(|o| side.map_or(true, |s| o.side == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| a.price.cmp(&b.price));
        orders
    }

    /// Sorted price list for one side, the reconciliation engine's input.
    #[must_use]
    pub fn prices(&self, side: OrderSide) -> Vec<Price> {
        self.open_orders(Some(side))
            .into_iter()
            .map(|o| o.price)
            .collect()
    }

    /// All live order ids, for cancel-all iteration.
    #[must_use]
    pub fn open_order_ids(&self) -> Vec<u64> {
        self.orders.keys().copied().collect()
    }

    /// Find a live order whose price is within `tolerance` of `price`.
    #[must_use]
    pub fn order_at_price(&self, price: Price, tolerance: Decimal) -> Option<&TrackedOrder> {
        self.orders
            .values()
            .find(|o| o.price.distance_to(price) < tolerance)
    }

    #[must_use]
    pub fn open_count(&self) -> usize {
        self.orders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> LedgerStats {
        let buy_orders = self.orders.values().filter(|o| o.side.is_buy()).count();
        LedgerStats {
            total_open: self.orders.len(),
            buy_orders,
            sell_orders: self.orders.len() - buy_orders,
            total_filled: self
                .history
                .iter()
                .filter(|o| o.status == OrderStatus::Filled)
                .count(),
            total_cancelled: self
                .history
                .iter()
                .filter(|o| o.status == OrderStatus::Cancelled)
                .count(),
            history_size: self.history.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_core::Size;
    use rust_decimal_macros::dec;

    fn order(id: u64, side: OrderSide, price: Decimal) -> TrackedOrder {
        TrackedOrder::new(
            id,
            0,
            side,
            Price::new(price),
            Size::new(dec!(0.001)),
            1_700_000_000_000,
        )
    }

    #[test]
    fn test_add_and_remove_lifecycle() {
        let mut ledger = OrderLedger::default();
        ledger.add(order(1, OrderSide::Sell, dec!(100030)));
        ledger.add(order(2, OrderSide::Buy, dec!(99970)));
        assert_eq!(ledger.open_count(), 2);

        let removed = ledger.remove(1, OrderStatus::Cancelled).unwrap();
        assert_eq!(removed.status, OrderStatus::Cancelled);
        assert_eq!(ledger.open_count(), 1);

        let stats = ledger.stats();
        assert_eq!(stats.total_cancelled, 1);
        assert_eq!(stats.total_filled, 0);
        assert_eq!(stats.history_size, 1);
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let mut ledger = OrderLedger::default();
        assert!(ledger.remove(99, OrderStatus::Filled).is_none());
        assert_eq!(ledger.stats().history_size, 0);
    }

    #[test]
    fn test_prices_sorted_per_side() {
        let mut ledger = OrderLedger::default();
        ledger.add(order(1, OrderSide::Sell, dec!(100050)));
        ledger.add(order(2, OrderSide::Sell, dec!(100030)));
        ledger.add(order(3, OrderSide::Buy, dec!(99970)));

        let sells = ledger.prices(OrderSide::Sell);
        assert_eq!(
            sells,
            vec![Price::new(dec!(100030)), Price::new(dec!(100050))]
        );
        assert_eq!(ledger.prices(OrderSide::Buy).len(), 1);
    }

    #[test]
    fn test_order_at_price_with_tolerance() {
        let mut ledger = OrderLedger::default();
        ledger.add(order(7, OrderSide::Buy, dec!(99970)));

        assert_eq!(
            ledger
                .order_at_price(Price::new(dec!(99970.5)), dec!(1))
                .map(|o| o.order_id),
            Some(7)
        );
        assert!(ledger
            .order_at_price(Price::new(dec!(99975)), dec!(1))
            .is_none());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut ledger = OrderLedger::new(3);
        for id in 0..5 {
            ledger.add(order(id, OrderSide::Buy, dec!(99970)));
            ledger.remove(id, OrderStatus::Filled);
        }
        let stats = ledger.stats();
        assert_eq!(stats.history_size, 3);
        assert_eq!(stats.total_filled, 3);
    }
}
