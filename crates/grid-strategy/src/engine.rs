//! Ladder generation and reconciliation.

use std::collections::HashSet;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use grid_core::{MarketSnapshot, OrderSide, Price, Size};

use crate::config::StrategyConfig;

/// Cancel batch cap per cycle, to avoid over-aggressive churn in one pass.
const MAX_CANCELS_PER_CYCLE: usize = 10;

/// Inventory-skewed issuance ratios.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionRatio {
    pub sell: f64,
    pub buy: f64,
    /// Inventory reached `max_multiplier`: only reducing orders are issued.
    pub at_limit: bool,
}

/// An existing order the plan wants cancelled, identified by side and price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CancelCandidate {
    pub side: OrderSide,
    pub price: Price,
}

/// The engine's sole output, fully determined by its inputs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GridPlan {
    pub new_sell_prices: Vec<Price>,
    pub new_buy_prices: Vec<Price>,
    pub orders_to_cancel: Vec<CancelCandidate>,
    pub sell_count: u32,
    pub buy_count: u32,
}

impl GridPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.new_sell_prices.is_empty()
            && self.new_buy_prices.is_empty()
            && self.orders_to_cancel.is_empty()
    }
}

/// Pure grid reconciliation engine.
#[derive(Debug, Clone)]
pub struct GridEngine {
    config: StrategyConfig,
}

impl GridEngine {
    #[must_use]
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    /// Issuance ratios skewed by current inventory.
    ///
    /// `position` is signed (positive = long), expressed in the same
    /// unit as `order_size`. At or beyond `max_multiplier` only the
    /// reducing side is issued; below it the overweight side's ratio is
    /// reduced proportionally and both sides are clamped to `[0.1, 0.9]`
    /// so neither collapses before the hard limit.
    #[must_use]
    pub fn position_ratio(&self, position: Decimal, order_size: Size) -> PositionRatio {
        let base = PositionRatio {
            sell: self.config.sell_ratio,
            buy: self.config.buy_ratio,
            at_limit: false,
        };

        if !order_size.is_positive() {
            warn!("order size is not positive, using base ratios");
            return base;
        }

        let multiplier = (position.abs() / order_size.inner())
            .to_f64()
            .unwrap_or(0.0);

        if multiplier >= self.config.max_multiplier {
            return if position > Decimal::ZERO {
                PositionRatio {
                    sell: 1.0,
                    buy: 0.0,
                    at_limit: true,
                }
            } else {
                PositionRatio {
                    sell: 0.0,
                    buy: 1.0,
                    at_limit: true,
                }
            };
        }

        if multiplier > 0.0 {
            let reduction_ratio = multiplier / self.config.max_multiplier;
            let (sell, buy) = if position > Decimal::ZERO {
                // Long: reduce buys, sells absorb the complement.
                let buy = self.config.buy_ratio - reduction_ratio * self.config.buy_ratio;
                (1.0 - buy, buy)
            } else {
                let sell = self.config.sell_ratio - reduction_ratio * self.config.sell_ratio;
                (sell, 1.0 - sell)
            };

            return PositionRatio {
                sell: sell.clamp(0.1, 0.9),
                buy: buy.clamp(0.1, 0.9),
                at_limit: false,
            };
        }

        base
    }

    /// Compute the full plan: target counts, ideal ladder, and the
    /// minimal place/cancel delta against the existing price sets.
    #[must_use]
    pub fn reconcile(
        &self,
        snapshot: &MarketSnapshot,
        position: Decimal,
        order_size: Size,
        existing_sell: &[Price],
        existing_buy: &[Price],
    ) -> GridPlan {
        let half_window = snapshot.mid_price.inner() * self.config.window_percent
            / Decimal::from(2);

        let ratio = self.position_ratio(position, order_size);

        // Counts always sum exactly to total_orders.
        let sell_count = (f64::from(self.config.total_orders) * ratio.sell).round() as u32;
        let buy_count = self.config.total_orders - sell_count;

        let ideal_sells =
            self.sell_ladder(snapshot.best_ask, snapshot.mid_price, half_window, sell_count);
        let ideal_buys =
            self.buy_ladder(snapshot.best_bid, snapshot.mid_price, half_window, buy_count);

        let existing_sell_set: HashSet<Price> = existing_sell.iter().copied().collect();
        let existing_buy_set: HashSet<Price> = existing_buy.iter().copied().collect();

        let new_sell_prices: Vec<Price> = ideal_sells
            .iter()
            .copied()
            .filter(|p| !existing_sell_set.contains(p))
            .collect();
        let new_buy_prices: Vec<Price> = ideal_buys
            .iter()
            .copied()
            .filter(|p| !existing_buy_set.contains(p))
            .collect();

        let ideal_set: HashSet<Price> =
            ideal_sells.iter().chain(ideal_buys.iter()).copied().collect();
        let orders_to_cancel = self.cancel_candidates(
            existing_sell,
            existing_buy,
            &ideal_set,
            snapshot.mid_price,
            sell_count as usize,
            buy_count as usize,
        );

        debug!(
            existing = existing_sell.len() + existing_buy.len(),
            target_sells = ideal_sells.len(),
            target_buys = ideal_buys.len(),
            to_place = new_sell_prices.len() + new_buy_prices.len(),
            to_cancel = orders_to_cancel.len(),
            "reconciliation plan"
        );

        GridPlan {
            new_sell_prices,
            new_buy_prices,
            orders_to_cancel,
            sell_count,
            buy_count,
        }
    }

    fn sell_ladder(
        &self,
        best_ask: Price,
        mid: Price,
        half_window: Decimal,
        count: u32,
    ) -> Vec<Price> {
        if count == 0 {
            return Vec::new();
        }

        let interval = Price::new(self.config.base_price_interval);
        let start = (best_ask + Price::new(self.config.safe_gap)).ceil_to(interval);
        let upper = mid.inner() + half_window + self.config.max_drift_buffer;

        let mut prices = Vec::with_capacity(count as usize);
        for i in 0..count {
            let price = start + interval * Decimal::from(i);
            if price.inner() > upper {
                break;
            }
            prices.push(price);
        }
        prices
    }

    fn buy_ladder(
        &self,
        best_bid: Price,
        mid: Price,
        half_window: Decimal,
        count: u32,
    ) -> Vec<Price> {
        if count == 0 {
            return Vec::new();
        }

        let interval = Price::new(self.config.base_price_interval);
        let start = (best_bid - Price::new(self.config.safe_gap)).floor_to(interval);
        let lower = mid.inner() - half_window - self.config.max_drift_buffer;

        let mut prices = Vec::with_capacity(count as usize);
        for i in 0..count {
            let price = start - interval * Decimal::from(i);
            if price.inner() < lower {
                break;
            }
            // Crash floor.
            if price.inner() < self.config.min_valid_price {
                break;
            }
            prices.push(price);
        }
        prices
    }

    /// Whether an order sits close enough to the current price that
    /// cancelling it is likely wasted churn. Advisory only; the plan's
    /// cancel list does not consult it.
    #[must_use]
    pub fn should_skip_cancel(&self, order_price: Price, current_price: Price) -> bool {
        let threshold = self.config.base_price_interval
            * Decimal::try_from(self.config.max_multiplier).unwrap_or(Decimal::ZERO)
            / Decimal::from(4);
        order_price.distance_to(current_price) < threshold
    }

    /// Existing orders outside the ideal set, farthest from mid first,
    /// considered only when the ladder is over target, capped per cycle.
    fn cancel_candidates(
        &self,
        existing_sell: &[Price],
        existing_buy: &[Price],
        ideal_set: &HashSet<Price>,
        mid: Price,
        target_sell_count: usize,
        target_buy_count: usize,
    ) -> Vec<CancelCandidate> {
        let current_total = existing_sell.len() + existing_buy.len();
        let over_target = current_total > self.config.total_orders as usize
            || existing_sell.len() > target_sell_count
            || existing_buy.len() > target_buy_count;

        if !over_target {
            return Vec::new();
        }

        let mut stale: Vec<CancelCandidate> = existing_sell
            .iter()
            .filter(|p| !ideal_set.contains(p))
            .map(|&price| CancelCandidate {
                side: OrderSide::Sell,
                price,
            })
            .chain(
                existing_buy
                    .iter()
                    .filter(|p| !ideal_set.contains(p))
                    .map(|&price| CancelCandidate {
                        side: OrderSide::Buy,
                        price,
                    }),
            )
            .collect();

        stale.sort_by(|a, b| b.price.distance_to(mid).cmp(&a.price.distance_to(mid)));
        stale.truncate(MAX_CANCELS_PER_CYCLE);
        stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_core::BookTop;
    use rust_decimal_macros::dec;

    fn engine() -> GridEngine {
        GridEngine::new(StrategyConfig::default())
    }

    fn snapshot(mid: Decimal, ask: Decimal, bid: Decimal) -> MarketSnapshot {
        MarketSnapshot::new(
            Price::new(mid),
            BookTop {
                best_ask: Price::new(ask),
                best_bid: Price::new(bid),
            },
        )
    }

    fn order_size() -> Size {
        Size::new(dec!(0.001))
    }

    #[test]
    fn test_balanced_ladder_around_mid() {
        // total=18, window=12%, ratios 0.5/0.5, interval=10, gap=20
        let plan = engine().reconcile(
            &snapshot(dec!(100000), dec!(100005), dec!(99995)),
            Decimal::ZERO,
            order_size(),
            &[],
            &[],
        );

        assert_eq!(plan.sell_count, 9);
        assert_eq!(plan.buy_count, 9);
        assert_eq!(plan.new_sell_prices[0], Price::new(dec!(100030)));
        assert_eq!(plan.new_buy_prices[0], Price::new(dec!(99970)));
        assert_eq!(plan.new_sell_prices.len(), 9);
        assert_eq!(plan.new_buy_prices.len(), 9);
        assert!(plan.orders_to_cancel.is_empty());
    }

    #[test]
    fn test_at_limit_long_emits_only_sells() {
        // position 0.015 at order size 0.001 is exactly 15x
        let ratio = engine().position_ratio(dec!(0.015), order_size());
        assert!(ratio.at_limit);
        assert_eq!(ratio.sell, 1.0);
        assert_eq!(ratio.buy, 0.0);
    }

    #[test]
    fn test_at_limit_short_emits_only_buys() {
        let ratio = engine().position_ratio(dec!(-0.015), order_size());
        assert!(ratio.at_limit);
        assert_eq!(ratio.sell, 0.0);
        assert_eq!(ratio.buy, 1.0);
    }

    #[test]
    fn test_ratios_sum_to_one_below_limit() {
        let engine = engine();
        for position in [
            dec!(0),
            dec!(0.001),
            dec!(0.005),
            dec!(0.0149),
            dec!(-0.003),
            dec!(-0.012),
        ] {
            let ratio = engine.position_ratio(position, order_size());
            assert!(!ratio.at_limit, "position {position} should be below limit");
            assert!(
                (ratio.sell + ratio.buy - 1.0).abs() < 1e-9,
                "ratios must sum to 1.0 at position {position}"
            );
        }
    }

    #[test]
    fn test_ratios_clamped_before_limit() {
        // 14x long out of 15x: unclamped buy ratio would be ~0.033
        let ratio = engine().position_ratio(dec!(0.014), order_size());
        assert!(!ratio.at_limit);
        assert_eq!(ratio.buy, 0.1);
        assert_eq!(ratio.sell, 0.9);
    }

    #[test]
    fn test_counts_sum_to_total() {
        let engine = engine();
        for position in [dec!(0), dec!(0.004), dec!(-0.009), dec!(0.015)] {
            let plan = engine.reconcile(
                &snapshot(dec!(100000), dec!(100005), dec!(99995)),
                position,
                order_size(),
                &[],
                &[],
            );
            assert_eq!(plan.sell_count + plan.buy_count, 18);
        }
    }

    #[test]
    fn test_ladder_monotonic_and_gapped() {
        let snap = snapshot(dec!(100000), dec!(100005), dec!(99995));
        let plan = engine().reconcile(&snap, Decimal::ZERO, order_size(), &[], &[]);

        let min_sell = snap.best_ask + Price::new(dec!(20));
        for pair in plan.new_sell_prices.windows(2) {
            assert!(pair[0] < pair[1], "sell ladder must ascend");
        }
        for p in &plan.new_sell_prices {
            assert!(*p >= min_sell);
        }

        let max_buy = snap.best_bid - Price::new(dec!(20));
        for pair in plan.new_buy_prices.windows(2) {
            assert!(pair[0] > pair[1], "buy ladder must descend");
        }
        for p in &plan.new_buy_prices {
            assert!(*p <= max_buy);
            assert!(p.inner() >= dec!(10000));
        }
    }

    #[test]
    fn test_buy_ladder_stops_at_crash_floor() {
        let config = StrategyConfig {
            min_valid_price: dec!(99950),
            ..Default::default()
        };
        let plan = GridEngine::new(config).reconcile(
            &snapshot(dec!(100000), dec!(100005), dec!(99995)),
            Decimal::ZERO,
            order_size(),
            &[],
            &[],
        );

        // 99970, 99960, 99950 then the floor cuts the rest
        assert_eq!(plan.new_buy_prices.len(), 3);
        assert_eq!(
            plan.new_buy_prices.last().copied(),
            Some(Price::new(dec!(99950)))
        );
    }

    #[test]
    fn test_idempotent_and_converges_to_empty_delta() {
        let engine = engine();
        let snap = snapshot(dec!(100000), dec!(100005), dec!(99995));

        let first = engine.reconcile(&snap, Decimal::ZERO, order_size(), &[], &[]);
        let second = engine.reconcile(&snap, Decimal::ZERO, order_size(), &[], &[]);
        assert_eq!(first, second);

        // Feed the plan's own output back as the resting sets.
        let converged = engine.reconcile(
            &snap,
            Decimal::ZERO,
            order_size(),
            &first.new_sell_prices,
            &first.new_buy_prices,
        );
        assert!(converged.is_empty());
    }

    #[test]
    fn test_cancels_farthest_first_capped_at_ten() {
        let engine = engine();
        let snap = snapshot(dec!(100000), dec!(100005), dec!(99995));

        // 14 stale sells far above the window plus 9 in-ladder buys:
        // total 23 > 18 forces cancellation.
        let stale_sells: Vec<Price> = (0..14)
            .map(|i| Price::new(dec!(103000) + Decimal::from(10 * i)))
            .collect();
        let good_buys: Vec<Price> = (0..9)
            .map(|i| Price::new(dec!(99970) - Decimal::from(10 * i)))
            .collect();

        let plan = engine.reconcile(
            &snap,
            Decimal::ZERO,
            order_size(),
            &stale_sells,
            &good_buys,
        );

        assert_eq!(plan.orders_to_cancel.len(), 10);
        // Farthest from mid comes first.
        assert_eq!(plan.orders_to_cancel[0].price, Price::new(dec!(103130)));
        for pair in plan.orders_to_cancel.windows(2) {
            assert!(
                pair[0].price.distance_to(snap.mid_price)
                    >= pair[1].price.distance_to(snap.mid_price)
            );
        }
        assert!(plan
            .orders_to_cancel
            .iter()
            .all(|c| c.side == OrderSide::Sell));
    }

    #[test]
    fn test_skip_cancel_near_current_price() {
        // interval=10, max_multiplier=15: threshold 37.5
        let engine = engine();
        let current = Price::new(dec!(100000));
        assert!(engine.should_skip_cancel(Price::new(dec!(100030)), current));
        assert!(!engine.should_skip_cancel(Price::new(dec!(100040)), current));
    }

    #[test]
    fn test_no_cancels_while_under_target() {
        let plan = engine().reconcile(
            &snapshot(dec!(100000), dec!(100005), dec!(99995)),
            Decimal::ZERO,
            order_size(),
            // One stale sell, but totals are under target on both sides.
            &[Price::new(dec!(103000))],
            &[Price::new(dec!(99970))],
        );
        assert!(plan.orders_to_cancel.is_empty());
    }
}
