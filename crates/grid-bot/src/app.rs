//! Trading cycle orchestration.
//!
//! One logical task drives everything: risk gate, market snapshot,
//! grid reconciliation, paced cancels, paced placements, sleep. A
//! cooldown turns each cycle into cancel-everything-and-flatten until
//! the wall clock releases it. Errors inside a cycle trigger a cooldown
//! instead of killing the loop; only an interrupt stops the bot, and
//! shutdown cancels every resting order first.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use grid_client::{CancelOutcome, DynVenue, PlaceRequest};
use grid_core::{
    Clock, FillMode, MarketSnapshot, OrderSide, OrderStatus, Price, Size, TrackedOrder,
};
use grid_ledger::{LedgerStats, OrderLedger};
use grid_risk::{CooldownStatus, IndicatorProvider, RiskManager};
use grid_strategy::{CancelCandidate, GridEngine, GridPlan};

use crate::config::AppConfig;
use crate::error::AppResult;

/// Positions smaller than this are treated as flat.
const POSITION_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 4);

/// Delay between in-cycle cancels.
const CANCEL_PACING: Duration = Duration::from_millis(500);

/// Point-in-time view for status reporting.
#[derive(Debug, Clone)]
pub struct AppStatus {
    pub running: bool,
    pub symbol: String,
    pub cycle_count: u64,
    pub position: Decimal,
    pub cooldown: CooldownStatus,
    pub ledger: LedgerStats,
}

/// The trading loop and the state it owns.
pub struct Application {
    config: AppConfig,
    venue: DynVenue,
    indicators: Arc<dyn IndicatorProvider>,
    engine: GridEngine,
    risk: RiskManager<Arc<dyn Clock>>,
    ledger: OrderLedger,
    clock: Arc<dyn Clock>,
    /// Signed inventory in size units; positive = long.
    position: Decimal,
    last_order_at_ms: Option<u64>,
    cycle_count: u64,
    running: bool,
}

impl Application {
    pub fn new(
        config: AppConfig,
        venue: DynVenue,
        indicators: Arc<dyn IndicatorProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let engine = GridEngine::new(config.strategy.clone());
        let risk = RiskManager::new(config.risk.clone(), Arc::clone(&clock));
        let ledger = OrderLedger::new(config.ledger.max_history);
        let position = config.trading.initial_position;

        Self {
            config,
            venue,
            indicators,
            engine,
            risk,
            ledger,
            clock,
            position,
            last_order_at_ms: None,
            cycle_count: 0,
            running: false,
        }
    }

    /// Run until interrupted. Every exit path cancels resting orders.
    pub async fn run(&mut self) -> AppResult<()> {
        // A spawned listener registers the signal handler immediately;
        // the loop only checks it between cycles so an interrupt never
        // abandons a half-placed grid.
        let (tx, rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(());
            }
        });
        self.run_until(async {
            let _ = rx.await;
        })
        .await
    }

    /// Run cycles until `interrupt` resolves, checked only between
    /// cycles so each cycle completes before shutdown begins.
    pub async fn run_until<F>(&mut self, interrupt: F) -> AppResult<()>
    where
        F: std::future::Future<Output = ()>,
    {
        self.running = true;
        self.position = self.reconcile_position_from_venue();
        info!(
            symbol = %self.config.trading.symbol,
            market_id = self.venue.market_id(),
            position = %self.position,
            "trading loop started"
        );

        tokio::pin!(interrupt);
        loop {
            let started_ms = self.clock.now_ms();

            if let Err(err) = self.run_cycle_once().await {
                error!(error = %err, "cycle failed, entering cooldown");
                self.risk.trigger_cooldown(err.to_string());
                self.emergency_stop().await;
            }

            let interval_secs = if self.risk.check_cooldown_status().in_cooldown {
                self.config.trading.risk_check_interval_secs
            } else {
                self.config.trading.monitor_interval_secs
            };
            let elapsed_ms = self.clock.now_ms().saturating_sub(started_ms);
            let sleep_ms = (interval_secs * 1000).saturating_sub(elapsed_ms).max(1000);

            tokio::select! {
                () = &mut interrupt => {
                    info!("interrupt received");
                    break;
                }
                () = tokio::time::sleep(Duration::from_millis(sleep_ms)) => {}
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// One full trading cycle.
    pub async fn run_cycle_once(&mut self) -> AppResult<()> {
        self.cycle_count += 1;
        debug!(cycle = self.cycle_count, "cycle start");

        let status = self.risk.check_cooldown_status();
        if status.in_cooldown {
            info!(
                remaining_secs = status.remaining_secs,
                reason = status.reason.as_deref().unwrap_or(""),
                "in cooldown, holding flat"
            );
            self.emergency_stop().await;
            return Ok(());
        }

        let indicators = self
            .indicators
            .indicators(&self.config.indicators.timeframe)
            .await;
        let check = self.risk.check_market_conditions(indicators);
        if check.trigger_cooldown {
            warn!(reason = %check.reason, "market conditions block trading");
            self.risk.trigger_cooldown(check.reason.clone());
            self.emergency_stop().await;
            return Ok(());
        }
        if check.cautious {
            info!(reason = %check.reason, "trading cautiously");
        }

        let Some(snapshot) = self.market_snapshot().await else {
            warn!("market data unavailable, skipping cycle");
            return Ok(());
        };

        // First pass picks the stale orders to drop; the second re-plans
        // against the thinned ladder so placements reflect any fills
        // discovered while cancelling.
        let plan = self.reconcile(&snapshot);
        self.process_cancels(&plan.orders_to_cancel).await;

        let plan = self.reconcile(&snapshot);
        self.place_grid_orders(&plan).await;

        Ok(())
    }

    /// The venue exposes no position endpoint; restart-time inventory is
    /// operator-supplied via `initial_position`. A venue-side position
    /// query would slot in here if one appears.
    pub fn reconcile_position_from_venue(&self) -> Decimal {
        self.config.trading.initial_position
    }

    pub fn status(&mut self) -> AppStatus {
        AppStatus {
            running: self.running,
            symbol: self.config.trading.symbol.clone(),
            cycle_count: self.cycle_count,
            position: self.position,
            cooldown: self.risk.check_cooldown_status(),
            ledger: self.ledger.stats(),
        }
    }

    async fn market_snapshot(&self) -> Option<MarketSnapshot> {
        let mid = self.venue.mid_price().await?;
        let top = self.venue.book_top().await?;
        Some(MarketSnapshot::new(mid, top))
    }

    fn reconcile(&self, snapshot: &MarketSnapshot) -> GridPlan {
        self.engine.reconcile(
            snapshot,
            self.position,
            Size::new(self.config.trading.order_size),
            &self.ledger.prices(OrderSide::Sell),
            &self.ledger.prices(OrderSide::Buy),
        )
    }

    async fn process_cancels(&mut self, candidates: &[CancelCandidate]) {
        for (i, candidate) in candidates.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(CANCEL_PACING).await;
            }

            let Some(order) = self
                .ledger
                .open_orders(Some(candidate.side))
                .into_iter()
                .find(|o| o.price == candidate.price)
            else {
                continue;
            };

            match self.venue.cancel_order(order.order_id).await {
                CancelOutcome::Cancelled => {
                    self.ledger.remove(order.order_id, OrderStatus::Cancelled);
                }
                CancelOutcome::Filled => {
                    if let Some(filled) =
                        self.ledger.remove(order.order_id, OrderStatus::Filled)
                    {
                        self.apply_fill(&filled);
                    }
                }
                CancelOutcome::Failed => {
                    warn!(
                        order_id = order.order_id,
                        "cancel failed, keeping order tracked"
                    );
                }
            }
        }
    }

    fn apply_fill(&mut self, order: &TrackedOrder) {
        match order.side {
            OrderSide::Buy => self.position += order.size.inner(),
            OrderSide::Sell => self.position -= order.size.inner(),
        }
        info!(
            order_id = order.order_id,
            side = %order.side,
            price = %order.price,
            position = %self.position,
            "order filled before cancel, position updated"
        );
    }

    async fn place_grid_orders(&mut self, plan: &GridPlan) {
        if plan.is_empty() {
            debug!("grid already converged");
            return;
        }

        let targets: Vec<(OrderSide, Price)> = plan
            .new_sell_prices
            .iter()
            .map(|&p| (OrderSide::Sell, p))
            .chain(plan.new_buy_prices.iter().map(|&p| (OrderSide::Buy, p)))
            .collect();

        for (side, price) in targets {
            if let Some(last) = self.last_order_at_ms {
                let min_ms = self.config.trading.min_order_interval_secs * 1000;
                let elapsed = self.clock.now_ms().saturating_sub(last);
                if elapsed < min_ms {
                    debug!(
                        wait_ms = min_ms - elapsed,
                        "waiting out minimum order interval"
                    );
                    tokio::time::sleep(Duration::from_millis(min_ms - elapsed)).await;
                }
            }
            let now_ms = self.clock.now_ms();

            let request = PlaceRequest {
                side,
                price,
                size: Size::new(self.config.trading.order_size),
                fill_mode: FillMode::PostOnly,
                reduce_only: false,
            };
            match self.venue.place_order(request).await {
                Some(order_id) => {
                    self.ledger.add(TrackedOrder::new(
                        order_id,
                        self.venue.market_id(),
                        side,
                        price,
                        request.size,
                        now_ms,
                    ));
                    self.last_order_at_ms = Some(now_ms);
                    tokio::time::sleep(Duration::from_secs(
                        self.config.trading.order_cooldown_secs,
                    ))
                    .await;
                }
                None => warn!(%side, %price, "placement failed"),
            }
        }
    }

    /// Cancel everything and flatten, for cooldown entry and each
    /// cooldown cycle.
    async fn emergency_stop(&mut self) {
        self.cancel_all_orders().await;
        if self.position.abs() > POSITION_EPSILON {
            self.flatten_position().await;
        }
    }

    /// Close the position with a reduce-only IOC priced 0.5% through
    /// the book so it fills against whatever is resting.
    async fn flatten_position(&mut self) {
        let Some(top) = self.venue.book_top().await else {
            warn!("cannot flatten, order book unavailable");
            return;
        };

        let (side, price) = if self.position > Decimal::ZERO {
            (
                OrderSide::Sell,
                Price::new(top.best_bid.inner() * Decimal::new(995, 3)),
            )
        } else {
            (
                OrderSide::Buy,
                Price::new(top.best_ask.inner() * Decimal::new(1005, 3)),
            )
        };
        let request = PlaceRequest {
            side,
            price,
            size: Size::new(self.position.abs()),
            fill_mode: FillMode::Immediate,
            reduce_only: true,
        };

        warn!(%side, size = %request.size, %price, "flattening position");
        match self.venue.place_order(request).await {
            Some(order_id) => {
                info!(order_id, "flatten order submitted");
                self.position = Decimal::ZERO;
            }
            None => error!("flatten order failed, position remains open"),
        }
    }

    async fn cancel_all_orders(&mut self) {
        let ids = self.ledger.open_order_ids();
        if ids.is_empty() {
            return;
        }

        info!(count = ids.len(), "cancelling all resting orders");
        let requested = ids.len();
        let mut confirmed = 0;
        for (id, outcome) in self.venue.cancel_all(ids).await {
            match outcome {
                CancelOutcome::Cancelled => {
                    self.ledger.remove(id, OrderStatus::Cancelled);
                    confirmed += 1;
                }
                CancelOutcome::Filled => {
                    if let Some(filled) = self.ledger.remove(id, OrderStatus::Filled) {
                        self.apply_fill(&filled);
                    }
                    confirmed += 1;
                }
                CancelOutcome::Failed => {
                    warn!(order_id = id, "cancel failed, keeping order tracked");
                }
            }
        }
        if confirmed < requested {
            warn!(requested, confirmed, "some cancels were not confirmed");
        }
    }

    async fn shutdown(&mut self) {
        info!("shutting down, cancelling resting orders");
        self.cancel_all_orders().await;
        self.running = false;

        let stats = self.ledger.stats();
        info!(
            cycles = self.cycle_count,
            position = %self.position,
            filled = stats.total_filled,
            cancelled = stats.total_cancelled,
            "shutdown complete"
        );
    }
}
