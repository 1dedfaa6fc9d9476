//! Regime classification and the NORMAL/COOLDOWN state machine.

use chrono::DateTime;
use tracing::{info, warn};

use grid_core::Clock;

use crate::config::RiskConfig;
use crate::indicators::IndicatorSnapshot;

/// Tolerance widening of the RSI band while a moderate trend is active.
const TREND_RSI_TOLERANCE: f64 = 5.0;

/// Market regime as classified from ADX.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketRegime {
    /// ADX at or below the trend threshold, the grid's home turf.
    Ranging,
    /// ADX between the trend and strong-trend thresholds.
    ModerateTrend,
    /// ADX above the strong-trend threshold.
    StrongTrend,
    /// Indicators unavailable.
    Unknown,
}

/// Outcome of one market-conditions evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketCheck {
    pub allowed: bool,
    pub trigger_cooldown: bool,
    /// Moderate trend with RSI still inside the widened band: trade,
    /// but flag the cycle. Informational only.
    pub cautious: bool,
    pub regime: MarketRegime,
    pub reason: String,
}

/// Cooldown state as seen by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct CooldownStatus {
    pub in_cooldown: bool,
    pub reason: Option<String>,
    pub remaining_secs: u64,
    pub end_at_ms: Option<u64>,
}

impl CooldownStatus {
    fn inactive() -> Self {
        Self {
            in_cooldown: false,
            reason: None,
            remaining_secs: 0,
            end_at_ms: None,
        }
    }
}

/// NORMAL/COOLDOWN state machine.
///
/// A cooldown ends purely on wall-clock expiry, checked on every status
/// query; nothing shortens or extends it except a manual reset.
pub struct RiskManager<C: Clock> {
    config: RiskConfig,
    clock: C,
    in_cooldown: bool,
    cooldown_end_ms: Option<u64>,
    cooldown_reason: String,
}

impl<C: Clock> RiskManager<C> {
    #[must_use]
    pub fn new(config: RiskConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            in_cooldown: false,
            cooldown_end_ms: None,
            cooldown_reason: String::new(),
        }
    }

    /// Classify the market and decide whether trading is allowed.
    ///
    /// Pure with respect to cooldown state; callers feed
    /// `trigger_cooldown` results into [`RiskManager::trigger_cooldown`].
    #[must_use]
    pub fn check_market_conditions(
        &self,
        indicators: Option<IndicatorSnapshot>,
    ) -> MarketCheck {
        let Some(snap) = indicators else {
            return MarketCheck {
                allowed: false,
                trigger_cooldown: true,
                cautious: false,
                regime: MarketRegime::Unknown,
                reason: "indicator data unavailable".to_string(),
            };
        };

        let IndicatorSnapshot { rsi, adx } = snap;

        if adx > self.config.adx_strong_trend {
            return MarketCheck {
                allowed: false,
                trigger_cooldown: true,
                cautious: false,
                regime: MarketRegime::StrongTrend,
                reason: format!(
                    "strong trend (ADX {adx:.2} > {})",
                    self.config.adx_strong_trend
                ),
            };
        }

        if adx > self.config.adx_trend_threshold {
            let rsi_low = self.config.rsi_min - TREND_RSI_TOLERANCE;
            let rsi_high = self.config.rsi_max + TREND_RSI_TOLERANCE;
            if rsi < rsi_low || rsi > rsi_high {
                return MarketCheck {
                    allowed: false,
                    trigger_cooldown: true,
                    cautious: false,
                    regime: MarketRegime::ModerateTrend,
                    reason: format!("extreme RSI {rsi:.2} in a trending market"),
                };
            }

            return MarketCheck {
                allowed: true,
                trigger_cooldown: false,
                cautious: true,
                regime: MarketRegime::ModerateTrend,
                reason: format!(
                    "trending market with contained RSI (ADX {adx:.2}, RSI {rsi:.2})"
                ),
            };
        }

        if rsi < self.config.rsi_min || rsi > self.config.rsi_max {
            return MarketCheck {
                allowed: false,
                trigger_cooldown: true,
                cautious: false,
                regime: MarketRegime::Ranging,
                reason: format!(
                    "RSI {rsi:.2} outside {}-{} band",
                    self.config.rsi_min, self.config.rsi_max
                ),
            };
        }

        MarketCheck {
            allowed: true,
            trigger_cooldown: false,
            cautious: false,
            regime: MarketRegime::Ranging,
            reason: format!("ranging market, RSI in band (ADX {adx:.2}, RSI {rsi:.2})"),
        }
    }

    /// Enter COOLDOWN until `now + cooldown_minutes`.
    pub fn trigger_cooldown(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        let end_ms = self.clock.now_ms() + self.config.cooldown_minutes * 60_000;

        self.in_cooldown = true;
        self.cooldown_reason = reason.clone();
        self.cooldown_end_ms = Some(end_ms);

        let resume_at = DateTime::from_timestamp((end_ms / 1000) as i64, 0)
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| end_ms.to_string());
        warn!(
            %reason,
            cooldown_minutes = self.config.cooldown_minutes,
            %resume_at,
            "risk cooldown triggered"
        );
    }

    /// Query cooldown state, clearing it if the wall clock has passed
    /// the end time.
    pub fn check_cooldown_status(&mut self) -> CooldownStatus {
        if !self.in_cooldown {
            return CooldownStatus::inactive();
        }

        let now = self.clock.now_ms();
        let end = self.cooldown_end_ms.unwrap_or(now);

        if now >= end {
            self.in_cooldown = false;
            self.cooldown_reason.clear();
            self.cooldown_end_ms = None;
            info!("risk cooldown expired, trading resumes");
            return CooldownStatus::inactive();
        }

        CooldownStatus {
            in_cooldown: true,
            reason: Some(self.cooldown_reason.clone()),
            remaining_secs: (end - now) / 1000,
            end_at_ms: Some(end),
        }
    }

    /// Manual reset, the only way to end a cooldown early.
    pub fn reset_cooldown(&mut self) {
        self.in_cooldown = false;
        self.cooldown_end_ms = None;
        self.cooldown_reason.clear();
        info!("risk cooldown manually reset");
    }

    /// One-line summary for status reporting.
    pub fn status_summary(&mut self, indicators: Option<IndicatorSnapshot>) -> String {
        let status = self.check_cooldown_status();
        if status.in_cooldown {
            return format!(
                "cooldown active ({}) for another {}s",
                status.reason.unwrap_or_default(),
                status.remaining_secs
            );
        }

        let check = self.check_market_conditions(indicators);
        if check.allowed {
            if check.cautious {
                format!("cautiously allowed: {}", check.reason)
            } else {
                format!("allowed: {}", check.reason)
            }
        } else {
            format!("blocked: {}", check.reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    struct MockClock {
        time_ms: AtomicU64,
    }

    impl MockClock {
        fn new(initial_ms: u64) -> Self {
            Self {
                time_ms: AtomicU64::new(initial_ms),
            }
        }

        fn set(&self, time_ms: u64) {
            self.time_ms.store(time_ms, Ordering::Release);
        }
    }

    impl Clock for MockClock {
        fn now_ms(&self) -> u64 {
            self.time_ms.load(Ordering::Acquire)
        }
    }

    const BASE_TIME: u64 = 1_700_000_000_000;

    fn manager() -> RiskManager<std::sync::Arc<MockClock>> {
        RiskManager::new(
            RiskConfig::default(),
            std::sync::Arc::new(MockClock::new(BASE_TIME)),
        )
    }

    fn snap(rsi: f64, adx: f64) -> Option<IndicatorSnapshot> {
        Some(IndicatorSnapshot { rsi, adx })
    }

    #[test]
    fn test_missing_indicators_trigger_cooldown() {
        let check = manager().check_market_conditions(None);
        assert!(!check.allowed);
        assert!(check.trigger_cooldown);
        assert_eq!(check.regime, MarketRegime::Unknown);
    }

    #[test]
    fn test_strong_trend_blocks_regardless_of_rsi() {
        let check = manager().check_market_conditions(snap(50.0, 35.0));
        assert!(!check.allowed);
        assert!(check.trigger_cooldown);
        assert_eq!(check.regime, MarketRegime::StrongTrend);
    }

    #[test]
    fn test_moderate_trend_with_extreme_rsi_blocks() {
        // RSI band widens to [25, 75] in a moderate trend
        let check = manager().check_market_conditions(snap(24.0, 27.0));
        assert!(!check.allowed);
        assert!(check.trigger_cooldown);
        assert_eq!(check.regime, MarketRegime::ModerateTrend);
    }

    #[test]
    fn test_moderate_trend_with_contained_rsi_is_cautious() {
        let check = manager().check_market_conditions(snap(72.0, 27.0));
        assert!(check.allowed);
        assert!(!check.trigger_cooldown);
        assert!(check.cautious);
    }

    #[test]
    fn test_ranging_market_outside_band_blocks() {
        let check = manager().check_market_conditions(snap(75.0, 20.0));
        assert!(!check.allowed);
        assert!(check.trigger_cooldown);
        assert_eq!(check.regime, MarketRegime::Ranging);
    }

    #[test]
    fn test_ranging_market_in_band_allows() {
        let check = manager().check_market_conditions(snap(50.0, 20.0));
        assert!(check.allowed);
        assert!(!check.cautious);
    }

    #[test]
    fn test_cooldown_expires_on_wall_clock() {
        let clock = std::sync::Arc::new(MockClock::new(BASE_TIME));
        let mut manager = RiskManager::new(RiskConfig::default(), std::sync::Arc::clone(&clock));

        manager.trigger_cooldown("test trigger");

        // One second before expiry: still cooling down.
        clock.set(BASE_TIME + 14 * 60_000 + 59_000);
        let status = manager.check_cooldown_status();
        assert!(status.in_cooldown);
        assert_eq!(status.reason.as_deref(), Some("test trigger"));
        assert!(status.remaining_secs <= 1);

        // One second past expiry: cleared, reason gone.
        clock.set(BASE_TIME + 15 * 60_000 + 1_000);
        let status = manager.check_cooldown_status();
        assert!(!status.in_cooldown);
        assert!(status.reason.is_none());
    }

    #[test]
    fn test_manual_reset_clears_cooldown() {
        let mut manager = manager();
        manager.trigger_cooldown("test trigger");
        manager.reset_cooldown();
        assert!(!manager.check_cooldown_status().in_cooldown);
    }

    #[test]
    fn test_status_summary_reflects_state() {
        let mut manager = manager();
        assert!(manager
            .status_summary(snap(50.0, 20.0))
            .starts_with("allowed"));

        manager.trigger_cooldown("strong trend");
        assert!(manager
            .status_summary(snap(50.0, 20.0))
            .starts_with("cooldown active"));
    }
}
