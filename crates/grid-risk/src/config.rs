//! Risk filter configuration.

use serde::{Deserialize, Serialize};

/// Thresholds for the RSI/ADX regime classification and the cooldown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Lower bound of the acceptable RSI band.
    #[serde(default = "default_rsi_min")]
    pub rsi_min: f64,
    /// Upper bound of the acceptable RSI band.
    #[serde(default = "default_rsi_max")]
    pub rsi_max: f64,
    /// ADX above this is a trending market.
    #[serde(default = "default_adx_trend_threshold")]
    pub adx_trend_threshold: f64,
    /// ADX above this is a strong trend, blocked unconditionally.
    #[serde(default = "default_adx_strong_trend")]
    pub adx_strong_trend: f64,
    /// Cooldown duration after a trigger.
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: u64,
}

fn default_rsi_min() -> f64 {
    30.0
}

fn default_rsi_max() -> f64 {
    70.0
}

fn default_adx_trend_threshold() -> f64 {
    25.0
}

fn default_adx_strong_trend() -> f64 {
    30.0
}

fn default_cooldown_minutes() -> u64 {
    15
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            rsi_min: default_rsi_min(),
            rsi_max: default_rsi_max(),
            adx_trend_threshold: default_adx_trend_threshold(),
            adx_strong_trend: default_adx_strong_trend(),
            cooldown_minutes: default_cooldown_minutes(),
        }
    }
}
