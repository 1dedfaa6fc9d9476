//! Strategy configuration.

use grid_core::CoreError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Grid ladder parameters.
///
/// Ratios and the position multiplier are dimensionless and stay `f64`;
/// everything priced is `Decimal` so ladder prices compare exactly
/// across cycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Total resting orders across both sides.
    #[serde(default = "default_total_orders")]
    pub total_orders: u32,
    /// Grid window width as a fraction of mid price.
    #[serde(default = "default_window_percent")]
    pub window_percent: Decimal,
    /// Base share of sell orders at zero inventory.
    #[serde(default = "default_sell_ratio")]
    pub sell_ratio: f64,
    /// Base share of buy orders at zero inventory.
    #[serde(default = "default_buy_ratio")]
    pub buy_ratio: f64,
    /// Price step between adjacent ladder levels.
    #[serde(default = "default_base_price_interval")]
    pub base_price_interval: Decimal,
    /// Minimum offset from best ask/bid before posting.
    #[serde(default = "default_safe_gap")]
    pub safe_gap: Decimal,
    /// Extra allowance beyond the window before a side stops extending.
    #[serde(default = "default_max_drift_buffer")]
    pub max_drift_buffer: Decimal,
    /// Crash floor: no buy order is ever generated below this.
    #[serde(default = "default_min_valid_price")]
    pub min_valid_price: Decimal,
    /// Inventory limit in multiples of the per-order size.
    #[serde(default = "default_max_multiplier")]
    pub max_multiplier: f64,
}

fn default_total_orders() -> u32 {
    18
}

fn default_window_percent() -> Decimal {
    // 12%
    Decimal::new(12, 2)
}

fn default_sell_ratio() -> f64 {
    0.5
}

fn default_buy_ratio() -> f64 {
    0.5
}

fn default_base_price_interval() -> Decimal {
    Decimal::from(10)
}

fn default_safe_gap() -> Decimal {
    Decimal::from(20)
}

fn default_max_drift_buffer() -> Decimal {
    Decimal::from(2000)
}

fn default_min_valid_price() -> Decimal {
    Decimal::from(10000)
}

fn default_max_multiplier() -> f64 {
    15.0
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            total_orders: default_total_orders(),
            window_percent: default_window_percent(),
            sell_ratio: default_sell_ratio(),
            buy_ratio: default_buy_ratio(),
            base_price_interval: default_base_price_interval(),
            safe_gap: default_safe_gap(),
            max_drift_buffer: default_max_drift_buffer(),
            min_valid_price: default_min_valid_price(),
            max_multiplier: default_max_multiplier(),
        }
    }
}

impl StrategyConfig {
    /// Validate parameters that would make the engine misbehave.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.total_orders == 0 {
            return Err(CoreError::InvalidConfig(
                "total_orders must be positive".into(),
            ));
        }
        if (self.sell_ratio + self.buy_ratio - 1.0).abs() > 1e-9 {
            return Err(CoreError::InvalidConfig(
                "sell_ratio + buy_ratio must equal 1.0".into(),
            ));
        }
        if self.base_price_interval <= Decimal::ZERO {
            return Err(CoreError::InvalidConfig(
                "base_price_interval must be positive".into(),
            ));
        }
        if self.max_multiplier <= 0.0 {
            return Err(CoreError::InvalidConfig(
                "max_multiplier must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        StrategyConfig::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_unbalanced_ratios() {
        let config = StrategyConfig {
            sell_ratio: 0.6,
            buy_ratio: 0.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
