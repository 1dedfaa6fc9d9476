//! Application configuration.

use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use grid_client::{ClientConfig, KeySource};
use grid_risk::RiskConfig;
use grid_strategy::StrategyConfig;

use crate::error::{AppError, AppResult};

/// Venue connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueConfig {
    /// Venue REST base URL.
    #[serde(default = "default_api_url")]
    pub url: String,
    /// Market to trade on.
    #[serde(default)]
    pub market_id: u32,
    /// Environment variable holding the base58 user signing key.
    #[serde(default = "default_key_env_var")]
    pub key_env_var: String,
    /// Optional file holding the key instead; takes precedence when set.
    #[serde(default)]
    pub key_file: Option<PathBuf>,
}

fn default_api_url() -> String {
    "https://zo-mainnet.n1.xyz".to_string()
}

fn default_key_env_var() -> String {
    "GRID_TRADING_KEY".to_string()
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            market_id: 0,
            key_env_var: default_key_env_var(),
            key_file: None,
        }
    }
}

impl VenueConfig {
    pub fn key_source(&self) -> KeySource {
        match &self.key_file {
            Some(path) => KeySource::File { path: path.clone() },
            None => KeySource::EnvVar {
                var_name: self.key_env_var.clone(),
            },
        }
    }
}

/// Trading loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Display label for logs and status output.
    #[serde(default = "default_symbol")]
    pub symbol: String,
    /// Size of each grid order.
    #[serde(default = "default_order_size")]
    pub order_size: Decimal,
    /// Signed starting position; the venue has no position query, so
    /// this is operator-supplied on restart.
    #[serde(default)]
    pub initial_position: Decimal,
    /// Minimum seconds between any two placements.
    #[serde(default = "default_min_order_interval_secs")]
    pub min_order_interval_secs: u64,
    /// Pause after each placement.
    #[serde(default = "default_order_cooldown_secs")]
    pub order_cooldown_secs: u64,
    /// Cycle cadence while trading normally.
    #[serde(default = "default_monitor_interval_secs")]
    pub monitor_interval_secs: u64,
    /// Cycle cadence while in risk cooldown.
    #[serde(default = "default_risk_check_interval_secs")]
    pub risk_check_interval_secs: u64,
}

fn default_symbol() -> String {
    "BTC-PERP".to_string()
}

fn default_order_size() -> Decimal {
    // 0.001
    Decimal::new(1, 3)
}

fn default_min_order_interval_secs() -> u64 {
    8
}

fn default_order_cooldown_secs() -> u64 {
    4
}

fn default_monitor_interval_secs() -> u64 {
    10
}

fn default_risk_check_interval_secs() -> u64 {
    10
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            order_size: default_order_size(),
            initial_position: Decimal::ZERO,
            min_order_interval_secs: default_min_order_interval_secs(),
            order_cooldown_secs: default_order_cooldown_secs(),
            monitor_interval_secs: default_monitor_interval_secs(),
            risk_check_interval_secs: default_risk_check_interval_secs(),
        }
    }
}

/// External indicator feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorsConfig {
    /// Endpoint returning `{"rsi": .., "adx": ..}`. When unset, every
    /// cycle sees missing indicators and the bot stays in cooldown.
    #[serde(default)]
    pub url: Option<String>,
    /// Timeframe label passed to the provider.
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
}

fn default_timeframe() -> String {
    "1h".to_string()
}

impl Default for IndicatorsConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeframe: default_timeframe(),
        }
    }
}

/// Order ledger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Terminal orders retained for statistics.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

fn default_max_history() -> usize {
    1000
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
        }
    }
}

/// Application configuration, immutable after validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub venue: VenueConfig,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub indicators: IndicatorsConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

impl AppConfig {
    /// Load from `GRID_CONFIG` or the default path, falling back to
    /// defaults when no file exists.
    pub fn load() -> AppResult<Self> {
        let config_path =
            std::env::var("GRID_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("failed to parse config: {e}")))
    }

    /// Fatal pre-start validation.
    pub fn validate(&self) -> AppResult<()> {
        self.strategy.validate()?;

        if self.trading.order_size <= Decimal::ZERO {
            return Err(AppError::Config("order_size must be positive".into()));
        }
        if self.trading.monitor_interval_secs == 0 {
            return Err(AppError::Config(
                "monitor_interval_secs must be positive".into(),
            ));
        }
        if self.venue.url.is_empty() {
            return Err(AppError::Config("venue url must not be empty".into()));
        }
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.venue.url.clone(),
            market_id: self.venue.market_id,
            key_source: self.venue.key_source(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.venue.market_id, 0);
        assert_eq!(config.trading.order_size, dec!(0.001));
        assert_eq!(config.ledger.max_history, 1000);
    }

    #[test]
    fn test_parse_toml_sections() {
        let config: AppConfig = toml::from_str(
            r#"
            [venue]
            url = "http://localhost:8080"
            market_id = 2

            [trading]
            order_size = "0.002"
            monitor_interval_secs = 5

            [strategy]
            total_orders = 10

            [risk]
            cooldown_minutes = 30

            [indicators]
            url = "http://localhost:9000/indicators"
            "#,
        )
        .unwrap();

        assert_eq!(config.venue.url, "http://localhost:8080");
        assert_eq!(config.venue.market_id, 2);
        assert_eq!(config.trading.order_size, dec!(0.002));
        assert_eq!(config.strategy.total_orders, 10);
        assert_eq!(config.risk.cooldown_minutes, 30);
        assert!(config.indicators.url.is_some());
        config.validate().unwrap();
    }

    #[test]
    fn test_rejects_zero_order_size() {
        let config = AppConfig {
            trading: TradingConfig {
                order_size: Decimal::ZERO,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_key_file_takes_precedence() {
        let venue = VenueConfig {
            key_file: Some(PathBuf::from("/tmp/key")),
            ..Default::default()
        };
        assert!(matches!(venue.key_source(), KeySource::File { .. }));
    }
}
