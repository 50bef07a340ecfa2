//! Configuration structures.

use std::collections::HashMap;

use config::ConfigError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use scalper_core::types::Timeframe;
use scalper_risk::SymbolSpec;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub backtest: BacktestSettings,
    /// Per-symbol strategy and data settings, keyed by symbol name.
    #[serde(default)]
    pub symbols: HashMap<String, SymbolSettings>,
}

impl AppConfig {
    /// Check cross-field constraints the type system cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::Message(
                "no symbols configured".to_string(),
            ));
        }
        for (symbol, settings) in &self.symbols {
            if settings.risk_percent <= Decimal::ZERO || settings.risk_percent > Decimal::ONE_HUNDRED
            {
                return Err(ConfigError::Message(format!(
                    "{}: risk_percent must be in (0, 100], got {}",
                    symbol, settings.risk_percent
                )));
            }
            settings
                .spec
                .validate()
                .map_err(|e| ConfigError::Message(format!("{}: {}", symbol, e)))?;
        }
        Ok(())
    }
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "scalper".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

/// Live/paper engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Magic number stamped on orders, used to recognize our positions.
    pub strategy_tag: u64,
    /// Feed poll interval in seconds.
    pub poll_interval_secs: u64,
    /// Positions open longer than this many full bars are closed at market.
    pub max_trade_duration_bars: usize,
    /// CSV trade audit log path; unset disables the audit trail.
    pub trade_log: Option<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            strategy_tag: 777_001,
            poll_interval_secs: 1,
            max_trade_duration_bars: 10,
            trade_log: None,
        }
    }
}

/// Backtest settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestSettings {
    pub initial_capital: Decimal,
    /// Inclusive range start, RFC 3339 or `YYYY-MM-DD`; unset means from
    /// the beginning of the archive.
    pub from: Option<String>,
    /// Inclusive range end; unset means to the end of the archive.
    pub to: Option<String>,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        use rust_decimal_macros::dec;
        Self {
            initial_capital: dec!(10000),
            from: None,
            to: None,
        }
    }
}

/// Per-symbol settings: which strategy runs on it, where its data lives
/// and what the contract looks like.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolSettings {
    #[serde(default = "default_strategy_type")]
    pub strategy_type: String,
    #[serde(default)]
    pub timeframe: Timeframe,
    #[serde(default = "default_risk_percent")]
    pub risk_percent: Decimal,
    /// CSV archive for backtest and paper modes.
    pub data_file: Option<String>,
    /// Contract specification; defaults to a five-digit FX symbol.
    #[serde(default = "SymbolSpec::fx_five_digit")]
    pub spec: SymbolSpec,
    /// Strategy parameters, passed through to the registry untouched.
    #[serde(default)]
    pub strategy: serde_json::Value,
}

fn default_strategy_type() -> String {
    "ema_ribbon_scalper".to_string()
}

fn default_risk_percent() -> Decimal {
    use rust_decimal_macros::dec;
    dec!(1)
}
