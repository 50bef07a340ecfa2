//! Strategy registry for configuration-driven strategy construction.

use crate::{EmaRibbonConfig, EmaRibbonScalper};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use scalper_core::{error::StrategyError, traits::Strategy};

/// Information about a registered strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyInfo {
    /// Strategy name
    pub name: String,
    /// Strategy description
    pub description: String,
    /// Default configuration as JSON
    pub default_config: serde_json::Value,
}

/// Registry for available trading strategies, keyed by the `strategy_type`
/// value used in per-symbol configuration.
pub struct StrategyRegistry {
    strategies: HashMap<String, StrategyInfo>,
}

impl StrategyRegistry {
    /// Create a new strategy registry with all built-in strategies.
    pub fn new() -> Self {
        let mut strategies = HashMap::new();

        strategies.insert(
            "ema_ribbon_scalper".to_string(),
            StrategyInfo {
                name: "EMA Ribbon Scalper".to_string(),
                description:
                    "Breakout entries out of a consolidation on EMA ribbon alignment with RSI confirmation"
                        .to_string(),
                default_config: serde_json::json!({
                    "fast_periods": [5, 8, 11, 14],
                    "slow_period": 50,
                    "rsi_period": 9,
                    "rsi_level": 50.0,
                    "consolidation_threshold": 0.00035,
                    "stop_range_multiple": 1.0,
                    "risk_reward_ratio": 1.2,
                }),
            },
        );

        Self { strategies }
    }

    /// List all available strategies.
    pub fn list(&self) -> Vec<&StrategyInfo> {
        self.strategies.values().collect()
    }

    /// Get strategy info by type key.
    pub fn get(&self, strategy_type: &str) -> Option<&StrategyInfo> {
        self.strategies.get(strategy_type)
    }

    /// Check if a strategy type exists.
    pub fn exists(&self, strategy_type: &str) -> bool {
        self.strategies.contains_key(strategy_type)
    }

    /// Get all strategy type keys.
    pub fn names(&self) -> Vec<&String> {
        self.strategies.keys().collect()
    }

    /// Create a strategy instance for one symbol from configuration.
    ///
    /// The `symbol` field of the config is always overridden by the
    /// `symbol` argument so one config block can be shared across symbols.
    pub fn create(
        &self,
        strategy_type: &str,
        config: serde_json::Value,
        symbol: String,
    ) -> Result<Box<dyn Strategy>, StrategyError> {
        match strategy_type {
            "ema_ribbon_scalper" => {
                let config = inject_symbol(config, &symbol);
                let config: EmaRibbonConfig = serde_json::from_value(config)
                    .map_err(|e| StrategyError::InvalidConfig(e.to_string()))?;
                Ok(Box::new(EmaRibbonScalper::new(config)?))
            }
            _ => Err(StrategyError::NotFound(strategy_type.to_string())),
        }
    }

    /// Create a strategy with default configuration.
    pub fn create_default(
        &self,
        strategy_type: &str,
        symbol: String,
    ) -> Result<Box<dyn Strategy>, StrategyError> {
        let info = self
            .get(strategy_type)
            .ok_or_else(|| StrategyError::NotFound(strategy_type.to_string()))?;
        self.create(strategy_type, info.default_config.clone(), symbol)
    }
}

fn inject_symbol(mut config: serde_json::Value, symbol: &str) -> serde_json::Value {
    if let serde_json::Value::Object(map) = &mut config {
        map.insert(
            "symbol".to_string(),
            serde_json::Value::String(symbol.to_string()),
        );
    }
    config
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_list() {
        let registry = StrategyRegistry::new();
        assert_eq!(registry.list().len(), 1);
        assert!(registry.exists("ema_ribbon_scalper"));
    }

    #[test]
    fn test_create_default() {
        let registry = StrategyRegistry::new();

        let strategy = registry
            .create_default("ema_ribbon_scalper", "EURUSD".to_string())
            .unwrap();
        assert_eq!(strategy.name(), "EMA Ribbon Scalper");
        assert_eq!(strategy.symbol(), "EURUSD");
    }

    #[test]
    fn test_create_with_config() {
        let registry = StrategyRegistry::new();

        let config = serde_json::json!({
            "fast_periods": [3, 6, 9],
            "slow_period": 30,
            "rsi_period": 7,
            "rsi_level": 50.0,
            "consolidation_threshold": 0.0005,
        });

        let strategy = registry.create("ema_ribbon_scalper", config, "GBPUSD".to_string());
        assert!(strategy.is_ok());
        assert_eq!(strategy.unwrap().symbol(), "GBPUSD");
    }

    #[test]
    fn test_create_rejects_invalid_config() {
        let registry = StrategyRegistry::new();

        let config = serde_json::json!({
            "fast_periods": [9, 6, 3],
            "consolidation_threshold": 0.0005,
        });

        assert!(registry
            .create("ema_ribbon_scalper", config, "EURUSD".to_string())
            .is_err());
    }

    #[test]
    fn test_create_unknown_strategy() {
        let registry = StrategyRegistry::new();
        let result = registry.create_default("unknown", "EURUSD".to_string());
        assert!(matches!(result, Err(StrategyError::NotFound(_))));
    }
}
