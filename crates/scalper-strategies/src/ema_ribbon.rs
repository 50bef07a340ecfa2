//! EMA ribbon breakout scalping strategy.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use scalper_core::error::StrategyError;
use scalper_core::traits::{PositionOutcome, Strategy, StrategyConfig, StrategyState};
use scalper_core::types::{BarSeries, Direction, Signal};
use scalper_indicators::{
    consolidation::DEFAULT_WINDOW_BARS, Alignment, ConsolidationDetector, RibbonPipeline,
    RibbonSnapshot,
};

/// Configuration for the EMA ribbon scalper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmaRibbonConfig {
    /// Symbol this instance trades
    pub symbol: String,
    /// Fast EMA periods, shortest first
    #[serde(default = "default_fast_periods")]
    pub fast_periods: Vec<usize>,
    /// Slow (trend filter) EMA period
    #[serde(default = "default_slow_period")]
    pub slow_period: usize,
    /// RSI period
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    /// RSI trigger level
    #[serde(default = "default_rsi_level")]
    pub rsi_level: f64,
    /// Maximum window range, in price units, that counts as compression
    pub consolidation_threshold: f64,
    /// Trailing consolidation window length in bars
    #[serde(default = "default_consolidation_window")]
    pub consolidation_window: usize,
    /// Stop distance as a multiple of the compression window range
    #[serde(default = "default_stop_range_multiple")]
    pub stop_range_multiple: f64,
    /// Target distance as a multiple of the stop distance
    #[serde(default = "default_risk_reward_ratio")]
    pub risk_reward_ratio: f64,
}

fn default_fast_periods() -> Vec<usize> {
    vec![5, 8, 11, 14]
}

fn default_slow_period() -> usize {
    50
}

fn default_rsi_period() -> usize {
    9
}

fn default_rsi_level() -> f64 {
    50.0
}

fn default_consolidation_window() -> usize {
    DEFAULT_WINDOW_BARS
}

fn default_stop_range_multiple() -> f64 {
    1.0
}

fn default_risk_reward_ratio() -> f64 {
    1.2
}

impl StrategyConfig for EmaRibbonConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if self.symbol.is_empty() {
            return Err(StrategyError::InvalidConfig("symbol is required".into()));
        }
        if self.fast_periods.is_empty() {
            return Err(StrategyError::InvalidConfig(
                "fast_periods must not be empty".into(),
            ));
        }
        if self.fast_periods.windows(2).any(|w| w[0] >= w[1]) {
            return Err(StrategyError::InvalidConfig(
                "fast_periods must be strictly increasing".into(),
            ));
        }
        if self.fast_periods.iter().any(|&p| p == 0)
            || self.slow_period == 0
            || self.rsi_period == 0
        {
            return Err(StrategyError::InvalidConfig(
                "all periods must be greater than 0".into(),
            ));
        }
        if !(0.0..=100.0).contains(&self.rsi_level) {
            return Err(StrategyError::InvalidConfig(format!(
                "rsi_level must be within [0, 100], got {}",
                self.rsi_level
            )));
        }
        if self.consolidation_threshold <= 0.0 {
            return Err(StrategyError::InvalidConfig(
                "consolidation_threshold must be greater than 0".into(),
            ));
        }
        if self.consolidation_window == 0 {
            return Err(StrategyError::InvalidConfig(
                "consolidation_window must be greater than 0".into(),
            ));
        }
        if self.stop_range_multiple <= 0.0 {
            return Err(StrategyError::InvalidConfig(
                "stop_range_multiple must be greater than 0".into(),
            ));
        }
        if self.risk_reward_ratio <= 0.0 {
            return Err(StrategyError::InvalidConfig(
                "risk_reward_ratio must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

impl EmaRibbonConfig {
    /// Config with strategy-version defaults for one symbol; the
    /// consolidation threshold has no universal default and must be set per
    /// symbol.
    pub fn for_symbol(symbol: impl Into<String>, consolidation_threshold: f64) -> Self {
        Self {
            symbol: symbol.into(),
            fast_periods: default_fast_periods(),
            slow_period: default_slow_period(),
            rsi_period: default_rsi_period(),
            rsi_level: default_rsi_level(),
            consolidation_threshold,
            consolidation_window: default_consolidation_window(),
            stop_range_multiple: default_stop_range_multiple(),
            risk_reward_ratio: default_risk_reward_ratio(),
        }
    }
}

/// Entry state machine phase.
///
/// `ArmedLong`/`ArmedShort` are transient within a single bar evaluation:
/// arming and firing happen atomically at the same bar close, so between
/// bars the phase is always `Flat` or `InPosition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Flat,
    ArmedLong,
    ArmedShort,
    InPosition,
}

impl Phase {
    fn as_str(&self) -> &'static str {
        match self {
            Phase::Flat => "flat",
            Phase::ArmedLong => "armed_long",
            Phase::ArmedShort => "armed_short",
            Phase::InPosition => "in_position",
        }
    }
}

/// Breakout scalper on an EMA ribbon.
///
/// Entry requires three gates at once: ribbon alignment in the trade
/// direction, a compression flag on the bar before the trigger bar, and the
/// RSI crossing the configured level on the trigger bar itself. The stop
/// distance is the compression window range scaled by a configured
/// multiple; the target is the stop scaled by the reward:risk ratio.
pub struct EmaRibbonScalper {
    config: EmaRibbonConfig,
    pipeline: RibbonPipeline,
    detector: ConsolidationDetector,
    phase: Phase,
    bars_processed: usize,
    signals_generated: usize,
    last_snapshot: Option<RibbonSnapshot>,
}

impl EmaRibbonScalper {
    pub fn new(config: EmaRibbonConfig) -> Result<Self, StrategyError> {
        config.validate()?;

        let pipeline = RibbonPipeline::new(
            config.fast_periods.clone(),
            config.slow_period,
            config.rsi_period,
        )
        .map_err(|e| StrategyError::InvalidConfig(e.to_string()))?;

        let detector = ConsolidationDetector::with_window(
            config.consolidation_threshold,
            config.consolidation_window,
        )
        .map_err(|e| StrategyError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            config,
            pipeline,
            detector,
            phase: Phase::Flat,
            bars_processed: 0,
            signals_generated: 0,
            last_snapshot: None,
        })
    }

    pub fn config(&self) -> &EmaRibbonConfig {
        &self.config
    }

    /// Direction whose alignment and RSI-cross gates both hold at the
    /// snapshot, if any. The compression gate is checked separately.
    fn trigger(&self, snapshot: &RibbonSnapshot) -> Option<Direction> {
        let crossed_up =
            snapshot.prev_rsi <= self.config.rsi_level && snapshot.rsi > self.config.rsi_level;
        let crossed_down =
            snapshot.prev_rsi >= self.config.rsi_level && snapshot.rsi < self.config.rsi_level;

        match snapshot.alignment {
            Alignment::Long if crossed_up => Some(Direction::Long),
            Alignment::Short if crossed_down => Some(Direction::Short),
            _ => None,
        }
    }
}

impl Strategy for EmaRibbonScalper {
    fn name(&self) -> &str {
        "EMA Ribbon Scalper"
    }

    fn symbol(&self) -> &str {
        &self.config.symbol
    }

    fn on_bar(&mut self, series: &BarSeries) -> Option<Signal> {
        let bar = *series.last()?;
        self.detector.update(&bar);
        self.bars_processed += 1;

        if self.phase == Phase::InPosition {
            return None;
        }
        if series.len() < self.warmup_period() {
            return None;
        }

        let snapshot = match self.pipeline.evaluate(&series.closes()) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!(symbol = %self.config.symbol, error = %e, "indicator evaluation skipped");
                return None;
            }
        };

        let direction = self.trigger(&snapshot);
        let was_compressed = self.detector.was_compressed();
        self.last_snapshot = Some(snapshot);

        let direction = match direction {
            Some(d) if was_compressed => d,
            _ => return None,
        };

        self.phase = match direction {
            Direction::Long => Phase::ArmedLong,
            Direction::Short => Phase::ArmedShort,
        };

        let stop_distance = self.detector.range() * self.config.stop_range_multiple;
        if stop_distance <= 0.0 {
            // Degenerate window; disarm without firing.
            debug!(symbol = %self.config.symbol, "armed signal invalidated by zero window range");
            self.phase = Phase::Flat;
            return None;
        }

        let signal = Signal {
            symbol: self.config.symbol.clone(),
            direction,
            entry_ref: bar.close,
            stop_distance,
            target_distance: stop_distance * self.config.risk_reward_ratio,
            timestamp: bar.timestamp,
        };

        self.signals_generated += 1;
        self.phase = Phase::InPosition;

        info!(
            symbol = %self.config.symbol,
            direction = %direction,
            stop_distance,
            target_distance = signal.target_distance,
            "entry signal"
        );

        Some(signal)
    }

    fn on_position_closed(&mut self, outcome: PositionOutcome) {
        info!(symbol = %self.config.symbol, outcome = %outcome, "position closed");
        self.phase = Phase::Flat;
    }

    fn reset(&mut self) {
        self.detector.reset();
        self.phase = Phase::Flat;
        self.bars_processed = 0;
        self.signals_generated = 0;
        self.last_snapshot = None;
    }

    fn state(&self) -> StrategyState {
        let mut state = StrategyState {
            name: self.name().to_string(),
            is_warmed_up: self.bars_processed >= self.warmup_period(),
            bars_processed: self.bars_processed,
            signals_generated: self.signals_generated,
            ..Default::default()
        };

        if let Some(snapshot) = &self.last_snapshot {
            state.indicators.insert("rsi".to_string(), snapshot.rsi);
            state
                .indicators
                .insert("slow_ema".to_string(), snapshot.slow_ema);
            state
                .indicators
                .insert("ribbon_max".to_string(), snapshot.ribbon_max());
            state
                .indicators
                .insert("ribbon_min".to_string(), snapshot.ribbon_min());
        }

        state.custom = serde_json::json!({
            "phase": self.phase.as_str(),
            "window_range": self.detector.range(),
            "compressed": self.detector.is_compressed(),
        });

        state
    }

    fn warmup_period(&self) -> usize {
        // The compression gate needs a full window as of the prior bar.
        self.pipeline
            .warmup_period()
            .max(self.config.consolidation_window + 1)
    }

    fn description(&self) -> &str {
        "Breakout entries out of a consolidation on EMA ribbon alignment with RSI confirmation"
    }
}
