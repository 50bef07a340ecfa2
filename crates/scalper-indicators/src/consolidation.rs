//! Price-compression detection over a trailing bar window.

use std::collections::VecDeque;

use scalper_core::error::IndicatorError;
use scalper_core::types::Bar;

/// Trailing window length in bars. Fixed by strategy version; the
/// compression threshold itself is per-symbol configuration.
pub const DEFAULT_WINDOW_BARS: usize = 12;

/// Per-symbol tracker for the high-low range over a trailing window.
///
/// Entries are gated on the compression flag of the bar *before* the
/// trigger bar, so the detector keeps both the current flag and the flag
/// as of the previous update.
#[derive(Debug, Clone)]
pub struct ConsolidationDetector {
    window: usize,
    threshold: f64,
    highs: VecDeque<f64>,
    lows: VecDeque<f64>,
    compressed: bool,
    prev_compressed: bool,
}

impl ConsolidationDetector {
    pub fn new(threshold: f64) -> Result<Self, IndicatorError> {
        Self::with_window(threshold, DEFAULT_WINDOW_BARS)
    }

    pub fn with_window(threshold: f64, window: usize) -> Result<Self, IndicatorError> {
        if threshold <= 0.0 {
            return Err(IndicatorError::InvalidParameter(
                "Consolidation threshold must be greater than 0".into(),
            ));
        }
        if window == 0 {
            return Err(IndicatorError::InvalidParameter(
                "Consolidation window must be greater than 0".into(),
            ));
        }
        Ok(Self {
            window,
            threshold,
            highs: VecDeque::with_capacity(window),
            lows: VecDeque::with_capacity(window),
            compressed: false,
            prev_compressed: false,
        })
    }

    /// Fold one closed bar into the window and refresh both flags.
    pub fn update(&mut self, bar: &Bar) {
        if self.highs.len() == self.window {
            self.highs.pop_front();
            self.lows.pop_front();
        }
        self.highs.push_back(bar.high);
        self.lows.push_back(bar.low);

        self.prev_compressed = self.compressed;
        self.compressed = self.is_full() && self.range() <= self.threshold;
    }

    /// High-low range over the current window. Zero until any bar arrives.
    pub fn range(&self) -> f64 {
        let high = self.highs.iter().copied().fold(f64::MIN, f64::max);
        let low = self.lows.iter().copied().fold(f64::MAX, f64::min);
        if self.highs.is_empty() {
            0.0
        } else {
            high - low
        }
    }

    /// Compression flag at the last updated bar.
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Compression flag as of the bar before the last update. This is the
    /// gate for entries: the trigger bar itself never judges its own
    /// eligibility.
    pub fn was_compressed(&self) -> bool {
        self.prev_compressed
    }

    /// True once the window holds its full complement of bars.
    pub fn is_full(&self) -> bool {
        self.highs.len() == self.window
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Drop all accumulated bars and clear both flags.
    pub fn reset(&mut self) {
        self.highs.clear();
        self.lows.clear();
        self.compressed = false;
        self.prev_compressed = false;
    }
}
