//! EMA ribbon evaluation pipeline.

use scalper_core::error::IndicatorError;
use scalper_core::traits::Indicator;
use serde::{Deserialize, Serialize};

use crate::{Ema, Rsi};

/// Extra bars beyond the strict indicator minimum, so the recursive EMA has
/// converged past its seed before the first evaluation.
const WARMUP_MARGIN: usize = 5;

/// Ribbon alignment flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    /// Fast EMA values strictly increasing from shortest to longest period,
    /// all above the slow EMA.
    Long,
    /// Mirror condition: strictly decreasing, all below the slow EMA.
    Short,
    /// Neither; equal values count as not aligned.
    None,
}

/// Indicator values for one symbol, evaluated at the last closed bar.
#[derive(Debug, Clone, PartialEq)]
pub struct RibbonSnapshot {
    /// Fast EMA values, ordered shortest period first
    pub fast_emas: Vec<f64>,
    /// Slow EMA value
    pub slow_ema: f64,
    /// RSI at the last bar
    pub rsi: f64,
    /// RSI at the previous bar, for cross detection
    pub prev_rsi: f64,
    /// Ribbon alignment at the last bar
    pub alignment: Alignment,
}

impl RibbonSnapshot {
    /// Highest fast EMA value.
    pub fn ribbon_max(&self) -> f64 {
        self.fast_emas.iter().copied().fold(f64::MIN, f64::max)
    }

    /// Lowest fast EMA value.
    pub fn ribbon_min(&self) -> f64 {
        self.fast_emas.iter().copied().fold(f64::MAX, f64::min)
    }
}

/// Pure transformation from an ordered sequence of closed bars to ribbon,
/// slow EMA and RSI values at the last bar.
///
/// Stateless per call: the snapshot for a prefix of bars never changes when
/// later bars are appended.
#[derive(Debug, Clone)]
pub struct RibbonPipeline {
    fast_periods: Vec<usize>,
    fast: Vec<Ema>,
    slow: Ema,
    rsi: Rsi,
    warmup: usize,
}

impl RibbonPipeline {
    /// Create a pipeline for the given fast periods (ordered, shortest
    /// first), slow EMA period and RSI period.
    pub fn new(
        fast_periods: Vec<usize>,
        slow_period: usize,
        rsi_period: usize,
    ) -> Result<Self, IndicatorError> {
        if fast_periods.is_empty() {
            return Err(IndicatorError::InvalidParameter(
                "At least one fast EMA period required".into(),
            ));
        }
        if fast_periods.windows(2).any(|w| w[0] >= w[1]) {
            return Err(IndicatorError::InvalidParameter(
                "Fast EMA periods must be strictly increasing".into(),
            ));
        }
        if fast_periods.iter().any(|&p| p == 0) || slow_period == 0 || rsi_period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "All periods must be greater than 0".into(),
            ));
        }

        let longest_fast = *fast_periods.last().unwrap_or(&1);
        // RSI needs period+1 points plus one more for the previous value.
        let warmup = slow_period.max(rsi_period + 2).max(longest_fast) + WARMUP_MARGIN;

        let fast = fast_periods.iter().map(|&p| Ema::new(p)).collect();

        Ok(Self {
            fast_periods,
            fast,
            slow: Ema::new(slow_period),
            rsi: Rsi::new(rsi_period),
            warmup,
        })
    }

    /// Minimum number of closed bars required before evaluation.
    pub fn warmup_period(&self) -> usize {
        self.warmup
    }

    /// The configured fast periods, shortest first.
    pub fn fast_periods(&self) -> &[usize] {
        &self.fast_periods
    }

    /// Evaluate the pipeline at the last element of `closes`.
    ///
    /// Fails with `InsufficientHistory` when fewer closes than the warm-up
    /// are supplied; the caller must accumulate, not evaluate.
    pub fn evaluate(&self, closes: &[f64]) -> Result<RibbonSnapshot, IndicatorError> {
        if closes.len() < self.warmup {
            return Err(IndicatorError::InsufficientHistory {
                required: self.warmup,
                available: closes.len(),
            });
        }

        let mut fast_emas = Vec::with_capacity(self.fast.len());
        for ema in &self.fast {
            let series = ema.calculate(closes);
            let last = series.last().copied().ok_or_else(|| {
                IndicatorError::InsufficientHistory {
                    required: self.warmup,
                    available: closes.len(),
                }
            })?;
            fast_emas.push(last);
        }

        let slow_series = self.slow.calculate(closes);
        let slow_ema =
            slow_series
                .last()
                .copied()
                .ok_or_else(|| IndicatorError::InsufficientHistory {
                    required: self.warmup,
                    available: closes.len(),
                })?;

        let rsi_series = self.rsi.calculate(closes);
        if rsi_series.len() < 2 {
            return Err(IndicatorError::InsufficientHistory {
                required: self.warmup,
                available: closes.len(),
            });
        }
        let rsi = rsi_series[rsi_series.len() - 1];
        let prev_rsi = rsi_series[rsi_series.len() - 2];

        let alignment = Self::classify_alignment(&fast_emas, slow_ema);

        Ok(RibbonSnapshot {
            fast_emas,
            slow_ema,
            rsi,
            prev_rsi,
            alignment,
        })
    }

    /// Aligned-long: values strictly increasing from shortest to longest
    /// period, all above the slow EMA. Aligned-short is the mirror. Ties
    /// break alignment.
    fn classify_alignment(fast_emas: &[f64], slow_ema: f64) -> Alignment {
        let increasing = fast_emas.windows(2).all(|w| w[0] < w[1]);
        let decreasing = fast_emas.windows(2).all(|w| w[0] > w[1]);
        let all_above = fast_emas.iter().all(|&v| v > slow_ema);
        let all_below = fast_emas.iter().all(|&v| v < slow_ema);

        if increasing && all_above {
            Alignment::Long
        } else if decreasing && all_below {
            Alignment::Short
        } else {
            Alignment::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pipeline() -> RibbonPipeline {
        RibbonPipeline::new(vec![5, 8, 11, 14], 50, 9).unwrap()
    }

    fn synthetic_closes(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 1.1 + (i as f64 * 0.37).sin() * 0.004 + i as f64 * 1e-5)
            .collect()
    }

    #[test]
    fn test_invalid_params() {
        assert!(RibbonPipeline::new(vec![], 50, 9).is_err());
        assert!(RibbonPipeline::new(vec![8, 5], 50, 9).is_err());
        assert!(RibbonPipeline::new(vec![5, 5], 50, 9).is_err());
        assert!(RibbonPipeline::new(vec![5, 8], 0, 9).is_err());
    }

    #[test]
    fn test_insufficient_history() {
        let p = pipeline();
        let closes = synthetic_closes(p.warmup_period() - 1);
        match p.evaluate(&closes) {
            Err(IndicatorError::InsufficientHistory { required, available }) => {
                assert_eq!(required, p.warmup_period());
                assert_eq!(available, closes.len());
            }
            other => panic!("expected InsufficientHistory, got {:?}", other),
        }
    }

    #[test]
    fn test_snapshot_shape() {
        let p = pipeline();
        let closes = synthetic_closes(120);
        let snap = p.evaluate(&closes).unwrap();

        assert_eq!(snap.fast_emas.len(), 4);
        assert!((0.0..=100.0).contains(&snap.rsi));
        assert!((0.0..=100.0).contains(&snap.prev_rsi));
        assert!(snap.ribbon_max() >= snap.ribbon_min());
    }

    #[test]
    fn test_alignment_classification() {
        assert_eq!(
            RibbonPipeline::classify_alignment(&[1.0, 2.0, 3.0], 0.5),
            Alignment::Long
        );
        assert_eq!(
            RibbonPipeline::classify_alignment(&[3.0, 2.0, 1.0], 4.0),
            Alignment::Short
        );
        // Tie breaks alignment.
        assert_eq!(
            RibbonPipeline::classify_alignment(&[1.0, 1.0, 2.0], 0.5),
            Alignment::None
        );
        // Ordered but straddling the slow EMA is not aligned.
        assert_eq!(
            RibbonPipeline::classify_alignment(&[1.0, 2.0, 3.0], 1.5),
            Alignment::None
        );
    }

    proptest! {
        /// Appending bars never changes the evaluation at an earlier prefix.
        #[test]
        fn prefix_evaluation_is_stable(
            base in proptest::collection::vec(0.9f64..1.3, 80..160),
            extension in proptest::collection::vec(0.9f64..1.3, 1..40),
        ) {
            let p = pipeline();
            let before = p.evaluate(&base);

            let mut extended = base.clone();
            extended.extend(extension);
            let prefix_after = p.evaluate(&extended[..base.len()]);

            match (before, prefix_after) {
                (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
                (Err(_), Err(_)) => {}
                _ => prop_assert!(false, "evaluability changed under extension"),
            }
        }
    }
}
