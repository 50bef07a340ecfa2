//! Indicator trait definition.

use crate::error::IndicatorError;

/// Trait for batch technical indicators.
///
/// Indicators are pure per call: given the same input slice they always
/// produce the same output, which is what makes backtest and live
/// evaluations reproducible.
pub trait Indicator: Send + Sync {
    /// The output type of the indicator.
    type Output;

    /// Calculate indicator values for the given data.
    ///
    /// Returns one value per evaluable point; the last element corresponds
    /// to the last input value. Empty when the input is shorter than the
    /// required warm-up.
    fn calculate(&self, data: &[f64]) -> Vec<Self::Output>;

    /// Get the minimum number of data points required.
    fn period(&self) -> usize;

    /// Get the name of the indicator.
    fn name(&self) -> &str;

    /// Validate that there is enough data.
    fn validate_data(&self, data: &[f64]) -> Result<(), IndicatorError> {
        if data.len() < self.period() {
            return Err(IndicatorError::InsufficientHistory {
                required: self.period(),
                available: data.len(),
            });
        }
        Ok(())
    }
}
