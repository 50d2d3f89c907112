//! Incremental weighted mean over a stream of observations.

use crate::error::{Error, Result};

/// Running weighted average.
///
/// Maintains the mean incrementally: each accepted update shifts the
/// mean by `(value - mean) * (weight / total_weight)` with the weight
/// already folded into the total. Values are never summed and divided
/// at read time, so a long stream cannot overflow an accumulator.
///
/// # Example
///
/// ```
/// use adiestrar::metric::RunningAverage;
///
/// let mut avg = RunningAverage::new();
/// avg.update_weighted(1.0, 3.0)?;
/// avg.update_weighted(5.0, 1.0)?;
/// assert_eq!(avg.mean()?, 2.0);
/// # Ok::<(), adiestrar::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunningAverage {
    mean: f64,
    total_weight: f64,
}

impl RunningAverage {
    /// Create an empty average.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation with weight 1.
    pub fn update(&mut self, value: f64) -> Result<()> {
        self.update_weighted(value, 1.0)
    }

    /// Record one observation with an explicit positive weight.
    ///
    /// Rejects `weight <= 0` (and non-finite weights) with
    /// [`Error::InvalidInput`], leaving the average unchanged.
    pub fn update_weighted(&mut self, value: f64, weight: f64) -> Result<()> {
        if !(weight > 0.0) || !weight.is_finite() {
            return Err(Error::invalid_input(format!(
                "metric weight must be a positive finite number, got {weight}"
            )));
        }
        self.total_weight += weight;
        self.mean += (value - self.mean) * (weight / self.total_weight);
        Ok(())
    }

    /// Current mean, or [`Error::EmptyState`] before any accepted update.
    pub fn mean(&self) -> Result<f64> {
        if self.is_empty() {
            return Err(Error::empty_state("running average"));
        }
        Ok(self.mean)
    }

    /// Total accumulated weight.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// True until the first accepted update.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_weight == 0.0
    }

    /// Return to the empty state.
    pub fn reset(&mut self) {
        self.mean = 0.0;
        self.total_weight = 0.0;
    }
}
