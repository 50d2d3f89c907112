//! Fit result type.

/// Summary of a completed [`fit`](super::core::Trainer::fit) call.
#[derive(Debug, Clone)]
pub struct FitResult {
    /// Epoch index the loop stopped at (equals the configured total
    /// unless the run was resumed past it).
    pub final_epoch: u64,
    /// Global TRAIN step count at the end of the run.
    pub global_step: u64,
    /// Epoch the best validation result was recorded at, if any.
    pub best_epoch: Option<u64>,
    /// Primary-metric value of the best validation result, if any.
    pub best_metric: Option<f64>,
    /// Wall-clock duration of this call in seconds.
    pub elapsed_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_result_clone() {
        let result = FitResult {
            final_epoch: 5,
            global_step: 80,
            best_epoch: Some(3),
            best_metric: Some(0.25),
            elapsed_secs: 1.5,
        };
        let cloned = result.clone();
        assert_eq!(cloned.final_epoch, 5);
        assert_eq!(cloned.best_epoch, Some(3));
        assert_eq!(cloned.best_metric, Some(0.25));
    }
}
