//! Optimizer collaborator seam.

use crate::error::Result;

/// Trait for the caller-supplied parameter-update engine.
///
/// The orchestrator never touches parameters or gradients. The
/// optimizer implementation holds (or shares) them with the task
/// collaborator; [`step`](Optimizer::step) consumes whatever gradients
/// the task accumulated since the last
/// [`zero_grad`](Optimizer::zero_grad).
///
/// State export/import round-trips an opaque blob so a resumed run
/// continues with identical optimizer internals (moments, step counts,
/// current rate).
pub trait Optimizer {
    /// Apply accumulated gradients to the managed parameters.
    fn step(&mut self) -> Result<()>;

    /// Clear accumulated gradients before the next forward pass.
    fn zero_grad(&mut self);

    /// Get the learning-rate-like scalar.
    fn rate(&self) -> f64;

    /// Set the learning-rate-like scalar.
    fn set_rate(&mut self, rate: f64);

    /// Serialize internal state to an opaque blob.
    fn export_state(&self) -> Result<Vec<u8>>;

    /// Restore internal state from a blob produced by `export_state`.
    fn import_state(&mut self, blob: &[u8]) -> Result<()>;
}
