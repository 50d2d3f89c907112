//! The training loop and its seams.
//!
//! Everything problem-specific lives behind three traits the caller
//! implements: [`TrainTask`] (model + loss), [`DataSource`] (batches),
//! and the optimizer seam in [`crate::optim`]. The [`Trainer`] drives
//! them through TRAIN/VALIDATE/TEST epochs, aggregates metrics, logs
//! through a [`RunLogger`], and persists resumable checkpoints.

pub(crate) mod collab;
mod logger;
mod state;
mod trainer;

pub use collab::{DataSource, StepOutput, TrainTask};
pub use logger::{ConsoleLogger, JsonlLogger, MemoryLogger, RunLogger, ScalarEvent};
pub use state::{LoopPhase, Mode, TrainingState};
pub use trainer::{FitResult, Trainer};
