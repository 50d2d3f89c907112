//! Training-loop orchestration with resumable checkpoints.
//!
//! Adiestrar drives epoch-based training for any [`train::TrainTask`]:
//! it owns the step loop, running metric windows, learning-rate
//! schedules, and crash-safe checkpoints with best-model tracking.
//!
//! - [`train`]: the [`train::Trainer`] loop, collaborator traits, run loggers
//! - [`metric`]: weighted running averages grouped into windows
//! - [`optim`]: optimizer seam, rate schedules, and the gated controller
//! - [`checkpoint`]: atomic run-directory persistence
//! - [`registry`]: schedule construction from declarative specs
//! - [`eval`]: offline evaluation of stored model artifacts
//! - [`demo`]: a self-contained line-fit task for examples and tests
//!
//! # Quick start
//!
//! ```
//! use adiestrar::checkpoint::CheckpointStore;
//! use adiestrar::demo::{line_fit_setup, SyntheticSource};
//! use adiestrar::optim::ScheduleController;
//! use adiestrar::train::Trainer;
//! use adiestrar::TrainConfig;
//!
//! # fn main() -> adiestrar::Result<()> {
//! let dir = tempfile::tempdir().unwrap();
//! let (task, optimizer) = line_fit_setup(0.05);
//! let controller = ScheduleController::new(Box::new(optimizer));
//! let store = CheckpointStore::new(dir.path());
//! let config = TrainConfig::default().with_total_epochs(2).with_seed(42);
//!
//! let mut trainer = Trainer::new(task, controller, store, config)?;
//! let mut train = SyntheticSource::new(256, 16, 2.5, -1.0, 0.05, 7);
//! let mut valid = SyntheticSource::new(64, 16, 2.5, -1.0, 0.05, 8);
//! let result = trainer.fit(&mut train, &mut valid)?;
//! assert_eq!(result.final_epoch, 2);
//! # Ok(())
//! # }
//! ```

pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod demo;
pub mod error;
pub mod eval;
pub mod metric;
pub mod optim;
pub mod registry;
pub mod train;

pub use config::{Direction, ScheduleSpec, TrainConfig};
pub use error::{Error, Result};
