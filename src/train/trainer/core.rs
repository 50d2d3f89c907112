//! Trainer construction, accessors, and checkpoint wiring.

use crate::checkpoint::{BestModelRecord, CheckpointRecord, CheckpointStore};
use crate::config::TrainConfig;
use crate::error::{Error, Result};
use crate::optim::{ControllerState, ScheduleController};
use crate::train::{ConsoleLogger, LoopPhase, RunLogger, TrainTask, TrainingState};

/// Orchestrates a training run over caller-supplied collaborators.
///
/// The trainer owns the task (model + loss), the schedule controller
/// (optimizer + rate schedule), the checkpoint store, and the logger.
/// Data sources are passed per call so the same trainer can fit and
/// evaluate over different splits.
///
/// # Example
///
/// ```no_run
/// use adiestrar::checkpoint::CheckpointStore;
/// use adiestrar::demo::{line_fit_setup, SyntheticSource};
/// use adiestrar::optim::ScheduleController;
/// use adiestrar::train::Trainer;
/// use adiestrar::TrainConfig;
///
/// let (task, optimizer) = line_fit_setup(0.05);
/// let controller = ScheduleController::new(Box::new(optimizer));
/// let store = CheckpointStore::new("runs/demo");
/// let config = TrainConfig::default().with_total_epochs(5).with_seed(42);
///
/// let mut trainer = Trainer::new(task, controller, store, config)?;
/// let mut train = SyntheticSource::new(256, 16, 2.5, -1.0, 0.0, 42);
/// let mut valid = SyntheticSource::new(64, 16, 2.5, -1.0, 0.0, 43);
/// let result = trainer.fit(&mut train, &mut valid)?;
/// println!("best epoch: {:?}", result.best_epoch);
/// # Ok::<(), adiestrar::Error>(())
/// ```
pub struct Trainer<T: TrainTask> {
    /// Task collaborator (model + loss).
    pub(crate) task: T,

    /// Optimizer plus optional rate schedule.
    pub(crate) controller: ScheduleController,

    /// Durable artifact store for this run.
    pub(crate) store: CheckpointStore,

    /// Event sink.
    pub(crate) logger: Box<dyn RunLogger>,

    /// Run configuration.
    pub(crate) config: TrainConfig,

    /// Loop counters.
    pub(crate) state: TrainingState,

    /// State-machine position.
    pub(crate) phase: LoopPhase,

    /// Best validation result so far.
    pub(crate) best: Option<BestModelRecord>,
}

impl<T: TrainTask> std::fmt::Debug for Trainer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trainer")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("phase", &self.phase)
            .field("best", &self.best)
            .finish_non_exhaustive()
    }
}

impl<T: TrainTask> Trainer<T> {
    /// Create a trainer.
    ///
    /// Validates the configuration and checks that the configured
    /// primary metric is one the task actually reports. A missing
    /// seed is resolved from entropy here, so the state always
    /// carries a concrete, persistable seed.
    pub fn new(
        task: T,
        controller: ScheduleController,
        store: CheckpointStore,
        config: TrainConfig,
    ) -> Result<Self> {
        config.validate()?;
        if !task.metric_names().iter().any(|n| n == &config.primary_metric) {
            return Err(Error::unknown_metric(&config.primary_metric));
        }
        let seed = config.seed.unwrap_or_else(rand::random);
        let state = TrainingState::new(seed, config.total_epochs);
        Ok(Self {
            task,
            controller,
            store,
            logger: Box::new(ConsoleLogger),
            config,
            state,
            phase: LoopPhase::Idle,
            best: None,
        })
    }

    /// Replace the default console logger.
    #[must_use]
    pub fn with_logger(mut self, logger: Box<dyn RunLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Task collaborator.
    pub fn task(&self) -> &T {
        &self.task
    }

    /// Mutable task collaborator.
    pub fn task_mut(&mut self) -> &mut T {
        &mut self.task
    }

    /// Loop counters.
    #[must_use]
    pub fn state(&self) -> &TrainingState {
        &self.state
    }

    /// State-machine position.
    #[must_use]
    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    /// Run configuration.
    #[must_use]
    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Artifact store of this run.
    #[must_use]
    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// Best validation record so far, if any epoch won yet.
    #[must_use]
    pub fn best(&self) -> Option<&BestModelRecord> {
        self.best.as_ref()
    }

    /// Current learning-rate-like scalar.
    #[must_use]
    pub fn current_rate(&self) -> f64 {
        self.controller.current_rate()
    }

    /// Resume from the rolling latest checkpoint.
    ///
    /// Fails with [`Error::NotFound`] when the run directory has no
    /// checkpoint and [`Error::CorruptCheckpoint`] when it has an
    /// unreadable one.
    pub fn restore(&mut self) -> Result<()> {
        let record = self.store.load_latest()?;
        self.apply_record(&record)
    }

    /// Resume if a checkpoint exists: `Ok(true)` after restoring,
    /// `Ok(false)` when there is nothing to resume from. A corrupt
    /// checkpoint still fails; deciding to discard it belongs to the
    /// caller (see [`Error::allows_fresh_start`]).
    pub fn try_restore(&mut self) -> Result<bool> {
        match self.restore() {
            Ok(()) => Ok(true),
            Err(Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Apply a loaded record: counters, collaborator blobs, best
    /// record. The record's `epoch` is the last completed one, so the
    /// loop continues at `epoch + 1`.
    pub(crate) fn apply_record(&mut self, record: &CheckpointRecord) -> Result<()> {
        self.task.import_params(&record.model_state)?;
        self.controller.import_state(&ControllerState {
            optimizer: record.optimizer_state.clone(),
            schedule: record.scheduler_state.clone(),
        })?;
        self.state.seed = record.seed;
        self.state.current_epoch = record.epoch + 1;
        self.state.global_step = record.step;
        self.state.local_step = 0;
        self.best = record.best_record();
        self.phase = LoopPhase::Idle;
        Ok(())
    }

    /// Capture the full resumable state as of the just-completed epoch.
    pub(crate) fn build_record(&self) -> Result<CheckpointRecord> {
        let controller_state = self.controller.export_state()?;
        Ok(CheckpointRecord {
            epoch: self.state.current_epoch,
            step: self.state.global_step,
            seed: self.state.seed,
            model_state: self.task.export_params()?,
            optimizer_state: controller_state.optimizer,
            scheduler_state: controller_state.schedule,
            best_metric: self.best.as_ref().map(|b| b.metrics.clone()),
            best_model_epoch: self.best.as_ref().map_or(0, |b| b.epoch),
        })
    }
}
