//! Offline evaluation of stored model artifacts.
//!
//! Where [`Trainer`](crate::train::Trainer) evaluates the model it is
//! currently fitting, the [`Evaluator`] starts from a run directory:
//! it loads a named parameter blob into a fresh task and runs one TEST
//! pass, with no optimizer and no counters. This is the read side of
//! the checkpoint store.

use crate::checkpoint::{CheckpointStore, BEST_MODEL};
use crate::error::Result;
use crate::metric::{MetricSet, MetricSnapshot};
use crate::train::{ConsoleLogger, DataSource, Mode, RunLogger, TrainTask};

fn summarize(snapshot: &MetricSnapshot) -> String {
    snapshot
        .iter()
        .map(|(name, value)| format!("{name}={value:.6}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Evaluates stored artifacts of one run directory.
pub struct Evaluator<T: TrainTask> {
    task: T,
    store: CheckpointStore,
    logger: Box<dyn RunLogger>,
    seed: u64,
}

impl<T: TrainTask> Evaluator<T> {
    /// Bind a task shell to a run directory. The task's parameters are
    /// overwritten by every evaluation call.
    pub fn new(task: T, store: CheckpointStore) -> Self {
        Self { task, store, logger: Box::new(ConsoleLogger), seed: 0 }
    }

    /// Replace the default console logger.
    #[must_use]
    pub fn with_logger(mut self, logger: Box<dyn RunLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Seed handed to `restart`; the aggregate mean does not depend on
    /// batch order, so this only matters for reproducing log lines.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Task collaborator (carries the most recently loaded parameters).
    pub fn task(&self) -> &T {
        &self.task
    }

    /// Load the artifact `name` and run one TEST pass over `source`.
    pub fn evaluate_artifact<D>(&mut self, name: &str, source: &mut D) -> Result<MetricSnapshot>
    where
        D: DataSource<Batch = T::Batch>,
    {
        let blob = self.store.load_model_blob(name)?;
        self.task.import_params(&blob)?;
        let snapshot = self.run_pass(source)?;
        let line = format!("{name}: {}", summarize(&snapshot));
        self.logger.log_text(&line, 0);
        Ok(snapshot)
    }

    /// Evaluate the best-model artifact.
    pub fn evaluate_best<D>(&mut self, source: &mut D) -> Result<MetricSnapshot>
    where
        D: DataSource<Batch = T::Batch>,
    {
        self.evaluate_artifact(BEST_MODEL, source)
    }

    /// Evaluate every model artifact in the run directory, in name
    /// order. Returns `(artifact, snapshot)` pairs.
    pub fn evaluate_all<D>(&mut self, source: &mut D) -> Result<Vec<(String, MetricSnapshot)>>
    where
        D: DataSource<Batch = T::Batch>,
    {
        let mut results = Vec::new();
        for name in self.store.list_models()? {
            let snapshot = self.evaluate_artifact(&name, source)?;
            results.push((name, snapshot));
        }
        Ok(results)
    }

    fn run_pass<D>(&mut self, source: &mut D) -> Result<MetricSnapshot>
    where
        D: DataSource<Batch = T::Batch>,
    {
        source.restart(self.seed)?;
        let mut window = MetricSet::new(self.task.metric_names());
        while let Some(batch) = source.next_batch()? {
            let batch = self.task.read_item(batch)?;
            let output = self.task.run_step(&batch, Mode::Test)?;
            for (name, value) in output.values() {
                window.update(name, value, output.weight())?;
            }
        }
        let snapshot = window.snapshot()?;
        self.task.post_process(Mode::Test, Some(&snapshot))?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::train::collab::testing::{CountingSource, StubTask};
    use approx::assert_abs_diff_eq;

    fn store() -> (tempfile::TempDir, CheckpointStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        (dir, store)
    }

    fn stub_blob(validate_epochs_seen: u64) -> Vec<u8> {
        let mut donor = StubTask::scripted(vec![]);
        donor.validate_epochs_seen = validate_epochs_seen;
        donor.export_params().unwrap()
    }

    #[test]
    fn test_evaluate_best_loads_the_stored_params() {
        let (_dir, store) = store();
        store.save_model_blob(BEST_MODEL, &stub_blob(1)).unwrap();

        // Index 1 of the script is only reachable through the blob.
        let task = StubTask::scripted(vec![9.0, 4.0]);
        let mut evaluator = Evaluator::new(task, store);
        let snapshot = evaluator.evaluate_best(&mut CountingSource::with_batches(3)).unwrap();

        assert_abs_diff_eq!(snapshot["total_loss"], 4.0, epsilon = 1e-12);
        assert_eq!(evaluator.task().validate_epochs_seen, 1);
    }

    #[test]
    fn test_missing_artifact_is_not_found() {
        let (_dir, store) = store();
        let mut evaluator = Evaluator::new(StubTask::scripted(vec![1.0]), store);
        let err = evaluator
            .evaluate_artifact("model_epoch_00000003", &mut CountingSource::with_batches(1))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_evaluate_all_sweeps_in_name_order() {
        let (_dir, store) = store();
        store.save_model_blob("model_epoch_00000002", &stub_blob(0)).unwrap();
        store.save_model_blob(BEST_MODEL, &stub_blob(0)).unwrap();

        let mut evaluator = Evaluator::new(StubTask::scripted(vec![2.0]), store);
        let results = evaluator.evaluate_all(&mut CountingSource::with_batches(2)).unwrap();

        let names: Vec<&str> = results.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["model_best", "model_epoch_00000002"]);
        for (_, snapshot) in &results {
            assert_abs_diff_eq!(snapshot["total_loss"], 2.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_empty_source_is_empty_state() {
        let (_dir, store) = store();
        store.save_model_blob(BEST_MODEL, &stub_blob(0)).unwrap();
        let mut evaluator = Evaluator::new(StubTask::scripted(vec![1.0]), store);
        let err = evaluator.evaluate_best(&mut CountingSource::with_batches(0)).unwrap_err();
        assert!(matches!(err, Error::EmptyState { .. }));
    }
}
