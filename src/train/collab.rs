//! Collaborator seams: the task (model + loss) and the data source.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::metric::MetricSnapshot;
use crate::train::Mode;

/// Metric values produced by one step, shared step weight.
///
/// The weight is typically the batch size; every metric of the step is
/// folded into its window with the same weight.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    values: BTreeMap<String, f64>,
    weight: f64,
}

impl StepOutput {
    /// Start an output with the given step weight.
    #[must_use]
    pub fn with_weight(weight: f64) -> Self {
        Self { values: BTreeMap::new(), weight }
    }

    /// Record one metric value, builder style.
    #[must_use]
    pub fn value(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Metric name/value pairs of this step.
    pub fn values(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Shared step weight.
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight
    }
}

/// The model-plus-loss collaborator driven by the loop.
///
/// One implementation owns the model, the loss computation, and the
/// gradient side channel to the optimizer; the loop only ever sees
/// metric values and opaque parameter blobs. Errors from any method
/// are fatal to the run: retrying or skipping a batch would desync
/// `global_step` from the schedule cadence.
pub trait TrainTask {
    /// Batch type produced by the data source and consumed per step.
    type Batch;

    /// Metric names this task reports. Fixed for the lifetime of the
    /// run; used to initialize every aggregation window.
    fn metric_names(&self) -> Vec<String>;

    /// Prepare one raw batch before the step (placement, casting).
    /// Default: pass-through.
    fn read_item(&mut self, batch: Self::Batch) -> Result<Self::Batch> {
        Ok(batch)
    }

    /// Forward the model and compute the loss for one batch.
    ///
    /// In [`Mode::Train`] the implementation must leave whatever it
    /// needs for [`backward`](TrainTask::backward) staged; in the
    /// evaluation modes no gradient bookkeeping may occur.
    fn run_step(&mut self, batch: &Self::Batch, mode: Mode) -> Result<StepOutput>;

    /// Propagate gradients from the last TRAIN step into the
    /// parameter store shared with the optimizer.
    fn backward(&mut self) -> Result<()>;

    /// Serialize the model parameters to an opaque blob.
    fn export_params(&self) -> Result<Vec<u8>>;

    /// Restore model parameters from a blob produced by
    /// [`export_params`](TrainTask::export_params).
    fn import_params(&mut self, blob: &[u8]) -> Result<()>;

    /// End-of-epoch hook. TRAIN epochs pass `None` (their windows are
    /// per-step); evaluation epochs pass the aggregated snapshot.
    /// Default: no-op.
    fn post_process(&mut self, mode: Mode, metrics: Option<&MetricSnapshot>) -> Result<()> {
        let _ = (mode, metrics);
        Ok(())
    }
}

/// A finite, restartable stream of batches.
///
/// `len()` is known up front (progress denominators); `restart(seed)`
/// begins a new pass — implementations that shuffle must derive the
/// order from `seed` so a fixed seed reproduces the same pass.
pub trait DataSource {
    /// Batch type yielded to the task.
    type Batch;

    /// Number of batches in one pass.
    fn len(&self) -> usize;

    /// True when a pass yields no batches.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Begin a new pass.
    fn restart(&mut self, seed: u64) -> Result<()>;

    /// Next batch of the current pass, `None` once exhausted.
    fn next_batch(&mut self) -> Result<Option<Self::Batch>>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::Error;
    use serde::{Deserialize, Serialize};

    /// Task double: constant TRAIN loss, scripted per-epoch VALIDATE
    /// losses, parameter blob carrying its own epoch counter so the
    /// script survives checkpoint round-trips.
    pub struct StubTask {
        pub train_value: f64,
        pub valid_values: Vec<f64>,
        pub validate_epochs_seen: u64,
        pub backwards: usize,
        pub fail_on_step: Option<u64>,
        steps_run: u64,
    }

    #[derive(Serialize, Deserialize)]
    struct StubParams {
        validate_epochs_seen: u64,
    }

    impl StubTask {
        pub fn scripted(valid_values: Vec<f64>) -> Self {
            Self {
                train_value: 1.0,
                valid_values,
                validate_epochs_seen: 0,
                backwards: 0,
                fail_on_step: None,
                steps_run: 0,
            }
        }
    }

    impl TrainTask for StubTask {
        type Batch = ();

        fn metric_names(&self) -> Vec<String> {
            vec!["total_loss".into()]
        }

        fn run_step(&mut self, _batch: &(), mode: Mode) -> Result<StepOutput> {
            self.steps_run += 1;
            if self.fail_on_step == Some(self.steps_run) {
                return Err(Error::collaborator(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "scripted step failure",
                )));
            }
            let value = match mode {
                Mode::Train => self.train_value,
                Mode::Validate | Mode::Test => {
                    let idx = (self.validate_epochs_seen as usize)
                        .min(self.valid_values.len().saturating_sub(1));
                    self.valid_values.get(idx).copied().unwrap_or(self.train_value)
                }
            };
            Ok(StepOutput::with_weight(1.0).value("total_loss", value))
        }

        fn backward(&mut self) -> Result<()> {
            self.backwards += 1;
            Ok(())
        }

        fn export_params(&self) -> Result<Vec<u8>> {
            let params = StubParams { validate_epochs_seen: self.validate_epochs_seen };
            serde_json::to_vec(&params)
                .map_err(|e| Error::serialization("exporting stub params", e))
        }

        fn import_params(&mut self, blob: &[u8]) -> Result<()> {
            let params: StubParams = serde_json::from_slice(blob)
                .map_err(|e| Error::serialization("importing stub params", e))?;
            self.validate_epochs_seen = params.validate_epochs_seen;
            Ok(())
        }

        fn post_process(&mut self, mode: Mode, _metrics: Option<&MetricSnapshot>) -> Result<()> {
            if mode == Mode::Validate {
                self.validate_epochs_seen += 1;
            }
            Ok(())
        }
    }

    /// Data-source double: a fixed number of unit batches per pass.
    #[derive(Debug, Default)]
    pub struct CountingSource {
        pub batches: usize,
        pub cursor: usize,
        pub restarts: u64,
        pub last_seed: Option<u64>,
    }

    impl CountingSource {
        pub fn with_batches(batches: usize) -> Self {
            Self { batches, ..Self::default() }
        }
    }

    impl DataSource for CountingSource {
        type Batch = ();

        fn len(&self) -> usize {
            self.batches
        }

        fn restart(&mut self, seed: u64) -> Result<()> {
            self.cursor = 0;
            self.restarts += 1;
            self.last_seed = Some(seed);
            Ok(())
        }

        fn next_batch(&mut self) -> Result<Option<()>> {
            if self.cursor < self.batches {
                self.cursor += 1;
                Ok(Some(()))
            } else {
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_output_builder() {
        let out = StepOutput::with_weight(16.0)
            .value("total_loss", 0.5)
            .value("recon_loss", 0.2);
        assert_eq!(out.weight(), 16.0);
        let values: Vec<_> = out.values().collect();
        assert_eq!(values, vec![("recon_loss", 0.2), ("total_loss", 0.5)]);
    }

    #[test]
    fn test_default_read_item_passes_through() {
        struct Echo;
        impl TrainTask for Echo {
            type Batch = u32;
            fn metric_names(&self) -> Vec<String> {
                vec!["total_loss".into()]
            }
            fn run_step(&mut self, batch: &u32, _mode: Mode) -> Result<StepOutput> {
                Ok(StepOutput::with_weight(1.0).value("total_loss", f64::from(*batch)))
            }
            fn backward(&mut self) -> Result<()> {
                Ok(())
            }
            fn export_params(&self) -> Result<Vec<u8>> {
                Ok(Vec::new())
            }
            fn import_params(&mut self, _blob: &[u8]) -> Result<()> {
                Ok(())
            }
        }

        let mut task = Echo;
        assert_eq!(task.read_item(7).unwrap(), 7);
        assert!(task.post_process(Mode::Train, None).is_ok());
    }
}
