//! A complete worked example of the collaborator seams: least-squares
//! line fitting (`y = w·x + b`) over synthetic data.
//!
//! Small enough to read in one sitting, real enough to exercise every
//! seam: the task and the optimizer share parameters through an
//! `Rc<RefCell<_>>` side channel exactly the way a real model and its
//! optimizer would share tensors, and the data source shuffles
//! deterministically from the per-epoch seed.

use std::cell::RefCell;
use std::rc::Rc;

use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::optim::Optimizer;
use crate::train::{DataSource, Mode, StepOutput, TrainTask};

/// One mini-batch of scalar regression samples.
#[derive(Debug, Clone)]
pub struct SampleBatch {
    /// Input values.
    pub inputs: Array1<f64>,
    /// Target values, same length as `inputs`.
    pub targets: Array1<f64>,
}

/// The fitted parameters `[w, b]` and their gradient accumulator.
///
/// Shared between [`LineFitTask`] (forward/backward) and
/// [`GradientDescent`] (update); the trainer never sees inside.
#[derive(Debug)]
pub struct LineParams {
    /// Parameter values `[w, b]`.
    pub values: Array1<f64>,
    /// Accumulated gradients, cleared by the optimizer.
    pub grads: Array1<f64>,
}

impl LineParams {
    /// Both parameters and gradients at zero.
    #[must_use]
    pub fn zeroed() -> Self {
        Self { values: Array1::zeros(2), grads: Array1::zeros(2) }
    }
}

/// Handle shared by the task and the optimizer.
pub type SharedParams = Rc<RefCell<LineParams>>;

#[derive(Serialize, Deserialize)]
struct LineBlob {
    values: Vec<f64>,
}

/// Mean-squared-error line fit reporting a single `total_loss` metric.
pub struct LineFitTask {
    params: SharedParams,
    staged: Option<SampleBatch>,
}

impl LineFitTask {
    /// Bind the task to a shared parameter store.
    #[must_use]
    pub fn new(params: SharedParams) -> Self {
        Self { params, staged: None }
    }

    /// Current `(w, b)`.
    #[must_use]
    pub fn coefficients(&self) -> (f64, f64) {
        let p = self.params.borrow();
        (p.values[0], p.values[1])
    }
}

impl TrainTask for LineFitTask {
    type Batch = SampleBatch;

    fn metric_names(&self) -> Vec<String> {
        vec!["total_loss".to_string()]
    }

    fn run_step(&mut self, batch: &SampleBatch, mode: Mode) -> Result<StepOutput> {
        let (w, b) = self.coefficients();
        let residuals = batch.inputs.mapv(|x| w * x + b) - &batch.targets;
        let loss = residuals.mapv(|r| r * r).mean().unwrap_or(0.0);

        if mode == Mode::Train {
            // Backward recomputes from the inputs; parameters cannot
            // move between the forward and backward of one step.
            self.staged = Some(batch.clone());
        }
        Ok(StepOutput::with_weight(batch.inputs.len() as f64).value("total_loss", loss))
    }

    fn backward(&mut self) -> Result<()> {
        let batch = self
            .staged
            .take()
            .ok_or_else(|| Error::invalid_input("backward without a staged train step"))?;
        let n = batch.inputs.len().max(1) as f64;

        let mut p = self.params.borrow_mut();
        let (w, b) = (p.values[0], p.values[1]);
        let mut grad_w = 0.0;
        let mut grad_b = 0.0;
        for (x, y) in batch.inputs.iter().zip(batch.targets.iter()) {
            let r = w * x + b - y;
            grad_w += 2.0 * r * x;
            grad_b += 2.0 * r;
        }
        p.grads[0] += grad_w / n;
        p.grads[1] += grad_b / n;
        Ok(())
    }

    fn export_params(&self) -> Result<Vec<u8>> {
        let blob = LineBlob { values: self.params.borrow().values.to_vec() };
        serde_json::to_vec(&blob).map_err(|e| Error::serialization("exporting line parameters", e))
    }

    fn import_params(&mut self, blob: &[u8]) -> Result<()> {
        let blob: LineBlob = serde_json::from_slice(blob)
            .map_err(|e| Error::serialization("importing line parameters", e))?;
        if blob.values.len() != 2 {
            return Err(Error::invalid_input(format!(
                "line parameter blob must hold 2 values, got {}",
                blob.values.len()
            )));
        }
        self.params.borrow_mut().values = Array1::from_vec(blob.values);
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct GradientDescentState {
    rate: f64,
}

/// Plain gradient descent over the shared line parameters.
pub struct GradientDescent {
    params: SharedParams,
    rate: f64,
}

impl GradientDescent {
    /// Bind the optimizer to the same store the task writes into.
    #[must_use]
    pub fn new(params: SharedParams, rate: f64) -> Self {
        Self { params, rate }
    }
}

impl Optimizer for GradientDescent {
    fn step(&mut self) -> Result<()> {
        let mut p = self.params.borrow_mut();
        let update = p.grads.mapv(|g| g * self.rate);
        p.values -= &update;
        Ok(())
    }

    fn zero_grad(&mut self) {
        self.params.borrow_mut().grads.fill(0.0);
    }

    fn rate(&self) -> f64 {
        self.rate
    }

    fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    fn export_state(&self) -> Result<Vec<u8>> {
        let state = GradientDescentState { rate: self.rate };
        serde_json::to_vec(&state)
            .map_err(|e| Error::serialization("exporting optimizer state", e))
    }

    fn import_state(&mut self, blob: &[u8]) -> Result<()> {
        let state: GradientDescentState = serde_json::from_slice(blob)
            .map_err(|e| Error::serialization("importing optimizer state", e))?;
        self.rate = state.rate;
        Ok(())
    }
}

/// Deterministic synthetic samples of `y = weight·x + bias` plus
/// uniform noise, batched and reshuffled per pass.
///
/// A fresh source starts exhausted; the first `restart` begins the
/// first pass, which is exactly what the epoch drivers do. The shuffle
/// order is derived purely from the restart seed, so a resumed run
/// replays epoch N's batches identically.
pub struct SyntheticSource {
    inputs: Vec<f64>,
    targets: Vec<f64>,
    batch_size: usize,
    order: Vec<usize>,
    cursor: usize,
}

impl SyntheticSource {
    /// Generate `samples` points from `seed`. A `batch_size` of zero is
    /// bumped to one.
    #[must_use]
    pub fn new(
        samples: usize,
        batch_size: usize,
        weight: f64,
        bias: f64,
        noise: f64,
        seed: u64,
    ) -> Self {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let mut inputs = Vec::with_capacity(samples);
        let mut targets = Vec::with_capacity(samples);
        for _ in 0..samples {
            let x = rng.random::<f64>() * 2.0 - 1.0;
            let jitter = noise * (rng.random::<f64>() * 2.0 - 1.0);
            inputs.push(x);
            targets.push(weight * x + bias + jitter);
        }
        let batch_size = batch_size.max(1);
        let cursor = samples.div_ceil(batch_size);
        Self { inputs, targets, batch_size, order: (0..samples).collect(), cursor }
    }
}

impl DataSource for SyntheticSource {
    type Batch = SampleBatch;

    fn len(&self) -> usize {
        self.inputs.len().div_ceil(self.batch_size)
    }

    fn restart(&mut self, seed: u64) -> Result<()> {
        // Rebuild from identity before shuffling: the pass order must
        // depend on the seed alone, not on previous passes.
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        self.order = (0..self.inputs.len()).collect();
        self.order.shuffle(&mut rng);
        self.cursor = 0;
        Ok(())
    }

    fn next_batch(&mut self) -> Result<Option<SampleBatch>> {
        let start = self.cursor * self.batch_size;
        if start >= self.inputs.len() {
            return Ok(None);
        }
        let end = (start + self.batch_size).min(self.inputs.len());
        let picks = &self.order[start..end];
        let inputs = picks.iter().map(|&i| self.inputs[i]).collect::<Array1<f64>>();
        let targets = picks.iter().map(|&i| self.targets[i]).collect::<Array1<f64>>();
        self.cursor += 1;
        Ok(Some(SampleBatch { inputs, targets }))
    }
}

/// A task/optimizer pair over fresh zeroed parameters.
#[must_use]
pub fn line_fit_setup(rate: f64) -> (LineFitTask, GradientDescent) {
    let params = Rc::new(RefCell::new(LineParams::zeroed()));
    let task = LineFitTask::new(Rc::clone(&params));
    let optimizer = GradientDescent::new(params, rate);
    (task, optimizer)
}
