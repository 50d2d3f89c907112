//! Rate schedules: pure multiplier curves over the advance count.

use serde::{Deserialize, Serialize};

/// Cadence a schedule is bound to.
///
/// A schedule configured for [`Interval::Step`] only reacts to
/// per-step advancement calls; one configured for [`Interval::Epoch`]
/// only reacts to end-of-epoch calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    /// Advance candidate after every TRAIN step.
    Step,
    /// Advance candidate after every epoch.
    Epoch,
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Interval::Step => write!(f, "step"),
            Interval::Epoch => write!(f, "epoch"),
        }
    }
}

/// A rate curve as a pure function of how often it has advanced.
///
/// Implementations carry configuration only, never counters: the
/// [`ScheduleController`](crate::optim::ScheduleController) owns the
/// advance count, which is what makes controller state export exact.
pub trait RateSchedule: std::fmt::Debug {
    /// Multiplier applied to the base rate after `advances` advancements.
    fn factor(&self, advances: u64) -> f64;
}

/// Multiplier fixed at 1; the rate never moves.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantSchedule;

impl RateSchedule for ConstantSchedule {
    fn factor(&self, _advances: u64) -> f64 {
        1.0
    }
}

/// Geometric decay applied every `every` advances.
///
/// `factor(n) = decay^(n / every)` with integer division, so the rate
/// holds a plateau and then drops.
#[derive(Debug, Clone, Copy)]
pub struct StepDecaySchedule {
    decay: f64,
    every: u64,
}

impl StepDecaySchedule {
    /// `decay` is the per-plateau multiplier, `every` the plateau width.
    #[must_use]
    pub fn new(decay: f64, every: u64) -> Self {
        Self { decay, every }
    }
}

impl RateSchedule for StepDecaySchedule {
    fn factor(&self, advances: u64) -> f64 {
        if self.every == 0 {
            return 1.0;
        }
        self.decay.powf((advances / self.every) as f64)
    }
}

/// Linear warmup followed by plateaued geometric decay.
///
/// During warmup the multiplier ramps `n / warmup_steps`; past the
/// warmup boundary it becomes `decay^(n / decay_every)`. The ramp
/// starts at zero, so the first advance runs at a small fraction of
/// the base rate.
#[derive(Debug, Clone, Copy)]
pub struct WarmupDecaySchedule {
    warmup_steps: u64,
    decay_every: u64,
    decay: f64,
}

impl WarmupDecaySchedule {
    /// Build with an explicit decay multiplier.
    #[must_use]
    pub fn new(warmup_steps: u64, decay_every: u64, decay: f64) -> Self {
        Self { warmup_steps, decay_every, decay }
    }
}

impl RateSchedule for WarmupDecaySchedule {
    fn factor(&self, advances: u64) -> f64 {
        if self.warmup_steps > 0 && advances <= self.warmup_steps {
            return advances as f64 / self.warmup_steps as f64;
        }
        if self.decay_every == 0 {
            return 1.0;
        }
        self.decay.powf((advances / self.decay_every) as f64)
    }
}
