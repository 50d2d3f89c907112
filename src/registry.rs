//! Name-based schedule construction, so YAML configs and CLI flags can
//! pick a rate schedule without touching concrete types.

use std::collections::BTreeMap;

use crate::config::ScheduleSpec;
use crate::error::{Error, Result};
use crate::optim::{
    ConstantSchedule, Optimizer, RateSchedule, ScheduleController, StepDecaySchedule,
    WarmupDecaySchedule,
};

/// Builds a schedule from a spec's parameter map.
pub type ScheduleBuilder = fn(&ScheduleSpec) -> Result<Box<dyn RateSchedule>>;

/// Registry of named schedule builders.
///
/// [`with_defaults`](ScheduleRegistry::with_defaults) covers the
/// built-in schedules; callers register their own under new names.
pub struct ScheduleRegistry {
    builders: BTreeMap<String, ScheduleBuilder>,
}

impl ScheduleRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { builders: BTreeMap::new() }
    }

    /// Registry with the built-in schedules:
    /// `constant`, `step_decay`, `warmup_decay`.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("constant", build_constant);
        registry.register("step_decay", build_step_decay);
        registry.register("warmup_decay", build_warmup_decay);
        registry
    }

    /// Register a builder, replacing any previous entry for `name`.
    pub fn register(&mut self, name: impl Into<String>, builder: ScheduleBuilder) {
        self.builders.insert(name.into(), builder);
    }

    /// Build the schedule a spec names.
    pub fn build(&self, spec: &ScheduleSpec) -> Result<Box<dyn RateSchedule>> {
        match self.builders.get(&spec.name) {
            Some(builder) => builder(spec),
            None => Err(Error::invalid_input(format!(
                "Unknown schedule '{}'. Supported: {}",
                spec.name,
                self.names().join(", ")
            ))),
        }
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.builders.keys().cloned().collect()
    }
}

impl Default for ScheduleRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn require_positive_decay(decay: f64) -> Result<f64> {
    if !(decay > 0.0) || !decay.is_finite() {
        return Err(Error::invalid_input(format!(
            "schedule decay must be a positive finite number, got {decay}"
        )));
    }
    Ok(decay)
}

fn build_constant(_spec: &ScheduleSpec) -> Result<Box<dyn RateSchedule>> {
    Ok(Box::new(ConstantSchedule))
}

fn build_step_decay(spec: &ScheduleSpec) -> Result<Box<dyn RateSchedule>> {
    let decay = require_positive_decay(spec.param_f64("decay", 0.98))?;
    let every = spec.param_u64("every", 1);
    Ok(Box::new(StepDecaySchedule::new(decay, every)))
}

fn build_warmup_decay(spec: &ScheduleSpec) -> Result<Box<dyn RateSchedule>> {
    let warmup_steps = spec.param_u64("warmup_steps", 1000);
    let decay_every = spec.param_u64("decay_every", 10_000);
    let decay = require_positive_decay(spec.param_f64("decay", 0.9))?;
    Ok(Box::new(WarmupDecaySchedule::new(warmup_steps, decay_every, decay)))
}

/// Wire an optimizer and an optional schedule spec into a controller.
///
/// Without a spec the controller still applies gradients; it just never
/// changes the rate.
pub fn build_controller(
    optimizer: Box<dyn Optimizer>,
    spec: Option<&ScheduleSpec>,
    registry: &ScheduleRegistry,
) -> Result<ScheduleController> {
    let controller = ScheduleController::new(optimizer);
    match spec {
        Some(spec) => {
            let schedule = registry.build(spec)?;
            Ok(controller.with_schedule(schedule, spec.cadence, spec.frequency))
        }
        None => Ok(controller),
    }
}
