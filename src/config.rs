//! Run configuration: one explicit struct, constructed once and handed
//! to every component that needs it.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::optim::Interval;

/// Which way the primary metric improves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Lower values win (losses).
    #[default]
    Minimize,
    /// Higher values win (accuracies, scores).
    Maximize,
}

impl Direction {
    /// True when `candidate` is strictly better than `incumbent`.
    ///
    /// Strict either way, so a tie never counts as an improvement.
    #[must_use]
    pub fn improves(&self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Direction::Minimize => candidate < incumbent,
            Direction::Maximize => candidate > incumbent,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Minimize => write!(f, "minimize"),
            Direction::Maximize => write!(f, "maximize"),
        }
    }
}

/// Declarative description of a rate schedule.
///
/// `name` selects a builder in the
/// [`ScheduleRegistry`](crate::registry::ScheduleRegistry); everything
/// the builder needs beyond cadence and frequency rides in `params`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSpec {
    /// Registry key: `constant` | `step_decay` | `warmup_decay` | user-registered.
    pub name: String,

    /// Cadence the schedule reacts to.
    pub cadence: Interval,

    /// Advance once every `frequency` matching counts. Zero never
    /// passes the controller's gate.
    #[serde(default = "default_frequency")]
    pub frequency: u64,

    /// Schedule-specific parameters (decay, every, warmup_steps, ...).
    #[serde(flatten)]
    pub params: HashMap<String, serde_json::Value>,
}

impl ScheduleSpec {
    /// Spec with an empty parameter map.
    #[must_use]
    pub fn new(name: impl Into<String>, cadence: Interval, frequency: u64) -> Self {
        Self { name: name.into(), cadence, frequency, params: HashMap::new() }
    }

    /// Add one parameter, builder style.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Read a float parameter with a fallback.
    #[must_use]
    pub fn param_f64(&self, key: &str, default: f64) -> f64 {
        self.params.get(key).and_then(serde_json::Value::as_f64).unwrap_or(default)
    }

    /// Read an integer parameter with a fallback.
    #[must_use]
    pub fn param_u64(&self, key: &str, default: u64) -> u64 {
        self.params.get(key).and_then(serde_json::Value::as_u64).unwrap_or(default)
    }
}

fn default_frequency() -> u64 {
    1
}

/// Everything the orchestrator reads at run time.
///
/// Constructed with [`TrainConfig::default`] plus `with_*` overrides,
/// or loaded from YAML. [`validate`](TrainConfig::validate) runs at
/// trainer construction, so a bad value fails before the first epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Exclusive upper bound on epoch indices. Zero is legal and makes
    /// `fit` complete immediately.
    pub total_epochs: u64,

    /// Named snapshots start after this many epochs.
    pub save_model_after_epoch: u64,

    /// Named snapshot cadence in epochs. Must be at least 1.
    pub save_model_every_epoch: u64,

    /// TRAIN metric-log cadence in global steps; also gates eval-mode
    /// progress lines by local step. Must be at least 1.
    pub log_every_local_step: u64,

    /// Base seed. Resolved from entropy at trainer construction when
    /// absent, so a resumed run always has a concrete seed to persist.
    pub seed: Option<u64>,

    /// Bit-exactness hint surfaced to collaborators (deterministic
    /// kernels). Loop determinism itself never depends on it.
    pub seed_strict: bool,

    /// Metric the best-model policy ranks on.
    pub primary_metric: String,

    /// Which way the primary metric improves.
    pub direction: Direction,

    /// Optional rate schedule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleSpec>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            total_epochs: 10,
            save_model_after_epoch: 0,
            save_model_every_epoch: 1,
            log_every_local_step: 40,
            seed: None,
            seed_strict: false,
            primary_metric: "total_loss".to_string(),
            direction: Direction::Minimize,
            schedule: None,
        }
    }
}

impl TrainConfig {
    /// Set the epoch count.
    #[must_use]
    pub fn with_total_epochs(mut self, total_epochs: u64) -> Self {
        self.total_epochs = total_epochs;
        self
    }

    /// Named snapshots begin only after this epoch.
    #[must_use]
    pub fn with_save_model_after_epoch(mut self, epoch: u64) -> Self {
        self.save_model_after_epoch = epoch;
        self
    }

    /// Named snapshot cadence in epochs.
    #[must_use]
    pub fn with_save_model_every_epoch(mut self, every: u64) -> Self {
        self.save_model_every_epoch = every;
        self
    }

    /// Metric-log cadence in steps.
    #[must_use]
    pub fn with_log_every_local_step(mut self, every: u64) -> Self {
        self.log_every_local_step = every;
        self
    }

    /// Fix the base seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Request bit-exact collaborator kernels.
    #[must_use]
    pub fn with_seed_strict(mut self, strict: bool) -> Self {
        self.seed_strict = strict;
        self
    }

    /// Rank checkpoints on this metric.
    #[must_use]
    pub fn with_primary_metric(mut self, name: impl Into<String>) -> Self {
        self.primary_metric = name.into();
        self
    }

    /// Set the improvement direction of the primary metric.
    #[must_use]
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Attach a rate schedule.
    #[must_use]
    pub fn with_schedule(mut self, schedule: ScheduleSpec) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Reject configurations the loop cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.save_model_every_epoch == 0 {
            return Err(Error::invalid_input(
                "save_model_every_epoch must be at least 1 (use save_model_after_epoch to delay snapshots)",
            ));
        }
        if self.log_every_local_step == 0 {
            return Err(Error::invalid_input("log_every_local_step must be at least 1"));
        }
        if self.primary_metric.is_empty() {
            return Err(Error::invalid_input("primary_metric must name a task metric"));
        }
        Ok(())
    }

    /// Load and validate a configuration from a YAML file.
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("reading config {}", path.display()), e))?;
        let config: Self = serde_yaml::from_str(&text).map_err(|e| {
            Error::invalid_input(format!("failed to parse config {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }
}
