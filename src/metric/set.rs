//! Keyed collection of running averages for one aggregation window.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::metric::RunningAverage;

/// Snapshot of a metric window: name → current mean.
///
/// `BTreeMap` keeps iteration (and serialized) order stable across
/// runs, which keeps log lines and persisted best-metric records
/// byte-comparable.
pub type MetricSnapshot = BTreeMap<String, f64>;

/// A fixed set of named meters covering one aggregation window.
///
/// The name list is closed at construction: updating a name that was
/// not declared is an [`Error::UnknownMetric`], never a silent insert.
/// The window is reset once per step in TRAIN mode and once per epoch
/// in the evaluation modes.
#[derive(Debug, Clone, Default)]
pub struct MetricSet {
    meters: BTreeMap<String, RunningAverage>,
}

impl MetricSet {
    /// Create one empty meter per distinct name.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let meters = names
            .into_iter()
            .map(|name| (name.into(), RunningAverage::new()))
            .collect();
        Self { meters }
    }

    /// Record one observation for `name`.
    pub fn update(&mut self, name: &str, value: f64, weight: f64) -> Result<()> {
        let meter = self
            .meters
            .get_mut(name)
            .ok_or_else(|| Error::unknown_metric(name))?;
        meter.update_weighted(value, weight)
    }

    /// Non-mutating view of every meter's current mean.
    ///
    /// Surfaces [`Error::EmptyState`] if any meter has not received an
    /// update, rather than fabricating a value for it.
    pub fn snapshot(&self) -> Result<MetricSnapshot> {
        let mut out = MetricSnapshot::new();
        for (name, meter) in &self.meters {
            let mean = meter
                .mean()
                .map_err(|_| Error::empty_state(format!("metric '{name}'")))?;
            out.insert(name.clone(), mean);
        }
        Ok(out)
    }

    /// Reset every meter to the empty state, keeping the name list.
    pub fn reset(&mut self) {
        for meter in self.meters.values_mut() {
            meter.reset();
        }
    }

    /// Declared metric names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.meters.keys().map(String::as_str)
    }

    /// True if `name` was declared at construction.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.meters.contains_key(name)
    }

    /// Number of declared meters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.meters.len()
    }

    /// True when no names were declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.meters.is_empty()
    }
}
