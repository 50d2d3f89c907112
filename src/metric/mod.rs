//! Metric aggregation: running averages and per-window metric sets.
//!
//! A [`RunningAverage`] folds a stream of weighted observations into an
//! incrementally maintained mean. A [`MetricSet`] keys a fixed family
//! of averages by name and snapshots them for logging and best-model
//! comparison.

mod meter;
mod set;

pub use meter::RunningAverage;
pub use set::{MetricSet, MetricSnapshot};
