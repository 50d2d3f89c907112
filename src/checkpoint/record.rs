//! Resumable-state records.

use serde::{Deserialize, Serialize};

use crate::metric::MetricSnapshot;

/// The best validation result seen so far.
///
/// Replaced as a unit on every improvement; never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestModelRecord {
    /// Full metric snapshot of the winning validation epoch.
    pub metrics: MetricSnapshot,
    /// Epoch index the snapshot was taken at.
    pub epoch: u64,
}

/// Everything needed to continue a run exactly where it left off.
///
/// The three `*_state` fields are opaque blobs produced by the
/// collaborators; the orchestrator stores and returns them untouched.
/// `epoch` is the last fully completed epoch: restoring positions the
/// loop at `epoch + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    /// Last completed epoch index.
    pub epoch: u64,
    /// Global TRAIN step count at save time.
    pub step: u64,
    /// Base seed of the run.
    pub seed: u64,
    /// Task parameter blob.
    pub model_state: Vec<u8>,
    /// Optimizer collaborator blob.
    pub optimizer_state: Vec<u8>,
    /// Schedule bookkeeping blob.
    pub scheduler_state: Vec<u8>,
    /// Best validation snapshot, absent until a first candidate wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_metric: Option<MetricSnapshot>,
    /// Epoch the best snapshot was taken at (0 when `best_metric` is
    /// absent).
    #[serde(default)]
    pub best_model_epoch: u64,
}

impl CheckpointRecord {
    /// Reassemble the best-model record, if one was ever selected.
    #[must_use]
    pub fn best_record(&self) -> Option<BestModelRecord> {
        self.best_metric.as_ref().map(|metrics| BestModelRecord {
            metrics: metrics.clone(),
            epoch: self.best_model_epoch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(best: bool) -> CheckpointRecord {
        let mut snapshot = MetricSnapshot::new();
        snapshot.insert("total_loss".into(), 0.75);
        CheckpointRecord {
            epoch: 4,
            step: 1280,
            seed: 42,
            model_state: vec![1, 2, 3],
            optimizer_state: vec![4, 5],
            scheduler_state: vec![6],
            best_metric: best.then_some(snapshot),
            best_model_epoch: if best { 2 } else { 0 },
        }
    }

    #[test]
    fn test_json_round_trip_with_best() {
        let record = sample(true);
        let json = serde_json::to_string_pretty(&record).unwrap();
        let back: CheckpointRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_json_round_trip_without_best() {
        let record = sample(false);
        let json = serde_json::to_string(&record).unwrap();
        // Absent best is omitted from the encoding entirely.
        assert!(!json.contains("best_metric"));
        let back: CheckpointRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        assert!(back.best_record().is_none());
    }

    #[test]
    fn test_best_record_reassembly() {
        let record = sample(true);
        let best = record.best_record().unwrap();
        assert_eq!(best.epoch, 2);
        assert_eq!(best.metrics["total_loss"], 0.75);
    }
}
