//! Directory-backed checkpoint persistence with atomic writes.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::checkpoint::CheckpointRecord;
use crate::error::{Error, Result};

/// File name of the rolling latest checkpoint.
pub const LATEST_FILE: &str = "checkpoint_latest.json";

/// Artifact name of the best-model parameter blob.
pub const BEST_MODEL: &str = "model_best";

/// Durable storage for one run directory.
///
/// Three kinds of artifact live side by side:
///
/// - the rolling latest checkpoint (`checkpoint_latest.json`), a full
///   [`CheckpointRecord`] overwritten every epoch;
/// - the best-model blob (`model_best.bin`), rewritten only when the
///   best model is replaced;
/// - named snapshots (`model_epoch_{epoch:08}.bin`), written on the
///   configured cadence and never overwritten.
///
/// Every write goes to a temporary file in the same directory first
/// and is renamed over the destination, so an interrupted save never
/// destroys a previously valid artifact.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// Bind a store to `dir`. The directory is created lazily on the
    /// first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Run directory this store writes into.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the rolling latest checkpoint.
    #[must_use]
    pub fn latest_path(&self) -> PathBuf {
        self.dir.join(LATEST_FILE)
    }

    /// Path of a named model blob.
    #[must_use]
    pub fn model_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.bin"))
    }

    /// Artifact name for the periodic snapshot of `epoch`.
    #[must_use]
    pub fn snapshot_name(epoch: u64) -> String {
        format!("model_epoch_{epoch:08}")
    }

    /// Overwrite the rolling latest checkpoint atomically.
    pub fn save_latest(&self, record: &CheckpointRecord) -> Result<()> {
        let encoded = serde_json::to_vec_pretty(record)
            .map_err(|e| Error::serialization("encoding checkpoint record", e))?;
        self.write_atomic(&self.latest_path(), &encoded)
    }

    /// Load the rolling latest checkpoint.
    ///
    /// [`Error::NotFound`] when the slot was never written;
    /// [`Error::CorruptCheckpoint`] when the file exists but does not
    /// decode.
    pub fn load_latest(&self) -> Result<CheckpointRecord> {
        let path = self.latest_path();
        let bytes = read_artifact(&path)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::corrupt_checkpoint(&path, e.to_string()))
    }

    /// Write a named parameter blob atomically, returning its path.
    pub fn save_model_blob(&self, name: &str, blob: &[u8]) -> Result<PathBuf> {
        let path = self.model_path(name);
        self.write_atomic(&path, blob)?;
        Ok(path)
    }

    /// Read a named parameter blob.
    pub fn load_model_blob(&self, name: &str) -> Result<Vec<u8>> {
        read_artifact(&self.model_path(name))
    }

    /// Names of every model blob in the run directory, sorted.
    ///
    /// Checkpoint files are not model blobs and never appear here. A
    /// directory that does not exist yet lists as empty.
    pub fn list_models(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| Error::io(format!("listing {}", self.dir.display()), e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| Error::io(format!("listing {}", self.dir.display()), e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("bin") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| Error::io(format!("creating {}", self.dir.display()), e))?;
        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);
        fs::write(&tmp, bytes)
            .map_err(|e| Error::io(format!("writing {}", tmp.display()), e))?;
        fs::rename(&tmp, path)
            .map_err(|e| Error::io(format!("renaming into {}", path.display()), e))
    }
}

fn read_artifact(path: &Path) -> Result<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::not_found(path)),
        Err(e) => Err(Error::io(format!("reading {}", path.display()), e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(epoch: u64) -> CheckpointRecord {
        CheckpointRecord {
            epoch,
            step: epoch * 10,
            seed: 7,
            model_state: vec![9, 9],
            optimizer_state: vec![8],
            scheduler_state: vec![7],
            best_metric: None,
            best_model_epoch: 0,
        }
    }

    #[test]
    fn test_latest_round_trip_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());

        store.save_latest(&record(0)).unwrap();
        store.save_latest(&record(3)).unwrap();
        let loaded = store.load_latest().unwrap();
        assert_eq!(loaded, record(3));
    }

    #[test]
    fn test_missing_latest_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("never_written"));
        assert!(matches!(store.load_latest(), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_garbage_latest_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.latest_path(), b"{ not json").unwrap();
        assert!(matches!(store.load_latest(), Err(Error::CorruptCheckpoint { .. })));
    }

    #[test]
    fn test_no_temp_residue_after_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        store.save_latest(&record(1)).unwrap();
        store.save_model_blob(BEST_MODEL, &[1, 2, 3]).unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
    }

    #[test]
    fn test_model_blob_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        let blob = vec![0u8, 255, 7, 42];
        let path = store.save_model_blob("model_epoch_00000002", &blob).unwrap();
        assert!(path.ends_with("model_epoch_00000002.bin"));
        assert_eq!(store.load_model_blob("model_epoch_00000002").unwrap(), blob);
    }

    #[test]
    fn test_missing_blob_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        assert!(matches!(store.load_model_blob("model_best"), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_list_models_sorted_and_checkpoint_free() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        store.save_latest(&record(5)).unwrap();
        store.save_model_blob(&CheckpointStore::snapshot_name(4), &[4]).unwrap();
        store.save_model_blob(BEST_MODEL, &[0]).unwrap();
        store.save_model_blob(&CheckpointStore::snapshot_name(2), &[2]).unwrap();

        let names = store.list_models().unwrap();
        assert_eq!(
            names,
            vec!["model_best", "model_epoch_00000002", "model_epoch_00000004"]
        );
    }

    #[test]
    fn test_list_models_of_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("nothing_here"));
        assert!(store.list_models().unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_name_is_zero_padded() {
        assert_eq!(CheckpointStore::snapshot_name(2), "model_epoch_00000002");
        assert_eq!(CheckpointStore::snapshot_name(12345678), "model_epoch_12345678");
    }
}
