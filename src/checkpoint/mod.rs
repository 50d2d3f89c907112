//! Checkpoint records and the directory-backed store.
//!
//! Records are pretty-printed JSON written atomically (temp file, then
//! rename); parameter blobs are raw bytes. Anything a collaborator
//! produced stays opaque to this layer.

mod record;
mod store;

pub use record::{BestModelRecord, CheckpointRecord};
pub use store::{CheckpointStore, BEST_MODEL, LATEST_FILE};
