//! Error types for training-loop orchestration.
//!
//! Every fallible operation in this crate returns [`Result`]. Error
//! messages carry an actionable hint after the `→` arrow so a failure
//! seen in a terminal tells the operator what to check next.

use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All failure modes surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum Error {
    /// A caller-supplied value violates a precondition.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// What was wrong and the acceptable range.
        message: String,
    },

    /// A metric name outside the set declared at initialization.
    #[error("unknown metric '{name}' → register it in the metric name list before updating")]
    UnknownMetric {
        /// The offending metric name.
        name: String,
    },

    /// A mean was requested before any update was accepted.
    #[error("no observations recorded for {context} → update at least once before reading the mean")]
    EmptyState {
        /// Which meter or window was empty.
        context: String,
    },

    /// An artifact exists on disk but cannot be decoded.
    #[error("corrupt checkpoint at {path}: {detail} → delete the file to fall back to a fresh run")]
    CorruptCheckpoint {
        /// Path of the unreadable artifact.
        path: PathBuf,
        /// Decoder diagnostic.
        detail: String,
    },

    /// A requested artifact does not exist.
    #[error("artifact not found: {path} → check the run directory or start a fresh run")]
    NotFound {
        /// Path that was probed.
        path: PathBuf,
    },

    /// A model, optimizer, or data-source collaborator failed mid-step.
    ///
    /// Fatal by contract: retrying or skipping a batch would desync
    /// `global_step` from the schedule cadence.
    #[error("collaborator failed: {source}")]
    Collaborator {
        /// The underlying collaborator error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Filesystem failure underneath the checkpoint store or config loader.
    #[error("io failure while {context}: {source}")]
    Io {
        /// Operation in progress when the failure occurred.
        context: String,
        /// OS-level error.
        #[source]
        source: std::io::Error,
    },

    /// Encoding a record for persistence failed.
    #[error("serialization failure while {context}: {source}")]
    Serialization {
        /// Operation in progress when the failure occurred.
        context: String,
        /// Encoder diagnostic.
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// Invalid caller input with a message.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput { message: message.into() }
    }

    /// Update or lookup against an undeclared metric name.
    pub fn unknown_metric(name: impl Into<String>) -> Self {
        Error::UnknownMetric { name: name.into() }
    }

    /// Mean requested from an empty meter or window.
    pub fn empty_state(context: impl Into<String>) -> Self {
        Error::EmptyState { context: context.into() }
    }

    /// Unreadable artifact at `path`.
    pub fn corrupt_checkpoint(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Error::CorruptCheckpoint { path: path.into(), detail: detail.into() }
    }

    /// Missing artifact at `path`.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Error::NotFound { path: path.into() }
    }

    /// Wrap an error raised inside a collaborator implementation.
    pub fn collaborator(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Collaborator { source: source.into() }
    }

    /// Filesystem failure with the operation named.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io { context: context.into(), source }
    }

    /// Encoder failure with the operation named.
    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Error::Serialization { context: context.into(), source }
    }

    /// True for failures a caller may answer by starting a fresh run
    /// instead of resuming: a missing or unreadable checkpoint.
    #[must_use]
    pub fn allows_fresh_start(&self) -> bool {
        matches!(self, Error::CorruptCheckpoint { .. } | Error::NotFound { .. })
    }
}
