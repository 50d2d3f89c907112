//! Run logging seam and its backends.
//!
//! The trainer reports two shapes of event: scalar series points
//! (what a dashboard plots) and free-text lines tagged with the
//! global step. Logging is best-effort; backends swallow their own
//! I/O failures rather than killing a training run.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One scalar series point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarEvent {
    /// Series x-axis name (`step_global` or `epoch`).
    pub x_name: String,
    /// Position on the x-axis.
    pub x_value: u64,
    /// Series name, `{mode}/{metric}`.
    pub y_name: String,
    /// The value.
    pub y_value: f64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum LogEvent {
    Scalar(ScalarEvent),
    Text { line: String, step: u64 },
}

/// Sink for run events.
pub trait RunLogger {
    /// Record one scalar series point.
    fn log_scalar(&mut self, x_name: &str, x_value: u64, y_name: &str, y_value: f64);

    /// Record a free-text line tagged with the global step.
    fn log_text(&mut self, line: &str, step: u64);
}

/// Shared-handle logging: a cloned `Rc<RefCell<L>>` can be handed to
/// the trainer while the caller keeps the other handle for inspection.
impl<L: RunLogger> RunLogger for std::rc::Rc<std::cell::RefCell<L>> {
    fn log_scalar(&mut self, x_name: &str, x_value: u64, y_name: &str, y_value: f64) {
        self.borrow_mut().log_scalar(x_name, x_value, y_name, y_value);
    }

    fn log_text(&mut self, line: &str, step: u64) {
        self.borrow_mut().log_text(line, step);
    }
}

/// Prints events to stdout with a wall-clock prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleLogger;

impl ConsoleLogger {
    fn stamp() -> String {
        chrono::Local::now().format("%H:%M:%S").to_string()
    }
}

impl RunLogger for ConsoleLogger {
    fn log_scalar(&mut self, x_name: &str, x_value: u64, y_name: &str, y_value: f64) {
        println!("[{}] {y_name}: {y_value:.6} ({x_name}={x_value})", Self::stamp());
    }

    fn log_text(&mut self, line: &str, step: u64) {
        println!("[{}] {line} (step {step})", Self::stamp());
    }
}

/// Captures events in memory; the assertion backend for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogger {
    scalars: Vec<ScalarEvent>,
    lines: Vec<(String, u64)>,
}

impl MemoryLogger {
    /// Empty capture buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every scalar event recorded so far.
    #[must_use]
    pub fn scalars(&self) -> &[ScalarEvent] {
        &self.scalars
    }

    /// Every text line recorded so far.
    #[must_use]
    pub fn lines(&self) -> &[(String, u64)] {
        &self.lines
    }
}

impl RunLogger for MemoryLogger {
    fn log_scalar(&mut self, x_name: &str, x_value: u64, y_name: &str, y_value: f64) {
        self.scalars.push(ScalarEvent {
            x_name: x_name.to_string(),
            x_value,
            y_name: y_name.to_string(),
            y_value,
        });
    }

    fn log_text(&mut self, line: &str, step: u64) {
        self.lines.push((line.to_string(), step));
    }
}

/// Appends events as JSON lines to a file.
#[derive(Debug)]
pub struct JsonlLogger {
    writer: BufWriter<File>,
}

impl JsonlLogger {
    /// Open (or create) the log file in append mode.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::io(format!("creating {}", parent.display()), e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::io(format!("opening {}", path.display()), e))?;
        Ok(Self { writer: BufWriter::new(file) })
    }

    fn append(&mut self, event: &LogEvent) {
        // Best-effort: a full disk must not abort training.
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(self.writer, "{json}");
            let _ = self.writer.flush();
        }
    }
}

impl RunLogger for JsonlLogger {
    fn log_scalar(&mut self, x_name: &str, x_value: u64, y_name: &str, y_value: f64) {
        self.append(&LogEvent::Scalar(ScalarEvent {
            x_name: x_name.to_string(),
            x_value,
            y_name: y_name.to_string(),
            y_value,
        }));
    }

    fn log_text(&mut self, line: &str, step: u64) {
        self.append(&LogEvent::Text { line: line.to_string(), step });
    }
}
