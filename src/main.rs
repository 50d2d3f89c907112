//! Adiestrar CLI
//!
//! Training entry point for the adiestrar library.
//!
//! # Usage
//!
//! ```bash
//! # Run the demo task for ten epochs
//! adiestrar train --epochs 10
//!
//! # Resume an interrupted run
//! adiestrar train --resume --run-dir runs/line-fit
//!
//! # Train from a YAML config with a schedule
//! adiestrar train --config train.yaml
//!
//! # Evaluate the best model on held-out data
//! adiestrar evaluate
//!
//! # Evaluate every stored artifact
//! adiestrar evaluate all
//!
//! # Inspect a run directory
//! adiestrar info --run-dir runs/line-fit
//! ```

use adiestrar::cli::{run_command, Cli};
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
