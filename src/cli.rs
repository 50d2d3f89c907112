//! Command-line interface over the built-in line-fit demo task:
//! run or resume training, evaluate stored artifacts, inspect runs.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::checkpoint::{CheckpointStore, BEST_MODEL};
use crate::config::TrainConfig;
use crate::demo::{line_fit_setup, SyntheticSource};
use crate::error::Result;
use crate::eval::Evaluator;
use crate::registry::{build_controller, ScheduleRegistry};
use crate::train::{DataSource, RunLogger, Trainer};

/// Demo ground truth: `y = 2.5x - 1` plus mild noise.
const TRUE_WEIGHT: f64 = 2.5;
const TRUE_BIAS: f64 = -1.0;
const NOISE: f64 = 0.05;

/// Adiestrar: training-loop orchestration
#[derive(Parser, Debug)]
#[command(name = "adiestrar")]
#[command(author = "PAIML")]
#[command(version)]
#[command(about = "Resumable training runs with metric tracking and crash-safe checkpoints")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Suppress per-step training output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run (or resume) a training run on the demo task
    Train(TrainArgs),

    /// Evaluate stored model artifacts against fresh data
    Evaluate(EvaluateArgs),

    /// Display the state of a run directory
    Info(InfoArgs),
}

/// Arguments for the train command
#[derive(Parser, Debug)]
pub struct TrainArgs {
    /// Path to a YAML training configuration
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Run directory for checkpoints and artifacts
    #[arg(short, long, default_value = "runs/line-fit")]
    pub run_dir: PathBuf,

    /// Resume from the run directory's rolling checkpoint
    #[arg(long)]
    pub resume: bool,

    /// Override number of epochs
    #[arg(short, long)]
    pub epochs: Option<u64>,

    /// Override learning rate
    #[arg(short, long)]
    pub lr: Option<f64>,

    /// Override random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Request bit-exact collaborator kernels
    #[arg(long)]
    pub seed_strict: bool,

    /// Override metric-log cadence (global steps)
    #[arg(long)]
    pub log_every: Option<u64>,

    /// Override the epoch snapshots start after
    #[arg(long)]
    pub save_after: Option<u64>,

    /// Override snapshot cadence (epochs)
    #[arg(long)]
    pub save_every: Option<u64>,

    /// Number of synthetic training samples
    #[arg(long, default_value_t = 512)]
    pub samples: usize,

    /// Batch size for the demo sources
    #[arg(short, long, default_value_t = 32)]
    pub batch_size: usize,
}

/// Arguments for the evaluate command
#[derive(Parser, Debug)]
pub struct EvaluateArgs {
    /// Artifact to evaluate: a model name, or "all"
    #[arg(default_value = BEST_MODEL)]
    pub artifact: String,

    /// Run directory holding the artifacts
    #[arg(short, long, default_value = "runs/line-fit")]
    pub run_dir: PathBuf,

    /// Number of synthetic evaluation samples
    #[arg(long, default_value_t = 256)]
    pub samples: usize,

    /// Batch size
    #[arg(short, long, default_value_t = 32)]
    pub batch_size: usize,

    /// Seed for the evaluation data
    #[arg(long, default_value_t = 99)]
    pub seed: u64,
}

/// Arguments for the info command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Run directory to inspect
    #[arg(short, long, default_value = "runs/line-fit")]
    pub run_dir: PathBuf,
}

/// Swallows everything; backs the `--quiet` flag.
struct SilentLogger;

impl RunLogger for SilentLogger {
    fn log_scalar(&mut self, _x_name: &str, _x_value: u64, _y_name: &str, _y_value: f64) {}

    fn log_text(&mut self, _line: &str, _step: u64) {}
}

/// Execute a parsed command.
pub fn run_command(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Train(args) => run_train(args, cli.quiet),
        Command::Evaluate(args) => run_evaluate(args),
        Command::Info(args) => run_info(args),
    }
}

fn run_train(args: TrainArgs, quiet: bool) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => TrainConfig::from_yaml(path)?,
        None => TrainConfig::default(),
    };
    if let Some(epochs) = args.epochs {
        config.total_epochs = epochs;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if args.seed_strict {
        config.seed_strict = true;
    }
    if let Some(every) = args.log_every {
        config.log_every_local_step = every;
    }
    if let Some(after) = args.save_after {
        config.save_model_after_epoch = after;
    }
    if let Some(every) = args.save_every {
        config.save_model_every_epoch = every;
    }

    println!("✓ Config ready");
    println!("  Epochs: {}", config.total_epochs);
    println!("  Primary metric: {} ({})", config.primary_metric, config.direction);
    if let Some(schedule) = &config.schedule {
        println!(
            "  Schedule: {} ({} cadence, frequency {})",
            schedule.name, schedule.cadence, schedule.frequency
        );
    }
    println!();

    let rate = args.lr.unwrap_or(0.05);
    let (task, optimizer) = line_fit_setup(rate);
    let registry = ScheduleRegistry::with_defaults();
    let controller = build_controller(Box::new(optimizer), config.schedule.as_ref(), &registry)?;
    let store = CheckpointStore::new(&args.run_dir);

    let mut trainer = Trainer::new(task, controller, store, config)?;
    if quiet {
        trainer = trainer.with_logger(Box::new(SilentLogger));
    }
    println!("✓ Trainer initialized (lr={rate})");

    if args.resume {
        if trainer.try_restore()? {
            println!("✓ Resumed at epoch {}", trainer.state().current_epoch);
        } else {
            println!("No checkpoint in {}; starting fresh", args.run_dir.display());
        }
    }

    let data_seed = trainer.state().seed;
    let valid_samples = (args.samples / 4).max(1);
    let mut train = SyntheticSource::new(
        args.samples,
        args.batch_size,
        TRUE_WEIGHT,
        TRUE_BIAS,
        NOISE,
        data_seed,
    );
    let mut valid = SyntheticSource::new(
        valid_samples,
        args.batch_size,
        TRUE_WEIGHT,
        TRUE_BIAS,
        NOISE,
        data_seed.wrapping_add(1),
    );
    println!("✓ Synthetic data ready ({} train / {} valid batches)", train.len(), valid.len());
    println!();
    println!("Starting training...");
    println!();

    let result = trainer.fit(&mut train, &mut valid)?;

    println!();
    println!("✓ Training complete");
    println!("  Final epoch: {}", result.final_epoch);
    println!("  Global steps: {}", result.global_step);
    if let (Some(epoch), Some(metric)) = (result.best_epoch, result.best_metric) {
        println!(
            "  Best epoch: {epoch} ({}={metric:.6})",
            trainer.config().primary_metric
        );
    }
    let (w, b) = trainer.task().coefficients();
    println!("  Fitted line: y = {w:.4}x + {b:.4}");
    println!("  Elapsed: {:.2}s", result.elapsed_secs);
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    let store = CheckpointStore::new(&args.run_dir);
    let (task, _optimizer) = line_fit_setup(0.0);
    // The evaluator's own log lines would duplicate the summary below.
    let mut evaluator =
        Evaluator::new(task, store).with_seed(args.seed).with_logger(Box::new(SilentLogger));
    let mut source = SyntheticSource::new(
        args.samples,
        args.batch_size,
        TRUE_WEIGHT,
        TRUE_BIAS,
        NOISE,
        args.seed,
    );

    if args.artifact == "all" {
        let results = evaluator.evaluate_all(&mut source)?;
        if results.is_empty() {
            println!("No model artifacts in {}", args.run_dir.display());
            return Ok(());
        }
        println!("✓ Evaluated {} artifacts", results.len());
        for (name, snapshot) in &results {
            for (metric, value) in snapshot {
                println!("  {name}: {metric}={value:.6}");
            }
        }
    } else {
        let snapshot = evaluator.evaluate_artifact(&args.artifact, &mut source)?;
        println!("✓ Evaluated {}", args.artifact);
        for (metric, value) in &snapshot {
            println!("  {metric}: {value:.6}");
        }
    }
    Ok(())
}

fn run_info(args: InfoArgs) -> Result<()> {
    let store = CheckpointStore::new(&args.run_dir);
    let record = store.load_latest()?;

    println!("Run directory: {}", args.run_dir.display());
    println!("  Last completed epoch: {}", record.epoch);
    println!("  Global steps: {}", record.step);
    println!("  Seed: {}", record.seed);
    match record.best_record() {
        Some(best) => {
            println!("  Best epoch: {}", best.epoch);
            for (name, value) in &best.metrics {
                println!("    {name}: {value:.6}");
            }
        }
        None => println!("  Best: none recorded"),
    }
    let models = store.list_models()?;
    if models.is_empty() {
        println!("  Artifacts: none");
    } else {
        println!("  Artifacts: {}", models.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_structure_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_train_overrides_parse() {
        let cli = Cli::try_parse_from([
            "adiestrar",
            "train",
            "--epochs",
            "3",
            "--seed",
            "7",
            "--resume",
            "--run-dir",
            "runs/x",
            "--log-every",
            "5",
        ])
        .unwrap();

        match cli.command {
            Command::Train(args) => {
                assert_eq!(args.epochs, Some(3));
                assert_eq!(args.seed, Some(7));
                assert!(args.resume);
                assert_eq!(args.run_dir, PathBuf::from("runs/x"));
                assert_eq!(args.log_every, Some(5));
                assert!(args.config.is_none());
            }
            _ => panic!("expected train subcommand"),
        }
    }

    #[test]
    fn test_evaluate_defaults_to_best_model() {
        let cli = Cli::try_parse_from(["adiestrar", "evaluate"]).unwrap();
        match cli.command {
            Command::Evaluate(args) => assert_eq!(args.artifact, BEST_MODEL),
            _ => panic!("expected evaluate subcommand"),
        }
    }

    #[test]
    fn test_evaluate_all_sweep_parses() {
        let cli = Cli::try_parse_from(["adiestrar", "evaluate", "all", "--seed", "5"]).unwrap();
        match cli.command {
            Command::Evaluate(args) => {
                assert_eq!(args.artifact, "all");
                assert_eq!(args.seed, 5);
            }
            _ => panic!("expected evaluate subcommand"),
        }
    }

    #[test]
    fn test_quiet_is_global() {
        let cli = Cli::try_parse_from(["adiestrar", "train", "--quiet"]).unwrap();
        assert!(cli.quiet);
    }
}
