//! apiary CLI: bee colony hyperparameter search around a training command.

mod error;
mod output;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use apiary::automl::{CommandEvaluator, EmptyHistoryPolicy, Evaluator, SyntheticSegmentationEvaluator};
use apiary::config::ExperimentConfig;
use apiary::metaheuristics::abc::{
    ArtificialBeeColony, Checkpoint, CheckpointCallback, EvaluationMode, ProgressCallback,
    RunResult,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::error::{CliError, Result};

#[derive(Parser)]
#[command(name = "apiary")]
#[command(about = "Artificial Bee Colony hyperparameter search")]
#[command(version)]
struct Cli {
    /// Log every evaluation
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new search
    Run(SearchArgs),

    /// Continue a search from a checkpoint
    Resume {
        /// Checkpoint written by `run --checkpoint`
        #[arg(value_name = "CHECKPOINT")]
        from: PathBuf,

        #[command(flatten)]
        search: SearchArgs,
    },

    /// Print the search space and run settings as experiment JSON
    Space {
        /// Experiment file to load instead of the defaults
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Summarize a saved run result
    Inspect {
        /// Result file written by `run --output`
        result: PathBuf,
    },
}

#[derive(Args)]
struct SearchArgs {
    /// Experiment file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Total generations to run
    #[arg(short, long)]
    generations: Option<usize>,

    /// Number of food sources
    #[arg(long)]
    colony_size: Option<usize>,

    /// Onlooker evaluations per generation
    #[arg(long)]
    onlookers: Option<usize>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Evaluate each phase's trials concurrently
    #[arg(long)]
    parallel: bool,

    /// Fitness for a trainer that reports no accuracy
    #[arg(long, value_enum)]
    empty_history: Option<EmptyHistoryArg>,

    /// Write the run result here (JSON)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write a checkpoint here after each generation
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Checkpoint only every N generations
    #[arg(long, default_value = "1")]
    checkpoint_every: usize,

    /// Score configurations with the built-in synthetic trainer
    #[arg(long)]
    synthetic: bool,

    /// Trainer command; prints one accuracy per line and receives `--name=value` arguments
    #[arg(last = true)]
    trainer: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum EmptyHistoryArg {
    Sentinel,
    Worst,
    Fail,
}

impl From<EmptyHistoryArg> for EmptyHistoryPolicy {
    fn from(arg: EmptyHistoryArg) -> Self {
        match arg {
            EmptyHistoryArg::Sentinel => Self::Sentinel,
            EmptyHistoryArg::Worst => Self::Worst,
            EmptyHistoryArg::Fail => Self::Fail,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Run(args) => cmd_run(&args, cli.verbose),
        Commands::Resume { from, search } => cmd_resume(&from, &search, cli.verbose),
        Commands::Space { config } => cmd_space(config.as_deref()),
        Commands::Inspect { result } => cmd_inspect(&result),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&e.to_string());
            e.exit_code()
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default = if verbose {
        "apiary=debug"
    } else if quiet {
        "apiary=warn"
    } else {
        "apiary=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

impl SearchArgs {
    /// Experiment file (or defaults) with command-line overrides applied.
    fn experiment(&self) -> Result<ExperimentConfig> {
        let mut experiment = match &self.config {
            Some(path) => ExperimentConfig::load(path)?,
            None => ExperimentConfig::default(),
        };
        let abc = &mut experiment.abc;
        if let Some(generations) = self.generations {
            abc.max_generations = generations;
        }
        if let Some(colony_size) = self.colony_size {
            abc.colony_size = colony_size;
        }
        if let Some(onlookers) = self.onlookers {
            abc.onlooker_count = onlookers;
        }
        if let Some(seed) = self.seed {
            abc.seed = Some(seed);
        }
        if self.parallel {
            abc.evaluation_mode = EvaluationMode::Parallel;
        }
        if let Some(policy) = self.empty_history {
            experiment.empty_history = policy.into();
        }
        Ok(experiment)
    }

    fn evaluator(&self, policy: EmptyHistoryPolicy) -> Result<Box<dyn Evaluator>> {
        match (self.synthetic, self.trainer.split_first()) {
            (true, Some(_)) => Err(CliError::ConflictingEvaluators),
            (true, None) => Ok(Box::new(
                SyntheticSegmentationEvaluator::new().with_empty_history(policy),
            )),
            (false, Some((program, args))) => Ok(Box::new(
                CommandEvaluator::new(program)
                    .args(args.iter().cloned())
                    .with_empty_history(policy),
            )),
            (false, None) => Err(CliError::NoEvaluator),
        }
    }

    fn optimizer(
        &self,
        experiment: ExperimentConfig,
        verbose: bool,
    ) -> Result<ArtificialBeeColony> {
        let progress = if verbose {
            ProgressCallback::verbose()
        } else {
            ProgressCallback::new()
        };
        let mut abc = ArtificialBeeColony::new(experiment.space, experiment.abc)?.callback(progress);
        if let Some(path) = &self.checkpoint {
            abc = abc.callback(CheckpointCallback::new(path.clone()).with_every(self.checkpoint_every));
        }
        Ok(abc)
    }

    fn finish(&self, result: &RunResult) -> Result<()> {
        output::summary(result);
        if let Some(path) = &self.output {
            result.save_json(path)?;
            output::success(&format!("Result written to {}", path.display()));
        }
        Ok(())
    }
}

fn cmd_run(args: &SearchArgs, verbose: bool) -> Result<()> {
    let experiment = args.experiment()?;
    let evaluator = args.evaluator(experiment.empty_history)?;
    let mut abc = args.optimizer(experiment, verbose)?;
    let result = abc.run(evaluator.as_ref())?;
    args.finish(&result)
}

fn cmd_resume(from: &Path, args: &SearchArgs, verbose: bool) -> Result<()> {
    let state = Checkpoint::load(from)?.into_state();
    let mut experiment = args.experiment()?;
    if args.config.is_none() {
        experiment.space = state.space().clone();
        if args.colony_size.is_none() {
            experiment.abc.colony_size = state.population().len();
        }
    }
    let evaluator = args.evaluator(experiment.empty_history)?;
    let mut abc = args.optimizer(experiment, verbose)?;
    let result = abc.resume(state, evaluator.as_ref())?;
    args.finish(&result)
}

fn cmd_space(path: Option<&Path>) -> Result<()> {
    let experiment = match path {
        Some(path) => ExperimentConfig::load(path)?,
        None => ExperimentConfig::default(),
    };
    println!("{}", experiment.to_json()?);
    Ok(())
}

fn cmd_inspect(path: &Path) -> Result<()> {
    let result = RunResult::load_json(path)?;
    output::summary(&result);
    output::history(&result);
    Ok(())
}
