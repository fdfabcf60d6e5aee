//! Fitness evaluation of hyperparameter configurations.
//!
//! An [`Evaluator`] runs one training trial for a configuration and returns a
//! fitness score (higher is better, typically final training accuracy in
//! `[0, 1]`). Evaluations are expensive and opaque: the optimizer only sees
//! the returned scalar.
//!
//! # Empty training history
//!
//! A trainer that produces no accuracy history (e.g. zero epochs) has no
//! natural score. [`EmptyHistoryPolicy`] decides what happens:
//!
//! | Policy     | Fitness                        | Notes                          |
//! |------------|--------------------------------|--------------------------------|
//! | `Sentinel` | [`EMPTY_RESULT_FITNESS`] (1.0) | Collides with perfect accuracy |
//! | `Worst`    | `f64::NEG_INFINITY`            | Never accepted, never best     |
//! | `Fail`     | error                          | Aborts the run                 |

use std::path::PathBuf;
use std::process::Command;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::automl::search::{Configuration, ParamValue};

/// Fitness assigned to an evaluation that produced no training history.
///
/// Indistinguishable from a genuine perfect accuracy of 1.0.
pub const EMPTY_RESULT_FITNESS: f64 = 1.0;

/// Prefix for the environment variables [`CommandEvaluator`] exports.
pub const ENV_PREFIX: &str = "APIARY_";

/// Error raised by an evaluation.
#[derive(Error, Debug)]
pub enum EvaluationError {
    /// Training itself reported a failure.
    #[error("training failed: {0}")]
    Training(String),

    /// The trainer could not be started or its output read.
    #[error("trainer I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The trainer process exited unsuccessfully.
    #[error("trainer exited with status {code:?}: {stderr}")]
    ExitStatus {
        /// Exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Captured standard error (trimmed)
        stderr: String,
    },

    /// No accuracy history and [`EmptyHistoryPolicy::Fail`] is in effect.
    #[error("training produced no accuracy history")]
    EmptyHistory,

    /// The configuration cannot be decoded into trainer inputs.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// What to report when training yields an empty accuracy history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyHistoryPolicy {
    /// Report [`EMPTY_RESULT_FITNESS`].
    #[default]
    Sentinel,
    /// Report `f64::NEG_INFINITY`.
    Worst,
    /// Fail the evaluation.
    Fail,
}

/// Final fitness of a training history: its last entry, or the policy fallback.
///
/// # Example
///
/// ```
/// use apiary::automl::{fitness_from_history, EmptyHistoryPolicy, EMPTY_RESULT_FITNESS};
///
/// let fitness = fitness_from_history(&[0.61, 0.72, 0.78], EmptyHistoryPolicy::Sentinel).unwrap();
/// assert_eq!(fitness, 0.78);
///
/// let empty = fitness_from_history(&[], EmptyHistoryPolicy::Sentinel).unwrap();
/// assert_eq!(empty, EMPTY_RESULT_FITNESS);
/// ```
pub fn fitness_from_history(
    history: &[f64],
    policy: EmptyHistoryPolicy,
) -> Result<f64, EvaluationError> {
    if let Some(last) = history.last() {
        return Ok(*last);
    }
    match policy {
        EmptyHistoryPolicy::Sentinel => {
            warn!(
                fitness = EMPTY_RESULT_FITNESS,
                "empty training history, reporting sentinel fitness"
            );
            Ok(EMPTY_RESULT_FITNESS)
        }
        EmptyHistoryPolicy::Worst => {
            warn!("empty training history, reporting worst fitness");
            Ok(f64::NEG_INFINITY)
        }
        EmptyHistoryPolicy::Fail => Err(EvaluationError::EmptyHistory),
    }
}

/// Runs one training trial and scores it.
///
/// Implementations must be [`Sync`] so that the parallel evaluation mode can
/// share them across rayon workers; evaluators with mutable state should use
/// interior mutability.
///
/// Closures implement this trait directly:
///
/// ```
/// use apiary::automl::{Configuration, EvaluationError, Evaluator};
///
/// let evaluator = |config: &Configuration| -> Result<f64, EvaluationError> {
///     Ok(config.get_f64("learning_rate").unwrap_or(0.0))
/// };
/// assert_eq!(evaluator.evaluate(&Configuration::new()).unwrap(), 0.0);
/// ```
pub trait Evaluator: Sync {
    /// Train with `config` and return its fitness.
    fn evaluate(&self, config: &Configuration) -> Result<f64, EvaluationError>;
}

impl<F> Evaluator for F
where
    F: Fn(&Configuration) -> Result<f64, EvaluationError> + Sync,
{
    fn evaluate(&self, config: &Configuration) -> Result<f64, EvaluationError> {
        self(config)
    }
}

/// Evaluates configurations by running an external trainer process.
///
/// Each hyperparameter is passed both as a `--name=value` argument and as an
/// `APIARY_<NAME>` environment variable. Every stdout line that parses as a
/// float is one entry of the accuracy history; the last one is the fitness.
///
/// # Example
///
/// ```no_run
/// use apiary::automl::{CommandEvaluator, EmptyHistoryPolicy};
///
/// let evaluator = CommandEvaluator::new("python3")
///     .arg("train_unet.py")
///     .with_empty_history(EmptyHistoryPolicy::Worst);
/// ```
#[derive(Debug, Clone)]
pub struct CommandEvaluator {
    /// Program to execute
    pub program: PathBuf,
    /// Fixed arguments placed before the hyperparameter arguments
    pub args: Vec<String>,
    /// Fallback for runs with no accuracy output
    pub empty_history: EmptyHistoryPolicy,
}

impl CommandEvaluator {
    /// Create an evaluator for `program`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            empty_history: EmptyHistoryPolicy::default(),
        }
    }

    /// Append a fixed argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several fixed arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the empty-history policy.
    #[must_use]
    pub fn with_empty_history(mut self, policy: EmptyHistoryPolicy) -> Self {
        self.empty_history = policy;
        self
    }

    fn command(&self, config: &Configuration) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (name, value) in config.iter() {
            cmd.arg(format!("--{name}={}", raw_value(value)));
            cmd.env(env_var_name(name), raw_value(value));
        }
        cmd
    }
}

impl Evaluator for CommandEvaluator {
    fn evaluate(&self, config: &Configuration) -> Result<f64, EvaluationError> {
        debug!(program = %self.program.display(), %config, "launching trainer");
        let output = self.command(config).output()?;

        if !output.status.success() {
            return Err(EvaluationError::ExitStatus {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let history = parse_history(&stdout);
        debug!(epochs = history.len(), "trainer finished");
        fitness_from_history(&history, self.empty_history)
    }
}

/// Accuracy history from trainer output: every line that is a single finite float.
#[must_use]
pub fn parse_history(output: &str) -> Vec<f64> {
    output
        .lines()
        .filter_map(|line| line.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .collect()
}

/// `learning_rate` -> `APIARY_LEARNING_RATE`.
#[must_use]
pub fn env_var_name(name: &str) -> String {
    let suffix: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{ENV_PREFIX}{suffix}")
}

/// Full-precision text form (the `Display` impl rounds floats for humans).
fn raw_value(value: &ParamValue) -> String {
    match value {
        ParamValue::Float(v) => v.to_string(),
        ParamValue::Int(v) => v.to_string(),
        ParamValue::Bool(v) => v.to_string(),
        ParamValue::String(v) => v.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fitness_is_last_history_entry() {
        let fitness =
            fitness_from_history(&[0.2, 0.5, 0.4], EmptyHistoryPolicy::Sentinel).expect("fitness");
        assert!((fitness - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_empty_history_sentinel() {
        let fitness = fitness_from_history(&[], EmptyHistoryPolicy::Sentinel).expect("sentinel");
        assert_eq!(fitness, EMPTY_RESULT_FITNESS);
    }

    #[test]
    fn test_empty_history_worst() {
        let fitness = fitness_from_history(&[], EmptyHistoryPolicy::Worst).expect("worst");
        assert_eq!(fitness, f64::NEG_INFINITY);
    }

    #[test]
    fn test_empty_history_fail() {
        let err = fitness_from_history(&[], EmptyHistoryPolicy::Fail).expect_err("must fail");
        assert!(matches!(err, EvaluationError::EmptyHistory));
    }

    #[test]
    fn test_parse_history_skips_noise() {
        let out = "Epoch 1/3\n0.61\nloss: 0.9\n  0.72  \n\n0.78\n";
        assert_eq!(parse_history(out), vec![0.61, 0.72, 0.78]);
    }

    #[test]
    fn test_parse_history_drops_non_finite() {
        let out = "0.5\nnan\ninf\n-infinity\nNaN\n0.7\n";
        assert_eq!(parse_history(out), vec![0.5, 0.7]);
    }

    #[test]
    fn test_parse_history_empty() {
        assert!(parse_history("no numbers here\n").is_empty());
    }

    #[test]
    fn test_env_var_name() {
        assert_eq!(env_var_name("learning_rate"), "APIARY_LEARNING_RATE");
        assert_eq!(env_var_name("batch-size"), "APIARY_BATCH_SIZE");
    }

    #[test]
    fn test_raw_value_keeps_precision() {
        assert_eq!(raw_value(&ParamValue::Float(0.0123456789)), "0.0123456789");
        assert_eq!(raw_value(&ParamValue::from("MP")), "MP");
    }

    #[test]
    fn test_closure_evaluator() {
        let evaluator = |config: &Configuration| -> Result<f64, EvaluationError> {
            config
                .get_f64("x")
                .ok_or_else(|| EvaluationError::InvalidConfiguration("missing x".into()))
        };
        let mut config = Configuration::new();
        assert!(evaluator.evaluate(&config).is_err());
        config.insert("x", ParamValue::Float(0.25));
        assert_eq!(evaluator.evaluate(&config).expect("x"), 0.25);
    }

    #[test]
    fn test_command_builder() {
        let evaluator = CommandEvaluator::new("python3")
            .arg("train.py")
            .args(["--dataset", "pets"])
            .with_empty_history(EmptyHistoryPolicy::Fail);
        assert_eq!(evaluator.args, vec!["train.py", "--dataset", "pets"]);
        assert_eq!(evaluator.empty_history, EmptyHistoryPolicy::Fail);
    }

    #[test]
    fn test_missing_program_is_io_error() {
        let evaluator = CommandEvaluator::new("/nonexistent/apiary-trainer-binary");
        let err = evaluator
            .evaluate(&Configuration::new())
            .expect_err("spawn must fail");
        assert!(matches!(err, EvaluationError::Io(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_reads_last_accuracy() {
        let evaluator = CommandEvaluator::new("sh")
            .arg("-c")
            .arg("echo 0.5; echo epoch done; echo 0.75");
        let fitness = evaluator.evaluate(&Configuration::new()).expect("fitness");
        assert!((fitness - 0.75).abs() < 1e-12);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_receives_hyperparameters_via_env() {
        // sh -c '<script>' passes the --name=value arguments as $0, $1 ...
        // so the value is read back from the environment instead.
        let evaluator = CommandEvaluator::new("sh")
            .arg("-c")
            .arg("echo $APIARY_LEARNING_RATE");
        let mut config = Configuration::new();
        config.insert("learning_rate", ParamValue::Float(0.125));
        let fitness = evaluator.evaluate(&config).expect("fitness");
        assert!((fitness - 0.125).abs() < 1e-12);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_nonzero_exit() {
        let evaluator = CommandEvaluator::new("sh")
            .arg("-c")
            .arg("echo boom >&2; exit 3");
        let err = evaluator
            .evaluate(&Configuration::new())
            .expect_err("exit 3 must fail");
        match err {
            EvaluationError::ExitStatus { code, stderr } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_command_empty_output_uses_policy() {
        let sentinel = CommandEvaluator::new("true");
        assert_eq!(
            sentinel.evaluate(&Configuration::new()).expect("sentinel"),
            EMPTY_RESULT_FITNESS
        );

        let failing = CommandEvaluator::new("true").with_empty_history(EmptyHistoryPolicy::Fail);
        assert!(matches!(
            failing.evaluate(&Configuration::new()),
            Err(EvaluationError::EmptyHistory)
        ));
    }
}
