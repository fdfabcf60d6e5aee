//! Error types for the apiary CLI.

use std::process::ExitCode;

use apiary::AbcError;
use thiserror::Error;

pub(crate) type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub(crate) enum CliError {
    /// Neither `--synthetic` nor a trainer command was given
    #[error("No evaluator: pass --synthetic or a trainer command after `--`")]
    NoEvaluator,

    /// Both evaluators were requested
    #[error("--synthetic cannot be combined with a trainer command")]
    ConflictingEvaluators,

    #[error("{0}")]
    Search(#[from] AbcError),
}

impl CliError {
    /// Get exit code for this error
    pub(crate) fn exit_code(&self) -> ExitCode {
        match self {
            Self::NoEvaluator | Self::ConflictingEvaluators => ExitCode::from(2),
            Self::Search(err) => match err {
                AbcError::InvalidSpec { .. }
                | AbcError::InvalidConfig { .. }
                | AbcError::EmptyPopulation { .. } => ExitCode::from(3),
                AbcError::EvaluatorFailure { .. } => ExitCode::from(4),
                AbcError::InvalidCheckpoint { .. } => ExitCode::from(5),
                AbcError::Io(_) => ExitCode::from(7),
                _ => ExitCode::from(1),
            },
        }
    }
}
