//! Error types for apiary operations.
//!
//! Every error aborts the run that produced it. Evaluator failures carry the
//! generation, phase and candidate index so a failed training run can be
//! traced back to the configuration that triggered it.

use thiserror::Error;

use crate::automl::evaluator::EvaluationError;
use crate::metaheuristics::abc::Phase;

/// Result type alias for apiary operations.
pub type Result<T> = std::result::Result<T, AbcError>;

/// Main error type for apiary operations.
///
/// # Examples
///
/// ```
/// use apiary::error::AbcError;
///
/// let err = AbcError::EmptyPopulation { colony_size: 1 };
/// assert!(err.to_string().contains("colony_size = 1"));
/// ```
#[derive(Error, Debug)]
pub enum AbcError {
    /// Malformed hyperparameter definition (`min > max`, empty choices, ...).
    #[error("Invalid hyperparameter spec `{param}`: {reason}")]
    InvalidSpec {
        /// Parameter name
        param: String,
        /// What is wrong with it
        reason: String,
    },

    /// Neighbor selection needs at least two food sources.
    #[error("Colony too small: colony_size = {colony_size}, need at least 2")]
    EmptyPopulation {
        /// Requested colony size
        colony_size: usize,
    },

    /// Invalid run configuration value.
    #[error("Invalid configuration: {param} = {value}, expected {constraint}")]
    InvalidConfig {
        /// Option name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// The external evaluation (a training run) failed. Fatal, never retried.
    #[error("Evaluation failed in generation {generation} ({phase} phase, candidate {candidate}): {source}")]
    EvaluatorFailure {
        /// Generation number (0 = initial population)
        generation: usize,
        /// Phase that issued the evaluation
        phase: Phase,
        /// Index of the food source being evaluated
        candidate: usize,
        /// Underlying evaluator error
        #[source]
        source: EvaluationError,
    },

    /// Checkpoint could not be used to resume a run.
    #[error("Invalid checkpoint: {message}")]
    InvalidCheckpoint {
        /// Error details
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AbcError {
    /// Shorthand for [`AbcError::InvalidSpec`].
    pub(crate) fn invalid_spec(param: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSpec {
            param: param.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`AbcError::InvalidConfig`].
    pub(crate) fn invalid_config(
        param: impl Into<String>,
        value: impl ToString,
        constraint: impl Into<String>,
    ) -> Self {
        Self::InvalidConfig {
            param: param.into(),
            value: value.to_string(),
            constraint: constraint.into(),
        }
    }

    /// Generation in which the run aborted, if the error came from an evaluation.
    #[must_use]
    pub fn generation(&self) -> Option<usize> {
        match self {
            Self::EvaluatorFailure { generation, .. } => Some(*generation),
            _ => None,
        }
    }

    /// Candidate index being evaluated when the run aborted.
    #[must_use]
    pub fn candidate(&self) -> Option<usize> {
        match self {
            Self::EvaluatorFailure { candidate, .. } => Some(*candidate),
            _ => None,
        }
    }
}
