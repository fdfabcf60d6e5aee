//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use apiary::prelude::*;
//! ```

pub use crate::automl::{
    Configuration, EvaluationError, Evaluator, HyperparameterSpec, ParamValue, ParameterSpace,
};
pub use crate::config::{AbcConfig, ExperimentConfig, StagnationLimit};
pub use crate::error::{AbcError, Result};
pub use crate::metaheuristics::abc::{
    ArtificialBeeColony, Callback, EvaluationMode, RunResult, RunState, SelectionPolicy,
};
