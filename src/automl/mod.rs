//! Hyperparameter search surface for black-box training runs.
//!
//! - [`search`]: typed search spaces and configurations
//! - [`evaluator`]: turning a configuration into a fitness (one training run)
//! - [`segmentation`]: the U-Net segmentation trainer's reference space
//!
//! # Example
//!
//! ```
//! use apiary::automl::{Configuration, Evaluator, EvaluationError, HyperparameterSpec, ParameterSpace};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let space = ParameterSpace::new(vec![
//!     HyperparameterSpec::continuous("learning_rate", 0.001, 0.1),
//!     HyperparameterSpec::integer("epochs", 1, 11),
//! ])
//! .unwrap();
//!
//! let evaluator = |config: &Configuration| -> Result<f64, EvaluationError> {
//!     Ok(1.0 - config.get_f64("learning_rate").unwrap_or(0.0))
//! };
//!
//! let config = space.sample(&mut StdRng::seed_from_u64(7));
//! assert!(evaluator.evaluate(&config).unwrap() > 0.8);
//! ```

pub mod evaluator;
pub mod search;
pub mod segmentation;

pub use evaluator::{
    env_var_name, fitness_from_history, parse_history, CommandEvaluator, EmptyHistoryPolicy,
    EvaluationError, Evaluator, EMPTY_RESULT_FITNESS, ENV_PREFIX,
};
pub use search::{Configuration, HyperparameterSpec, ParamKind, ParamValue, ParameterSpace};
pub use segmentation::{
    reference_space, PoolingType, SegmentationHyperparams, SyntheticSegmentationEvaluator,
};
