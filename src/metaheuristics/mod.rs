//! Derivative-free global optimization (metaheuristics).
//!
//! Black-box search for problems where each objective evaluation is an
//! opaque, expensive computation such as a full training run.
//!
//! - [`abc`]: Artificial Bee Colony over typed hyperparameter spaces
//!
//! # Example: Hyperparameter Optimization
//!
//! ```
//! use apiary::automl::{Configuration, EvaluationError, HyperparameterSpec, ParameterSpace};
//! use apiary::config::AbcConfig;
//! use apiary::metaheuristics::ArtificialBeeColony;
//!
//! let space = ParameterSpace::new(vec![
//!     HyperparameterSpec::continuous("learning_rate", 1e-5, 1e-1),
//!     HyperparameterSpec::continuous("weight_decay", 1e-6, 1e-2),
//! ])
//! .unwrap();
//!
//! // Simulated validation accuracy
//! let objective = |config: &Configuration| -> Result<f64, EvaluationError> {
//!     let lr = config.get_f64("learning_rate").unwrap_or(0.0);
//!     let wd = config.get_f64("weight_decay").unwrap_or(0.0);
//!     Ok(1.0 - (lr - 0.01).powi(2) - (wd - 0.001).powi(2))
//! };
//!
//! let config = AbcConfig::default().with_max_generations(20).with_seed(42);
//! let mut abc = ArtificialBeeColony::new(space, config).unwrap();
//! let result = abc.run(&objective).unwrap();
//!
//! assert!(result.best_fitness > 0.99);
//! ```

pub mod abc;

pub use abc::{
    ArtificialBeeColony, BestSolution, Callback, EvaluationMode, Phase, RunResult, RunState,
    RunStatus,
};
