//! Apiary: Artificial Bee Colony hyperparameter search in pure Rust.
//!
//! Apiary tunes the hyperparameters of expensive training runs (a U-Net
//! segmentation trainer in the reference setup) with the Artificial Bee
//! Colony metaheuristic. Each evaluation is one opaque training run that
//! returns a scalar fitness, so the search loop itself is deterministic,
//! checkpointable and careful never to waste an evaluation.
//!
//! # Quick Start
//!
//! ```
//! use apiary::prelude::*;
//! use apiary::automl::segmentation::{reference_space, SyntheticSegmentationEvaluator};
//!
//! let config = AbcConfig::default().with_max_generations(3).with_seed(42);
//! let mut abc = ArtificialBeeColony::new(reference_space(), config).unwrap();
//!
//! let result = abc.run(&SyntheticSegmentationEvaluator::new()).unwrap();
//! assert_eq!(result.generations(), 3);
//! assert!(result.best_fitness > 0.55);
//! println!("best {} -> {:.4}", result.best_configuration, result.best_fitness);
//! ```
//!
//! # Modules
//!
//! - [`automl`]: Search spaces, configurations and evaluators
//! - [`metaheuristics`]: The ABC optimizer, selection, recording and checkpoints
//! - [`config`]: Run and experiment configuration
//! - [`error`]: Error types

pub mod automl;
pub mod config;
pub mod error;
pub mod metaheuristics;
pub mod prelude;

pub use error::{AbcError, Result};
