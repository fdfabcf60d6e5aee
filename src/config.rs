//! Run and experiment configuration.
//!
//! [`AbcConfig`] holds the optimizer knobs; [`ExperimentConfig`] bundles it
//! with a search space and the empty-history policy so a whole experiment
//! can be described in one JSON file:
//!
//! ```json
//! {
//!   "abc": { "colony_size": 5, "onlooker_count": 3, "max_generations": 5, "seed": 42 },
//!   "empty_history": "worst"
//! }
//! ```
//!
//! Missing fields fall back to the reference values.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::automl::evaluator::EmptyHistoryPolicy;
use crate::automl::search::ParameterSpace;
use crate::automl::segmentation::reference_space;
use crate::error::{AbcError, Result};
use crate::metaheuristics::abc::{EvaluationMode, SelectionPolicy};

/// Scale factor of the reference stagnation limit.
pub const REFERENCE_LIMIT_FACTOR: f64 = 0.2;

/// Second multiplicand of the reference stagnation limit.
///
/// The reference formula is `round(0.2 * colony_size * colony_size)`; with
/// the reference colony of 5 this constant reproduces it while decoupling it
/// from the colony size.
pub const REFERENCE_LIMIT_DIMENSION: usize = 5;

/// How many rejected updates a food source survives before scouts abandon it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StagnationLimit {
    /// Explicit limit.
    Fixed(usize),
    /// `round(factor * colony_size * dimension)`, ties to even.
    Scaled { factor: f64, dimension: usize },
}

impl Default for StagnationLimit {
    fn default() -> Self {
        Self::Scaled {
            factor: REFERENCE_LIMIT_FACTOR,
            dimension: REFERENCE_LIMIT_DIMENSION,
        }
    }
}

impl StagnationLimit {
    /// Concrete limit for a colony.
    ///
    /// ```
    /// use apiary::config::StagnationLimit;
    ///
    /// assert_eq!(StagnationLimit::default().resolve(5), 5);
    /// assert_eq!(StagnationLimit::default().resolve(10), 10);
    /// assert_eq!(StagnationLimit::Fixed(3).resolve(10), 3);
    /// ```
    #[must_use]
    pub fn resolve(&self, colony_size: usize) -> usize {
        match *self {
            Self::Fixed(limit) => limit,
            Self::Scaled { factor, dimension } => {
                let scaled = factor * colony_size as f64 * dimension as f64;
                if scaled.is_finite() && scaled > 0.0 {
                    scaled.round_ties_even() as usize
                } else {
                    0
                }
            }
        }
    }
}

/// ABC run configuration.
///
/// # Example
///
/// ```
/// use apiary::config::AbcConfig;
/// use apiary::metaheuristics::abc::EvaluationMode;
///
/// let config = AbcConfig::default()
///     .with_max_generations(10)
///     .with_seed(42)
///     .with_evaluation_mode(EvaluationMode::Parallel);
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.stagnation_limit(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbcConfig {
    /// Number of food sources (employed bees).
    pub colony_size: usize,
    /// Onlooker evaluations per generation.
    pub onlooker_count: usize,
    pub max_generations: usize,
    pub stagnation_limit: StagnationLimit,
    /// Random seed; drawn once and stored in the run state if absent.
    pub seed: Option<u64>,
    pub evaluation_mode: EvaluationMode,
    pub selection: SelectionPolicy,
}

impl Default for AbcConfig {
    fn default() -> Self {
        Self {
            colony_size: 5,
            onlooker_count: 3,
            max_generations: 3,
            stagnation_limit: StagnationLimit::default(),
            seed: None,
            evaluation_mode: EvaluationMode::default(),
            selection: SelectionPolicy::default(),
        }
    }
}

impl AbcConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_colony_size(mut self, colony_size: usize) -> Self {
        self.colony_size = colony_size;
        self
    }

    #[must_use]
    pub fn with_onlooker_count(mut self, onlooker_count: usize) -> Self {
        self.onlooker_count = onlooker_count;
        self
    }

    #[must_use]
    pub fn with_max_generations(mut self, max_generations: usize) -> Self {
        self.max_generations = max_generations;
        self
    }

    #[must_use]
    pub fn with_stagnation_limit(mut self, limit: StagnationLimit) -> Self {
        self.stagnation_limit = limit;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_evaluation_mode(mut self, mode: EvaluationMode) -> Self {
        self.evaluation_mode = mode;
        self
    }

    #[must_use]
    pub fn with_selection(mut self, selection: SelectionPolicy) -> Self {
        self.selection = selection;
        self
    }

    /// Resolved stagnation limit for this colony size.
    #[must_use]
    pub fn stagnation_limit(&self) -> usize {
        self.stagnation_limit.resolve(self.colony_size)
    }

    /// Check every option.
    ///
    /// # Errors
    ///
    /// [`AbcError::EmptyPopulation`] for `colony_size < 2`,
    /// [`AbcError::InvalidConfig`] for zero onlookers, at least as many
    /// onlookers as food sources, zero generations, a malformed scaled limit
    /// or a limit resolving to zero.
    pub fn validate(&self) -> Result<()> {
        if self.colony_size < 2 {
            return Err(AbcError::EmptyPopulation {
                colony_size: self.colony_size,
            });
        }
        if self.onlooker_count == 0 {
            return Err(AbcError::invalid_config("onlooker_count", 0, ">= 1"));
        }
        if self.onlooker_count >= self.colony_size {
            return Err(AbcError::invalid_config(
                "onlooker_count",
                self.onlooker_count,
                format!("< colony_size ({})", self.colony_size),
            ));
        }
        if self.max_generations == 0 {
            return Err(AbcError::invalid_config("max_generations", 0, ">= 1"));
        }
        if let StagnationLimit::Scaled { factor, .. } = self.stagnation_limit {
            if !factor.is_finite() || factor < 0.0 {
                return Err(AbcError::invalid_config(
                    "stagnation_limit.factor",
                    factor,
                    "finite and non-negative",
                ));
            }
        }
        if self.stagnation_limit() == 0 {
            return Err(AbcError::invalid_config(
                "stagnation_limit",
                0,
                "resolves to >= 1",
            ));
        }
        Ok(())
    }
}

/// Everything a run needs besides the evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    #[serde(default)]
    pub abc: AbcConfig,
    #[serde(default = "reference_space")]
    pub space: ParameterSpace,
    #[serde(default)]
    pub empty_history: EmptyHistoryPolicy,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            abc: AbcConfig::default(),
            space: reference_space(),
            empty_history: EmptyHistoryPolicy::default(),
        }
    }
}

impl ExperimentConfig {
    /// Read and validate a JSON experiment file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.abc.validate()?;
        Ok(config)
    }

    /// Pretty JSON, as read by [`ExperimentConfig::load`].
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
