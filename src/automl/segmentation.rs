//! Hyperparameter surface of the U-Net segmentation trainer.
//!
//! The trainer itself (encoder-decoder network, Oxford-IIIT pet data
//! pipeline, Adam training loop) lives outside this crate. This module only
//! defines what the optimizer tunes and how a [`Configuration`] decodes into
//! trainer inputs.
//!
//! | Parameter       | Kind        | Reference range       |
//! |-----------------|-------------|-----------------------|
//! | `learning_rate` | continuous  | `[0.001, 0.1]`        |
//! | `epochs`        | integer     | `[1, 11]`             |
//! | `dropout_rate`  | continuous  | `[0.001, 0.1]`        |
//! | `batch_size`    | categorical | `{32, 64, 128, 256}`  |
//! | `pooling_type`  | categorical | `{MP, AP}`            |

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

use crate::automl::evaluator::{
    fitness_from_history, EmptyHistoryPolicy, EvaluationError, Evaluator,
};
use crate::automl::search::{Configuration, HyperparameterSpec, ParameterSpace};

/// Adam learning rate.
pub const LEARNING_RATE: &str = "learning_rate";
/// Number of training epochs.
pub const EPOCHS: &str = "epochs";
/// Dropout applied after every down/up-sampling block.
pub const DROPOUT_RATE: &str = "dropout_rate";
/// Mini-batch size.
pub const BATCH_SIZE: &str = "batch_size";
/// Down-sampling pooling operator.
pub const POOLING_TYPE: &str = "pooling_type";

/// Allowed batch sizes in the reference search.
pub const REFERENCE_BATCH_SIZES: [i64; 4] = [32, 64, 128, 256];

/// The five-dimensional reference search space.
///
/// ```
/// let space = apiary::automl::segmentation::reference_space();
/// assert_eq!(space.dimension(), 5);
/// assert_eq!(space.numeric_dimensions(), 3);
/// ```
#[must_use]
pub fn reference_space() -> ParameterSpace {
    ParameterSpace::from_trusted(vec![
        HyperparameterSpec::continuous(LEARNING_RATE, 0.001, 0.1),
        HyperparameterSpec::integer(EPOCHS, 1, 11),
        HyperparameterSpec::continuous(DROPOUT_RATE, 0.001, 0.1),
        HyperparameterSpec::categorical(BATCH_SIZE, REFERENCE_BATCH_SIZES),
        HyperparameterSpec::categorical(
            POOLING_TYPE,
            [PoolingType::Max.as_str(), PoolingType::Average.as_str()],
        ),
    ])
}

/// Pooling operator of the encoder's down-sampling blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolingType {
    /// Max pooling (`"MP"`)
    #[serde(rename = "MP")]
    Max,
    /// Average pooling (`"AP"`)
    #[serde(rename = "AP")]
    Average,
}

impl PoolingType {
    /// Short code used in configurations.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Max => "MP",
            Self::Average => "AP",
        }
    }
}

impl FromStr for PoolingType {
    type Err = EvaluationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MP" => Ok(Self::Max),
            "AP" => Ok(Self::Average),
            other => Err(EvaluationError::InvalidConfiguration(format!(
                "unknown pooling type `{other}`"
            ))),
        }
    }
}

impl fmt::Display for PoolingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed trainer inputs decoded from a [`Configuration`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentationHyperparams {
    pub learning_rate: f64,
    pub epochs: usize,
    pub dropout_rate: f64,
    pub batch_size: usize,
    pub pooling: PoolingType,
}

impl SegmentationHyperparams {
    /// Decode the five reference parameters.
    pub fn from_configuration(config: &Configuration) -> Result<Self, EvaluationError> {
        Ok(Self {
            learning_rate: require(config.get_f64(LEARNING_RATE), LEARNING_RATE)?,
            epochs: require(config.get_usize(EPOCHS), EPOCHS)?,
            dropout_rate: require(config.get_f64(DROPOUT_RATE), DROPOUT_RATE)?,
            batch_size: require(config.get_usize(BATCH_SIZE), BATCH_SIZE)?,
            pooling: require(config.get_str(POOLING_TYPE), POOLING_TYPE)?.parse()?,
        })
    }
}

fn require<T>(value: Option<T>, name: &str) -> Result<T, EvaluationError> {
    value.ok_or_else(|| {
        EvaluationError::InvalidConfiguration(format!("missing or mistyped `{name}`"))
    })
}

/// Cheap, deterministic stand-in for U-Net training.
///
/// Produces one accuracy value per epoch on a smooth surface that peaks
/// around `learning_rate = 0.01`, many epochs, low dropout, batch size 64 and
/// max pooling. Accuracies lie in `[0.55, 0.95]`. Zero epochs yield an empty
/// history, resolved through the configured [`EmptyHistoryPolicy`].
///
/// # Example
///
/// ```
/// use apiary::automl::segmentation::{reference_space, SyntheticSegmentationEvaluator};
/// use apiary::automl::Evaluator;
/// use rand::{rngs::StdRng, SeedableRng};
///
/// let evaluator = SyntheticSegmentationEvaluator::new();
/// let config = reference_space().sample(&mut StdRng::seed_from_u64(1));
/// let accuracy = evaluator.evaluate(&config).unwrap();
/// assert!((0.55..=0.95).contains(&accuracy));
/// assert_eq!(evaluator.evaluations(), 1);
/// ```
#[derive(Debug, Default)]
pub struct SyntheticSegmentationEvaluator {
    empty_history: EmptyHistoryPolicy,
    evaluations: AtomicUsize,
}

impl SyntheticSegmentationEvaluator {
    /// Create an evaluator with the sentinel empty-history policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the empty-history policy.
    #[must_use]
    pub fn with_empty_history(mut self, policy: EmptyHistoryPolicy) -> Self {
        self.empty_history = policy;
        self
    }

    /// Number of evaluations served so far.
    #[must_use]
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }

    /// Per-epoch accuracy history for `params`.
    #[must_use]
    pub fn history(params: &SegmentationHyperparams) -> Vec<f64> {
        let lr_distance = (params.learning_rate.ln() - 0.01_f64.ln()) / 0.8;
        let lr_term = (-0.5 * lr_distance * lr_distance).exp();
        let dropout_term = 1.0 - 2.0 * params.dropout_rate.clamp(0.0, 0.5);
        let batch_term = match params.batch_size {
            32 => 0.97,
            64 => 1.0,
            128 => 0.98,
            256 => 0.95,
            _ => 0.9,
        };
        let pooling_term = match params.pooling {
            PoolingType::Max => 1.0,
            PoolingType::Average => 0.98,
        };
        let quality = lr_term * dropout_term * batch_term * pooling_term;

        (1..=params.epochs)
            .map(|epoch| {
                let progress = 1.0 - (-(epoch as f64) / 4.0).exp();
                0.55 + 0.4 * quality * progress
            })
            .collect()
    }
}

impl Evaluator for SyntheticSegmentationEvaluator {
    fn evaluate(&self, config: &Configuration) -> Result<f64, EvaluationError> {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        let params = SegmentationHyperparams::from_configuration(config)?;
        fitness_from_history(&Self::history(&params), self.empty_history)
    }
}
