//! Hyperparameter search space.
//!
//! A [`ParameterSpace`] is an ordered list of [`HyperparameterSpec`]s, one per
//! tunable dimension. Each dimension is continuous, integer or categorical and
//! owns its sampling and clamping rule. A [`Configuration`] assigns one value
//! to every dimension.
//!
//! # Sampling rules
//!
//! | Kind        | Sample                                   | Clamp                    |
//! |-------------|------------------------------------------|--------------------------|
//! | Continuous  | `min + (max - min) * U[0,1)`             | max-bound, then min-bound|
//! | Integer     | `round((max - min) * U[0,1))`, clamped   | max-bound, then min-bound|
//! | Categorical | uniform over `choices`                   | never (resampled instead)|
//!
//! The integer draw is not offset by `min`, so with `min > 0` the low end of
//! the range is over-represented (every raw draw below `min` lands on `min`).

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{AbcError, Result};

/// A concrete parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
}

impl ParamValue {
    /// Get as f64 if numeric.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Get as i64 if integer.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// Get as bool.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        Self::Int(v as i64)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v:.6}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v}"),
        }
    }
}

/// Type and bounds of one tunable dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamKind {
    /// Real-valued parameter in `[min, max]`.
    Continuous { min: f64, max: f64 },
    /// Whole-number parameter in `[min, max]`.
    Integer { min: i64, max: i64 },
    /// One of an ordered set of allowed values.
    Categorical { choices: Vec<ParamValue> },
}

/// Definition of a single tunable hyperparameter.
///
/// # Example
///
/// ```
/// use apiary::automl::{HyperparameterSpec, ParamValue};
///
/// let epochs = HyperparameterSpec::integer("epochs", 1, 11);
/// assert_eq!(epochs.clamp(ParamValue::Int(40)), ParamValue::Int(11));
/// assert_eq!(epochs.clamp(ParamValue::Int(0)), ParamValue::Int(1));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperparameterSpec {
    /// Parameter name (unique within a space).
    pub name: String,
    /// Type and bounds.
    #[serde(flatten)]
    pub kind: ParamKind,
}

impl HyperparameterSpec {
    /// Create a continuous parameter.
    #[must_use]
    pub fn continuous(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Continuous { min, max },
        }
    }

    /// Create an integer parameter.
    #[must_use]
    pub fn integer(name: impl Into<String>, min: i64, max: i64) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Integer { min, max },
        }
    }

    /// Create a categorical parameter from choices.
    #[must_use]
    pub fn categorical<I, V>(name: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        Self {
            name: name.into(),
            kind: ParamKind::Categorical {
                choices: choices.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// Check the dimension invariants: `min <= max`, finite bounds, non-empty choices.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AbcError::invalid_spec(&self.name, "name must not be empty"));
        }
        match &self.kind {
            ParamKind::Continuous { min, max } => {
                if !min.is_finite() || !max.is_finite() {
                    return Err(AbcError::invalid_spec(
                        &self.name,
                        format!("bounds must be finite, got [{min}, {max}]"),
                    ));
                }
                if min > max {
                    return Err(AbcError::invalid_spec(
                        &self.name,
                        format!("min {min} > max {max}"),
                    ));
                }
            }
            ParamKind::Integer { min, max } => {
                if min > max {
                    return Err(AbcError::invalid_spec(
                        &self.name,
                        format!("min {min} > max {max}"),
                    ));
                }
            }
            ParamKind::Categorical { choices } => {
                if choices.is_empty() {
                    return Err(AbcError::invalid_spec(&self.name, "choices must not be empty"));
                }
            }
        }
        Ok(())
    }

    /// Whether this dimension takes part in the arithmetic neighbor perturbation.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        !matches!(self.kind, ParamKind::Categorical { .. })
    }

    /// Draw a fresh value for this dimension.
    pub fn sample(&self, rng: &mut impl Rng) -> ParamValue {
        match &self.kind {
            ParamKind::Continuous { min, max } => {
                ParamValue::Float((min + (max - min) * rng.random::<f64>()).min(*max))
            }
            ParamKind::Integer { min, max } => {
                let span = *max as f64 - *min as f64;
                let raw = (span * rng.random::<f64>()).round_ties_even() as i64;
                ParamValue::Int(clamp_i64(raw, *min, *max))
            }
            ParamKind::Categorical { choices } => {
                choices[rng.random_range(0..choices.len())].clone()
            }
        }
    }

    /// Bound a value to `[min, max]`, applying the max-bound first.
    ///
    /// Categorical values are returned unchanged.
    #[must_use]
    pub fn clamp(&self, value: ParamValue) -> ParamValue {
        match &self.kind {
            ParamKind::Continuous { min, max } => match value.as_f64() {
                Some(v) => ParamValue::Float(v.min(*max).max(*min)),
                None => value,
            },
            ParamKind::Integer { min, max } => match value {
                ParamValue::Int(v) => ParamValue::Int(clamp_i64(v, *min, *max)),
                ParamValue::Float(v) => {
                    ParamValue::Int(clamp_i64(v.round_ties_even() as i64, *min, *max))
                }
                other => other,
            },
            ParamKind::Categorical { .. } => value,
        }
    }

    /// Whether `value` lies within this dimension's bounds or choices.
    #[must_use]
    pub fn contains(&self, value: &ParamValue) -> bool {
        match (&self.kind, value) {
            (ParamKind::Continuous { min, max }, ParamValue::Float(v)) => *min <= *v && *v <= *max,
            (ParamKind::Integer { min, max }, ParamValue::Int(v)) => min <= v && v <= max,
            (ParamKind::Categorical { choices }, v) => choices.contains(v),
            _ => false,
        }
    }
}

fn clamp_i64(value: i64, min: i64, max: i64) -> i64 {
    value.min(max).max(min)
}

/// Ordered, validated set of hyperparameter definitions.
///
/// # Example
///
/// ```
/// use apiary::automl::{HyperparameterSpec, ParameterSpace};
/// use rand::{rngs::StdRng, SeedableRng};
///
/// let space = ParameterSpace::new(vec![
///     HyperparameterSpec::continuous("learning_rate", 0.001, 0.1),
///     HyperparameterSpec::integer("epochs", 1, 11),
///     HyperparameterSpec::categorical("batch_size", [32, 64, 128, 256]),
/// ])
/// .unwrap();
///
/// let mut rng = StdRng::seed_from_u64(42);
/// let config = space.sample(&mut rng);
/// assert!(space.contains(&config));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<HyperparameterSpec>", into = "Vec<HyperparameterSpec>")]
pub struct ParameterSpace {
    specs: Vec<HyperparameterSpec>,
}

impl ParameterSpace {
    /// Build a space, validating every spec and rejecting duplicate names.
    pub fn new(specs: Vec<HyperparameterSpec>) -> Result<Self> {
        if specs.is_empty() {
            return Err(AbcError::invalid_spec(
                "<space>",
                "at least one hyperparameter is required",
            ));
        }
        for (i, spec) in specs.iter().enumerate() {
            spec.validate()?;
            if specs[..i].iter().any(|s| s.name == spec.name) {
                return Err(AbcError::invalid_spec(&spec.name, "duplicate name"));
            }
        }
        Ok(Self { specs })
    }

    /// Build a space from specs known to be valid at compile time.
    pub(crate) fn from_trusted(specs: Vec<HyperparameterSpec>) -> Self {
        debug_assert!(Self::new(specs.clone()).is_ok());
        Self { specs }
    }

    /// Number of dimensions.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.specs.len()
    }

    /// Number of continuous and integer dimensions.
    #[must_use]
    pub fn numeric_dimensions(&self) -> usize {
        self.specs.iter().filter(|s| s.is_numeric()).count()
    }

    /// Definitions in declaration order.
    #[must_use]
    pub fn specs(&self) -> &[HyperparameterSpec] {
        &self.specs
    }

    /// Iterate over definitions in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &HyperparameterSpec> {
        self.specs.iter()
    }

    /// Look a definition up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HyperparameterSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// Draw every dimension independently.
    pub fn sample(&self, rng: &mut impl Rng) -> Configuration {
        let values = self
            .specs
            .iter()
            .map(|spec| (spec.name.clone(), spec.sample(rng)))
            .collect();
        Configuration { values }
    }

    /// Bound `value` to the limits of `spec`.
    #[must_use]
    pub fn clamp(&self, spec: &HyperparameterSpec, value: ParamValue) -> ParamValue {
        spec.clamp(value)
    }

    /// Whether `config` assigns an in-bounds value to every dimension and nothing else.
    #[must_use]
    pub fn contains(&self, config: &Configuration) -> bool {
        config.len() == self.specs.len()
            && self
                .specs
                .iter()
                .all(|spec| config.get(&spec.name).is_some_and(|v| spec.contains(v)))
    }
}

impl TryFrom<Vec<HyperparameterSpec>> for ParameterSpace {
    type Error = AbcError;

    fn try_from(specs: Vec<HyperparameterSpec>) -> Result<Self> {
        Self::new(specs)
    }
}

impl From<ParameterSpace> for Vec<HyperparameterSpec> {
    fn from(space: ParameterSpace) -> Self {
        space.specs
    }
}

/// One candidate hyperparameter assignment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration {
    values: BTreeMap<String, ParamValue>,
}

impl Configuration {
    /// Create an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, returning the previous one.
    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) -> Option<ParamValue> {
        self.values.insert(name.into(), value)
    }

    /// Get a parameter value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// Get parameter as f64.
    #[must_use]
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(ParamValue::as_f64)
    }

    /// Get parameter as i64.
    #[must_use]
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(ParamValue::as_i64)
    }

    /// Get parameter as usize.
    #[must_use]
    pub fn get_usize(&self, name: &str) -> Option<usize> {
        self.get_i64(name).and_then(|v| usize::try_from(v).ok())
    }

    /// Get parameter as string.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(ParamValue::as_str)
    }

    /// Number of assigned parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if no parameter is assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, ParamValue)> for Configuration {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{{{}}}", params.join(", "))
    }
}

#[cfg(test)]
mod tests;

#[cfg(test)]
mod tests_proptests;
