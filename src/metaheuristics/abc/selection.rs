//! Fitness-proportionate onlooker selection.
//!
//! Weights are `F[i] = exp(-f[i] / mean(f))` and the roulette wheel is their
//! normalized cumulative sum. The negative exponent gives *more* mass to
//! low-fitness food sources, the opposite of textbook ABC; it is kept as the
//! default and [`FitnessWeighting::Exponential`] offers the conventional
//! orientation.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::metaheuristics::abc::population::Population;

/// Mapping from fitness to roulette weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessWeighting {
    /// `exp(-f / mean)`
    #[default]
    InverseExponential,
    /// `exp(f / mean)`
    Exponential,
}

/// How the wheel resolves a uniform draw `r`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouletteRule {
    /// Scan every slot without breaking; the last `m` with `r <= P[m]` wins,
    /// mapped back to the first index holding the same cumulative value.
    /// Since `P` is non-decreasing and `P[last] == 1`, this nearly always
    /// lands on the last slot (or the first slot of a trailing tie run).
    #[default]
    LastMatch,
    /// Smallest `m` with `r <= P[m]`.
    FirstMatch,
}

/// Onlooker selection policy.
///
/// # Example
///
/// ```
/// use apiary::metaheuristics::abc::{RouletteRule, SelectionPolicy};
///
/// let policy = SelectionPolicy::new();
/// let p = policy.cumulative_from_fitness(&[0.2, 0.4, 0.6]);
/// assert!((p[2] - 1.0).abs() < 1e-12);
/// assert_eq!(policy.select_with(&p, 0.1), 2);
///
/// let first = SelectionPolicy::new().with_rule(RouletteRule::FirstMatch);
/// assert_eq!(first.select_with(&p, 0.1), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionPolicy {
    pub weighting: FitnessWeighting,
    pub rule: RouletteRule,
}

impl SelectionPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_weighting(mut self, weighting: FitnessWeighting) -> Self {
        self.weighting = weighting;
        self
    }

    #[must_use]
    pub fn with_rule(mut self, rule: RouletteRule) -> Self {
        self.rule = rule;
        self
    }

    /// Unnormalized roulette weights.
    ///
    /// Falls back to uniform weights when the mean fitness is zero or not
    /// finite, or when the weights overflow.
    #[must_use]
    pub fn weights(&self, fitness: &[f64]) -> Vec<f64> {
        let uniform = vec![1.0; fitness.len()];
        if fitness.is_empty() {
            return uniform;
        }
        let mean = fitness.iter().sum::<f64>() / fitness.len() as f64;
        if mean == 0.0 || !mean.is_finite() {
            return uniform;
        }
        let sign = match self.weighting {
            FitnessWeighting::InverseExponential => -1.0,
            FitnessWeighting::Exponential => 1.0,
        };
        let weights: Vec<f64> = fitness.iter().map(|f| (sign * f / mean).exp()).collect();
        let total: f64 = weights.iter().sum();
        if total.is_finite() && total > 0.0 {
            weights
        } else {
            uniform
        }
    }

    /// Cumulative selection probabilities `P[i] = sum(F[0..=i]) / sum(F)`.
    #[must_use]
    pub fn cumulative_from_fitness(&self, fitness: &[f64]) -> Vec<f64> {
        let weights = self.weights(fitness);
        let total: f64 = weights.iter().sum();
        let mut acc = 0.0;
        weights
            .iter()
            .map(|w| {
                acc += w / total;
                acc
            })
            .collect()
    }

    /// Cumulative selection probabilities over the current population.
    #[must_use]
    pub fn cumulative_probabilities(&self, population: &Population) -> Vec<f64> {
        self.cumulative_from_fitness(&population.fitness_values())
    }

    /// Spin the wheel.
    pub fn select(&self, cumulative: &[f64], rng: &mut impl Rng) -> usize {
        let r = rng.random::<f64>();
        self.select_with(cumulative, r)
    }

    /// Resolve a given draw `r`.
    ///
    /// When no slot satisfies `r <= P[m]` (rounding left `P[last]` just
    /// below `r`), the last index is returned.
    #[must_use]
    pub fn select_with(&self, cumulative: &[f64], r: f64) -> usize {
        let fallback = cumulative.len().saturating_sub(1);
        match self.rule {
            RouletteRule::FirstMatch => cumulative.iter().position(|p| r <= *p).unwrap_or(fallback),
            RouletteRule::LastMatch => {
                let mut selected = fallback;
                for (m, p) in cumulative.iter().enumerate() {
                    if r <= *p {
                        selected = cumulative.iter().position(|q| q == p).unwrap_or(m);
                    }
                }
                selected
            }
        }
    }
}
