//! Food sources and their bookkeeping.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

use crate::automl::search::{Configuration, ParamValue, ParameterSpace};
use crate::error::{AbcError, Result};

/// One food source: a configuration, its fitness and how long it has failed
/// to improve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Current hyperparameter assignment.
    pub configuration: Configuration,
    /// Fitness of `configuration`, `None` until first evaluated.
    pub fitness: Option<f64>,
    /// Consecutive rejected updates.
    pub stagnation_count: usize,
}

impl Candidate {
    /// Fresh, unevaluated candidate.
    #[must_use]
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            fitness: None,
            stagnation_count: 0,
        }
    }

    /// Fitness used in comparisons; unevaluated counts as worst.
    #[must_use]
    pub fn score(&self) -> f64 {
        self.fitness.unwrap_or(f64::NEG_INFINITY)
    }

    /// Greedy acceptance: take `trial` iff `fitness` is strictly better.
    ///
    /// Returns whether the trial was accepted. A rejection bumps the
    /// stagnation counter, an acceptance resets it.
    ///
    /// ```
    /// use apiary::automl::Configuration;
    /// use apiary::metaheuristics::abc::Candidate;
    ///
    /// let mut candidate = Candidate::new(Configuration::new());
    /// candidate.fitness = Some(0.5);
    ///
    /// assert!(!candidate.consider(Configuration::new(), 0.5));
    /// assert_eq!(candidate.stagnation_count, 1);
    /// assert!(candidate.consider(Configuration::new(), 0.6));
    /// assert_eq!(candidate.stagnation_count, 0);
    /// ```
    pub fn consider(&mut self, trial: Configuration, fitness: f64) -> bool {
        if fitness > self.score() {
            self.configuration = trial;
            self.fitness = Some(fitness);
            self.stagnation_count = 0;
            true
        } else {
            self.stagnation_count += 1;
            false
        }
    }

    /// Replace unconditionally (initialization and scouts).
    pub fn reset(&mut self, configuration: Configuration, fitness: f64) {
        self.configuration = configuration;
        self.fitness = Some(fitness);
        self.stagnation_count = 0;
    }
}

/// Fixed-size, index-stable colony of food sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Population {
    candidates: Vec<Candidate>,
}

impl Population {
    /// Sample `colony_size` unevaluated candidates from `space`.
    ///
    /// # Errors
    ///
    /// [`AbcError::EmptyPopulation`] when `colony_size < 2`, since neighbor
    /// selection needs a second food source.
    pub fn initialize(
        space: &ParameterSpace,
        colony_size: usize,
        rng: &mut impl Rng,
    ) -> Result<Self> {
        if colony_size < 2 {
            return Err(AbcError::EmptyPopulation { colony_size });
        }
        let candidates = (0..colony_size)
            .map(|_| Candidate::new(space.sample(rng)))
            .collect();
        Ok(Self { candidates })
    }

    /// Build from existing candidates.
    ///
    /// # Errors
    ///
    /// [`AbcError::EmptyPopulation`] for fewer than two candidates.
    pub fn from_candidates(candidates: Vec<Candidate>) -> Result<Self> {
        if candidates.len() < 2 {
            return Err(AbcError::EmptyPopulation {
                colony_size: candidates.len(),
            });
        }
        Ok(Self { candidates })
    }

    /// Colony size.
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Always false for a constructed population.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    #[must_use]
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Candidate> {
        self.candidates.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }

    /// Fitness of every candidate, unevaluated ones as `NaN`.
    #[must_use]
    pub fn fitness_values(&self) -> Vec<f64> {
        self.candidates
            .iter()
            .map(|c| c.fitness.unwrap_or(f64::NAN))
            .collect()
    }

    /// Uniform random index different from `exclude`.
    ///
    /// Redraws until distinct; the two-candidate minimum enforced at
    /// construction guarantees termination.
    pub fn neighbor_index(&self, exclude: usize, rng: &mut impl Rng) -> usize {
        loop {
            let k = rng.random_range(0..self.candidates.len());
            if k != exclude {
                return k;
            }
        }
    }

    /// Neighbor trial for candidate `i` against candidate `k`.
    ///
    /// A single `phi ~ U[-1, 1)` is drawn per call and shared by every numeric
    /// dimension: `v = x_i + phi * (x_i - x_k)`, then rounded (integers) and
    /// clamped. Categorical dimensions are resampled uniformly.
    pub fn perturb(
        &self,
        space: &ParameterSpace,
        i: usize,
        k: usize,
        rng: &mut impl Rng,
    ) -> Configuration {
        let phi = rng.random::<f64>() * 2.0 - 1.0;
        let own = &self.candidates[i].configuration;
        let neighbor = &self.candidates[k].configuration;

        let mut trial = Configuration::new();
        for spec in space.iter() {
            let value = if spec.is_numeric() {
                match (own.get_f64(&spec.name), neighbor.get_f64(&spec.name)) {
                    (Some(xi), Some(xk)) => spec.clamp(ParamValue::Float(xi + phi * (xi - xk))),
                    _ => spec.sample(rng),
                }
            } else {
                spec.sample(rng)
            };
            trial.insert(spec.name.clone(), value);
        }
        trial
    }

    /// Apply the greedy acceptance rule to candidate `index`.
    pub fn consider(&mut self, index: usize, trial: Configuration, fitness: f64) -> bool {
        self.candidates[index].consider(trial, fitness)
    }

    /// Unconditionally replace candidate `index`.
    pub fn reset(&mut self, index: usize, configuration: Configuration, fitness: f64) {
        self.candidates[index].reset(configuration, fitness);
    }

    /// Indices whose stagnation counter reached `limit`.
    #[must_use]
    pub fn stagnant(&self, limit: usize) -> Vec<usize> {
        self.candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.stagnation_count >= limit)
            .map(|(i, _)| i)
            .collect()
    }

    /// Index of the fittest candidate (first on ties).
    #[must_use]
    pub fn best_index(&self) -> usize {
        let mut best = 0;
        for (i, c) in self.candidates.iter().enumerate().skip(1) {
            if c.score() > self.candidates[best].score() {
                best = i;
            }
        }
        best
    }

    /// Column-wise copy of the population.
    #[must_use]
    pub fn snapshot(&self, space: &ParameterSpace) -> PopulationSnapshot {
        let values = space
            .iter()
            .map(|spec| {
                let column = self
                    .candidates
                    .iter()
                    .map(|c| {
                        c.configuration
                            .get(&spec.name)
                            .cloned()
                            .unwrap_or_else(|| ParamValue::String(String::new()))
                    })
                    .collect();
                (spec.name.clone(), column)
            })
            .collect();
        PopulationSnapshot {
            values,
            fitness: self.candidates.iter().map(|c| c.fitness).collect(),
            stagnation: self.candidates.iter().map(|c| c.stagnation_count).collect(),
        }
    }
}

/// Per-dimension value arrays of a population at a generation boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationSnapshot {
    /// Parameter name to one value per candidate.
    pub values: BTreeMap<String, Vec<ParamValue>>,
    pub fitness: Vec<Option<f64>>,
    pub stagnation: Vec<usize>,
}

impl PopulationSnapshot {
    /// Values of one dimension across the colony.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[ParamValue]> {
        self.values.get(name).map(Vec::as_slice)
    }
}

/// JSON has no infinities; scores written as `null` read back as worst.
pub(crate) fn deserialize_score<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NEG_INFINITY))
}
