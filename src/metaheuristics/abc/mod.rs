//! Artificial Bee Colony (ABC) hyperparameter search.
//!
//! A colony of `colony_size` food sources (candidate configurations) is
//! refined generation by generation:
//!
//! 1. **Employed bees**: every food source `i` is perturbed against a random
//!    neighbor `k != i` and greedily replaced if the trial scores strictly
//!    better.
//! 2. **Onlooker bees**: `onlooker_count` food sources are picked by roulette
//!    over the post-employed fitness and perturbed the same way.
//! 3. **Scout bees**: food sources whose stagnation counter reached the limit
//!    are abandoned and resampled; the new fitness is taken unconditionally.
//!
//! The global best is a running maximum over every fitness the population
//! has held, so the recorded best never decreases.
//!
//! # Reproducibility
//!
//! The initial population is drawn from `StdRng::seed_from_u64(seed)` and
//! generation `g` from `StdRng::seed_from_u64(seed + g)`. A run resumed from
//! a checkpoint therefore continues exactly as the uninterrupted run would.
//! [`EvaluationMode::Parallel`] consumes randomness in the same order as
//! sequential mode, but every trial of a phase is drawn from the pre-phase
//! population.
//!
//! # Example
//!
//! ```
//! use apiary::automl::segmentation::{reference_space, SyntheticSegmentationEvaluator};
//! use apiary::config::AbcConfig;
//! use apiary::metaheuristics::abc::ArtificialBeeColony;
//!
//! let config = AbcConfig::default().with_max_generations(4).with_seed(7);
//! let mut abc = ArtificialBeeColony::new(reference_space(), config).unwrap();
//!
//! let evaluator = SyntheticSegmentationEvaluator::new();
//! let result = abc.run(&evaluator).unwrap();
//!
//! assert_eq!(result.records.len(), 4);
//! assert_eq!(result.evaluations.total(), evaluator.evaluations());
//! assert!(result.records.windows(2).all(|w| w[0].best_fitness_so_far <= w[1].best_fitness_so_far));
//! ```
//!
//! # References
//!
//! - Karaboga (2005): An Idea Based on Honey Bee Swarm for Numerical Optimization
//! - Karaboga & Basturk (2007): A powerful and efficient algorithm for numerical
//!   function optimization: artificial bee colony (ABC) algorithm

mod callback;
mod checkpoint;
mod population;
mod recorder;
mod selection;

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::automl::evaluator::{EvaluationError, Evaluator};
use crate::automl::search::{Configuration, ParameterSpace};
use crate::config::AbcConfig;
use crate::error::{AbcError, Result};

pub use callback::{Callback, CheckpointCallback, EvaluationEvent, ProgressCallback};
pub use checkpoint::{Checkpoint, CHECKPOINT_FORMAT_VERSION};
pub use population::{Candidate, Population, PopulationSnapshot};
pub use recorder::{EvaluationStats, GenerationRecord, RunRecorder, RunResult};
pub use selection::{FitnessWeighting, RouletteRule, SelectionPolicy};

use population::deserialize_score;

/// Stage of the search that issued an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Scoring the freshly sampled colony (generation 0).
    Initialization,
    Employed,
    Onlooker,
    Scout,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Initialization => "initialization",
            Self::Employed => "employed",
            Self::Onlooker => "onlooker",
            Self::Scout => "scout",
        })
    }
}

/// How the evaluations of one phase are issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// One blocking evaluation at a time, in candidate order.
    #[default]
    Sequential,
    /// Draw every trial of a phase up front, evaluate them on the rayon pool,
    /// then apply acceptance in candidate order.
    Parallel,
}

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Initial population evaluated, no generation run yet.
    Initialized,
    /// The given generation has completed.
    Running(usize),
    Completed,
}

/// Best configuration observed so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestSolution {
    pub configuration: Configuration,
    #[serde(deserialize_with = "deserialize_score")]
    pub fitness: f64,
    /// Population slot that held it.
    pub candidate_index: usize,
    /// Generation it appeared in (0 = initial population).
    pub generation: usize,
}

/// Everything needed to continue a run: the checkpoint payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    seed: u64,
    status: RunStatus,
    space: ParameterSpace,
    population: Population,
    best: BestSolution,
    recorder: RunRecorder,
    evaluations: EvaluationStats,
}

impl RunState {
    /// Seed driving every generation of this run.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.status
    }

    #[must_use]
    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    #[must_use]
    pub fn population(&self) -> &Population {
        &self.population
    }

    #[must_use]
    pub fn best(&self) -> &BestSolution {
        &self.best
    }

    #[must_use]
    pub fn recorder(&self) -> &RunRecorder {
        &self.recorder
    }

    #[must_use]
    pub fn evaluations(&self) -> &EvaluationStats {
        &self.evaluations
    }

    /// Generations finished so far.
    #[must_use]
    pub fn completed_generations(&self) -> usize {
        self.recorder.len()
    }

    /// Freeze into a result, e.g. after an early stop.
    #[must_use]
    pub fn into_result(self) -> RunResult {
        let (records, snapshots) = self.recorder.into_parts();
        RunResult {
            best_configuration: self.best.configuration,
            best_fitness: self.best.fitness,
            best_candidate_index: self.best.candidate_index,
            best_generation: self.best.generation,
            records,
            snapshots,
            evaluations: self.evaluations,
            seed: self.seed,
        }
    }

    /// Promote candidate `index` to global best if it beats it.
    fn observe(&mut self, index: usize, generation: usize) {
        let Some(candidate) = self.population.get(index) else {
            return;
        };
        if candidate.score() > self.best.fitness {
            self.best = BestSolution {
                configuration: candidate.configuration.clone(),
                fitness: candidate.score(),
                candidate_index: index,
                generation,
            };
            if generation > 0 {
                info!(
                    generation,
                    candidate = index,
                    fitness = self.best.fitness,
                    "new global best"
                );
            }
        }
    }
}

/// ABC optimizer over a [`ParameterSpace`].
pub struct ArtificialBeeColony {
    space: ParameterSpace,
    config: AbcConfig,
    callbacks: Vec<Box<dyn Callback>>,
}

impl fmt::Debug for ArtificialBeeColony {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtificialBeeColony")
            .field("space", &self.space)
            .field("config", &self.config)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

impl ArtificialBeeColony {
    /// Create an optimizer.
    ///
    /// # Errors
    ///
    /// Fails if `config` does not validate (see [`AbcConfig::validate`]).
    pub fn new(space: ParameterSpace, config: AbcConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            space,
            config,
            callbacks: Vec::new(),
        })
    }

    /// Register an observer.
    #[must_use]
    pub fn callback(mut self, callback: impl Callback + 'static) -> Self {
        self.callbacks.push(Box::new(callback));
        self
    }

    #[must_use]
    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    #[must_use]
    pub fn config(&self) -> &AbcConfig {
        &self.config
    }

    /// Run to `max_generations` from a fresh colony.
    pub fn run<E>(&mut self, evaluator: &E) -> Result<RunResult>
    where
        E: Evaluator + ?Sized,
    {
        for callback in &mut self.callbacks {
            callback.on_start(&self.space, &self.config);
        }
        let state = self.initialize(evaluator)?;
        self.drive(state, evaluator)
    }

    /// Continue a checkpointed run up to `max_generations`.
    ///
    /// # Errors
    ///
    /// [`AbcError::InvalidCheckpoint`] if `state` was produced for another
    /// search space or colony size.
    pub fn resume<E>(&mut self, state: RunState, evaluator: &E) -> Result<RunResult>
    where
        E: Evaluator + ?Sized,
    {
        self.check_resumable(&state)?;
        if let Some(seed) = self.config.seed.filter(|s| *s != state.seed) {
            warn!(
                configured = seed,
                checkpoint = state.seed,
                "ignoring configured seed, resuming with checkpoint seed"
            );
        }
        info!(
            generation = state.completed_generations(),
            best_fitness = state.best.fitness,
            "resuming run"
        );
        for callback in &mut self.callbacks {
            callback.on_start(&self.space, &self.config);
        }
        self.drive(state, evaluator)
    }

    /// Sample and evaluate the initial colony (generation 0).
    pub fn initialize<E>(&mut self, evaluator: &E) -> Result<RunState>
    where
        E: Evaluator + ?Sized,
    {
        let seed = self.config.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = generation_rng(seed, 0);
        let population = Population::initialize(&self.space, self.config.colony_size, &mut rng)?;
        info!(
            seed,
            colony_size = population.len(),
            dimensions = self.space.dimension(),
            stagnation_limit = self.config.stagnation_limit(),
            "initializing colony"
        );

        let best = BestSolution {
            configuration: population.candidates()[0].configuration.clone(),
            fitness: f64::NEG_INFINITY,
            candidate_index: 0,
            generation: 0,
        };
        let mut state = RunState {
            seed,
            status: RunStatus::Initialized,
            space: self.space.clone(),
            population,
            best,
            recorder: RunRecorder::new(),
            evaluations: EvaluationStats::default(),
        };

        let colony_size = state.population.len();
        let mut hive = Hive {
            mode: self.config.evaluation_mode,
            callbacks: self.callbacks.as_mut_slice(),
            evaluator,
            generation: 0,
        };
        hive.run_phase(
            &mut state,
            Phase::Initialization,
            colony_size,
            &mut rng,
            |population, i, _| Trial {
                candidate: i,
                configuration: population.candidates()[i].configuration.clone(),
            },
        )?;
        info!(
            best_fitness = state.best.fitness,
            candidate = state.best.candidate_index,
            "initial colony evaluated"
        );
        Ok(state)
    }

    /// Run one generation: employed, onlooker and scout phases, then record.
    pub fn step<E>(&mut self, state: &mut RunState, evaluator: &E) -> Result<()>
    where
        E: Evaluator + ?Sized,
    {
        let generation = state.completed_generations() + 1;
        let mut rng = generation_rng(state.seed, generation);
        let limit = self.config.stagnation_limit();
        let selection = self.config.selection;
        let space = &self.space;
        let callbacks = &mut self.callbacks;

        let mut hive = Hive {
            mode: self.config.evaluation_mode,
            callbacks: callbacks.as_mut_slice(),
            evaluator,
            generation,
        };

        let colony_size = state.population.len();
        hive.run_phase(state, Phase::Employed, colony_size, &mut rng, |population, i, rng| {
            let k = population.neighbor_index(i, rng);
            Trial {
                candidate: i,
                configuration: population.perturb(space, i, k, rng),
            }
        })?;

        let cumulative = selection.cumulative_probabilities(&state.population);
        hive.run_phase(
            state,
            Phase::Onlooker,
            self.config.onlooker_count,
            &mut rng,
            |population, _, rng| {
                let j = selection.select(&cumulative, rng);
                let k = population.neighbor_index(j, rng);
                Trial {
                    candidate: j,
                    configuration: population.perturb(space, j, k, rng),
                }
            },
        )?;

        let stagnant = state.population.stagnant(limit);
        for &i in &stagnant {
            info!(
                generation,
                candidate = i,
                stagnation = state.population.candidates()[i].stagnation_count,
                "scout abandons food source"
            );
        }
        hive.run_phase(state, Phase::Scout, stagnant.len(), &mut rng, |_, slot, rng| Trial {
            candidate: stagnant[slot],
            configuration: space.sample(rng),
        })?;

        let best_index = state.population.best_index();
        state.observe(best_index, generation);
        let record = GenerationRecord {
            generation,
            best_candidate_index: best_index,
            best_fitness_so_far: state.best.fitness,
            generation_best_fitness: state.population.candidates()[best_index].score(),
        };
        let snapshot = state.population.snapshot(space);
        state.recorder.record(record, snapshot);
        state.status = RunStatus::Running(generation);

        info!(
            generation,
            best_fitness = state.best.fitness,
            generation_best = state.population.candidates()[best_index].score(),
            scouts = stagnant.len(),
            evaluations = state.evaluations.total(),
            "generation complete"
        );

        for callback in callbacks.iter_mut() {
            callback.on_generation_end(state)?;
        }
        Ok(())
    }

    fn drive<E>(&mut self, mut state: RunState, evaluator: &E) -> Result<RunResult>
    where
        E: Evaluator + ?Sized,
    {
        while state.completed_generations() < self.config.max_generations {
            self.step(&mut state, evaluator)?;
            if self.callbacks.iter().any(|c| c.should_stop()) {
                info!(
                    generation = state.completed_generations(),
                    "stopping early on callback request"
                );
                break;
            }
        }
        state.status = RunStatus::Completed;

        let result = state.into_result();
        info!(
            best_fitness = result.best_fitness,
            best_generation = result.best_generation,
            evaluations = result.evaluations.total(),
            "run complete"
        );
        for callback in &mut self.callbacks {
            callback.on_end(&result);
        }
        Ok(result)
    }

    fn check_resumable(&self, state: &RunState) -> Result<()> {
        if state.space != self.space {
            return Err(AbcError::InvalidCheckpoint {
                message: "search space differs from the checkpointed run".to_string(),
            });
        }
        if state.population.len() != self.config.colony_size {
            return Err(AbcError::InvalidCheckpoint {
                message: format!(
                    "checkpoint colony has {} food sources, configuration expects {}",
                    state.population.len(),
                    self.config.colony_size
                ),
            });
        }
        if let Some(i) = state
            .population
            .iter()
            .position(|c| !self.space.contains(&c.configuration))
        {
            return Err(AbcError::InvalidCheckpoint {
                message: format!("candidate {i} lies outside the search space"),
            });
        }
        Ok(())
    }
}

fn generation_rng(seed: u64, generation: usize) -> StdRng {
    StdRng::seed_from_u64(seed.wrapping_add(generation as u64))
}

/// A configuration waiting to be scored for population slot `candidate`.
struct Trial {
    candidate: usize,
    configuration: Configuration,
}

/// Borrowed context for issuing the evaluations of one generation.
struct Hive<'a, E: ?Sized> {
    mode: EvaluationMode,
    callbacks: &'a mut [Box<dyn Callback>],
    evaluator: &'a E,
    generation: usize,
}

impl<E: Evaluator + ?Sized> Hive<'_, E> {
    /// Draw `slots` trials, score them and settle each into the population.
    fn run_phase<F>(
        &mut self,
        state: &mut RunState,
        phase: Phase,
        slots: usize,
        rng: &mut StdRng,
        mut draw: F,
    ) -> Result<()>
    where
        F: FnMut(&Population, usize, &mut StdRng) -> Trial,
    {
        match self.mode {
            EvaluationMode::Sequential => {
                for slot in 0..slots {
                    let trial = draw(&state.population, slot, rng);
                    let fitness = self
                        .evaluator
                        .evaluate(&trial.configuration)
                        .map_err(|source| self.failure(phase, trial.candidate, source))?;
                    self.settle(state, phase, trial, fitness);
                }
            }
            EvaluationMode::Parallel => {
                let trials: Vec<Trial> = (0..slots)
                    .map(|slot| draw(&state.population, slot, rng))
                    .collect();
                let evaluator = self.evaluator;
                let scores: Vec<_> = trials
                    .par_iter()
                    .map(|trial| evaluator.evaluate(&trial.configuration))
                    .collect();
                for (trial, score) in trials.into_iter().zip(scores) {
                    let fitness = score.map_err(|source| self.failure(phase, trial.candidate, source))?;
                    self.settle(state, phase, trial, fitness);
                }
            }
        }
        Ok(())
    }

    fn failure(
        &self,
        phase: Phase,
        candidate: usize,
        source: EvaluationError,
    ) -> AbcError {
        AbcError::EvaluatorFailure {
            generation: self.generation,
            phase,
            candidate,
            source,
        }
    }

    fn settle(&mut self, state: &mut RunState, phase: Phase, trial: Trial, fitness: f64) {
        let Trial {
            candidate,
            configuration,
        } = trial;
        state.evaluations.record(phase);
        debug!(
            generation = self.generation,
            %phase,
            candidate,
            fitness,
            config = %configuration,
            "candidate evaluated"
        );

        let event = EvaluationEvent {
            generation: self.generation,
            phase,
            candidate,
            configuration: &configuration,
            fitness,
        };
        for callback in self.callbacks.iter_mut() {
            callback.on_evaluation(&event);
        }

        let changed = match phase {
            Phase::Initialization | Phase::Scout => {
                state.population.reset(candidate, configuration, fitness);
                true
            }
            Phase::Employed | Phase::Onlooker => {
                state.population.consider(candidate, configuration, fitness)
            }
        };
        if changed {
            state.observe(candidate, self.generation);
        }
    }
}
