//! Run observers.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, info};

use crate::automl::search::{Configuration, ParameterSpace};
use crate::config::AbcConfig;
use crate::error::Result;
use crate::metaheuristics::abc::checkpoint::Checkpoint;
use crate::metaheuristics::abc::recorder::RunResult;
use crate::metaheuristics::abc::{Phase, RunState};

/// One scored trial, as seen by [`Callback::on_evaluation`].
#[derive(Debug, Clone, Copy)]
pub struct EvaluationEvent<'a> {
    pub generation: usize,
    pub phase: Phase,
    /// Population slot the trial was drawn for.
    pub candidate: usize,
    pub configuration: &'a Configuration,
    pub fitness: f64,
}

/// Hooks into an [`ArtificialBeeColony`](super::ArtificialBeeColony) run.
///
/// Every method has a no-op default. An error returned from
/// [`on_generation_end`](Callback::on_generation_end) aborts the run.
pub trait Callback {
    /// Called once before the first evaluation (or before resuming).
    fn on_start(&mut self, _space: &ParameterSpace, _config: &AbcConfig) {}

    /// Called after every evaluation, before acceptance is applied.
    fn on_evaluation(&mut self, _event: &EvaluationEvent<'_>) {}

    /// Called after each generation has been recorded.
    fn on_generation_end(&mut self, _state: &RunState) -> Result<()> {
        Ok(())
    }

    /// Checked after each generation; `true` ends the run early.
    fn should_stop(&self) -> bool {
        false
    }

    /// Called once with the final result.
    fn on_end(&mut self, _result: &RunResult) {}
}

/// Reports progress through `tracing` on the `apiary::progress` target.
#[derive(Debug, Default)]
pub struct ProgressCallback {
    verbose: bool,
    max_generations: usize,
    started: Option<Instant>,
}

impl ProgressCallback {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also report every single evaluation.
    #[must_use]
    pub fn verbose() -> Self {
        Self {
            verbose: true,
            ..Self::default()
        }
    }

    fn elapsed_secs(&self) -> f64 {
        self.started.map_or(0.0, |t| t.elapsed().as_secs_f64())
    }
}

impl Callback for ProgressCallback {
    fn on_start(&mut self, space: &ParameterSpace, config: &AbcConfig) {
        self.max_generations = config.max_generations;
        self.started = Some(Instant::now());
        info!(
            target: "apiary::progress",
            dimensions = space.dimension(),
            colony_size = config.colony_size,
            max_generations = config.max_generations,
            "search started"
        );
    }

    fn on_evaluation(&mut self, event: &EvaluationEvent<'_>) {
        if self.verbose {
            info!(
                target: "apiary::progress",
                generation = event.generation,
                phase = %event.phase,
                candidate = event.candidate,
                fitness = event.fitness,
                "{}",
                event.configuration
            );
        }
    }

    fn on_generation_end(&mut self, state: &RunState) -> Result<()> {
        let generation = state.completed_generations();
        info!(
            target: "apiary::progress",
            generation,
            of = self.max_generations,
            best_fitness = state.best().fitness,
            evaluations = state.evaluations().total(),
            elapsed_secs = self.elapsed_secs(),
            "generation {generation}/{}",
            self.max_generations
        );
        Ok(())
    }

    fn on_end(&mut self, result: &RunResult) {
        info!(
            target: "apiary::progress",
            best_fitness = result.best_fitness,
            generations = result.generations(),
            elapsed_secs = self.elapsed_secs(),
            "best {}",
            result.best_configuration
        );
    }
}

/// Writes a [`Checkpoint`] every `every` generations.
#[derive(Debug, Clone)]
pub struct CheckpointCallback {
    path: PathBuf,
    every: usize,
    written: usize,
}

impl CheckpointCallback {
    /// Checkpoint to `path` after every generation.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            every: 1,
            written: 0,
        }
    }

    /// Checkpoint only every `every` generations (0 is treated as 1).
    #[must_use]
    pub fn with_every(mut self, every: usize) -> Self {
        self.every = every.max(1);
        self
    }

    /// Checkpoints written so far.
    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }
}

impl Callback for CheckpointCallback {
    fn on_generation_end(&mut self, state: &RunState) -> Result<()> {
        let generation = state.completed_generations();
        if generation % self.every != 0 {
            return Ok(());
        }
        Checkpoint::save_state(state, &self.path)?;
        self.written += 1;
        debug!(generation, path = %self.path.display(), "checkpoint written");
        Ok(())
    }
}
