//! Per-generation history and the terminal run result.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::automl::search::Configuration;
use crate::error::Result;
use crate::metaheuristics::abc::population::{deserialize_score, PopulationSnapshot};
use crate::metaheuristics::abc::Phase;

/// Summary row appended once per generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// Generation number, starting at 1.
    pub generation: usize,
    /// Fittest candidate of the population at generation end.
    pub best_candidate_index: usize,
    /// Running global best, never decreasing.
    #[serde(deserialize_with = "deserialize_score")]
    pub best_fitness_so_far: f64,
    /// Fitness of `best_candidate_index` at generation end.
    #[serde(deserialize_with = "deserialize_score")]
    pub generation_best_fitness: f64,
}

/// Evaluation counts by phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationStats {
    pub initialization: usize,
    pub employed: usize,
    pub onlooker: usize,
    pub scout: usize,
}

impl EvaluationStats {
    /// Count one evaluation.
    pub fn record(&mut self, phase: Phase) {
        match phase {
            Phase::Initialization => self.initialization += 1,
            Phase::Employed => self.employed += 1,
            Phase::Onlooker => self.onlooker += 1,
            Phase::Scout => self.scout += 1,
        }
    }

    #[must_use]
    pub fn for_phase(&self, phase: Phase) -> usize {
        match phase {
            Phase::Initialization => self.initialization,
            Phase::Employed => self.employed,
            Phase::Onlooker => self.onlooker,
            Phase::Scout => self.scout,
        }
    }

    /// Total training runs issued.
    #[must_use]
    pub fn total(&self) -> usize {
        self.initialization + self.employed + self.onlooker + self.scout
    }
}

/// Append-only log of generation records and population snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunRecorder {
    records: Vec<GenerationRecord>,
    snapshots: Vec<PopulationSnapshot>,
}

impl RunRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the state of a finished generation.
    pub fn record(&mut self, record: GenerationRecord, snapshot: PopulationSnapshot) {
        self.records.push(record);
        self.snapshots.push(snapshot);
    }

    #[must_use]
    pub fn records(&self) -> &[GenerationRecord] {
        &self.records
    }

    #[must_use]
    pub fn snapshots(&self) -> &[PopulationSnapshot] {
        &self.snapshots
    }

    /// Number of recorded generations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&GenerationRecord> {
        self.records.last()
    }

    /// Running best fitness after each generation.
    #[must_use]
    pub fn best_fitness_history(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.best_fitness_so_far).collect()
    }

    pub(crate) fn into_parts(self) -> (Vec<GenerationRecord>, Vec<PopulationSnapshot>) {
        (self.records, self.snapshots)
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Best configuration ever observed.
    pub best_configuration: Configuration,
    #[serde(deserialize_with = "deserialize_score")]
    pub best_fitness: f64,
    /// Population index that held the best configuration.
    pub best_candidate_index: usize,
    /// Generation in which the best was found (0 = initial population).
    pub best_generation: usize,
    pub records: Vec<GenerationRecord>,
    pub snapshots: Vec<PopulationSnapshot>,
    pub evaluations: EvaluationStats,
    /// Seed the run was driven by.
    pub seed: u64,
}

impl RunResult {
    /// Number of completed generations.
    #[must_use]
    pub fn generations(&self) -> usize {
        self.records.len()
    }

    /// Write as pretty JSON.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Read a result written by [`RunResult::save_json`].
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn snapshot() -> PopulationSnapshot {
        PopulationSnapshot {
            values: BTreeMap::new(),
            fitness: vec![Some(0.4), None],
            stagnation: vec![0, 2],
        }
    }

    fn record(generation: usize, best: f64) -> GenerationRecord {
        GenerationRecord {
            generation,
            best_candidate_index: 0,
            best_fitness_so_far: best,
            generation_best_fitness: best,
        }
    }

    #[test]
    fn test_recorder_appends_in_order() {
        let mut recorder = RunRecorder::new();
        assert!(recorder.is_empty());
        recorder.record(record(1, 0.5), snapshot());
        recorder.record(record(2, 0.7), snapshot());

        assert_eq!(recorder.len(), 2);
        assert_eq!(recorder.snapshots().len(), 2);
        assert_eq!(recorder.last().map(|r| r.generation), Some(2));
        assert_eq!(recorder.best_fitness_history(), vec![0.5, 0.7]);
    }

    #[test]
    fn test_evaluation_stats() {
        let mut stats = EvaluationStats::default();
        stats.record(Phase::Initialization);
        stats.record(Phase::Employed);
        stats.record(Phase::Employed);
        stats.record(Phase::Scout);
        assert_eq!(stats.for_phase(Phase::Employed), 2);
        assert_eq!(stats.for_phase(Phase::Onlooker), 0);
        assert_eq!(stats.total(), 4);
    }

    #[test]
    fn test_worst_fitness_survives_json() {
        let json = serde_json::to_string(&record(1, f64::NEG_INFINITY)).expect("serialize");
        assert!(json.contains("null"));
        let back: GenerationRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.best_fitness_so_far, f64::NEG_INFINITY);
    }

    #[test]
    fn test_run_result_file_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("result.json");
        let result = RunResult {
            best_configuration: Configuration::new(),
            best_fitness: 0.83,
            best_candidate_index: 3,
            best_generation: 2,
            records: vec![record(1, 0.8), record(2, 0.83)],
            snapshots: vec![snapshot(), snapshot()],
            evaluations: EvaluationStats {
                initialization: 5,
                employed: 10,
                onlooker: 6,
                scout: 0,
            },
            seed: 42,
        };
        result.save_json(&path).expect("save");
        let loaded = RunResult::load_json(&path).expect("load");
        assert_eq!(loaded, result);
        assert_eq!(loaded.generations(), 2);
    }
}
