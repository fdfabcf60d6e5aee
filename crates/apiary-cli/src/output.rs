//! Terminal output helpers.

use std::fmt::Display;

use apiary::metaheuristics::abc::RunResult;
use colored::Colorize;

/// Print a section header
pub(crate) fn section(title: &str) {
    println!("\n{}", format!("=== {title} ===").cyan().bold());
}

/// Print a key-value pair
pub(crate) fn kv(key: &str, value: impl Display) {
    println!("  {}: {}", key.white().bold(), value);
}

/// Print a success message
pub(crate) fn success(msg: &str) {
    println!("{} {}", "[DONE]".green().bold(), msg);
}

/// Print an error message
pub(crate) fn error(msg: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), msg);
}

pub(crate) fn fitness(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.4}")
    } else {
        "n/a".to_string()
    }
}

/// Best configuration and evaluation counts.
pub(crate) fn summary(result: &RunResult) {
    section("Best Configuration");
    for (name, value) in result.best_configuration.iter() {
        kv(name, value);
    }

    section("Summary");
    kv("Best fitness", fitness(result.best_fitness));
    kv("Found in generation", result.best_generation);
    kv("Food source", result.best_candidate_index);
    kv("Generations", result.generations());
    kv("Evaluations", result.evaluations.total());
    kv("Seed", result.seed);
}

/// Per-generation table.
pub(crate) fn history(result: &RunResult) {
    section("History");
    println!(
        "  {:>10}  {:>10}  {:>14}  {:>12}",
        "Generation".bold(),
        "Source".bold(),
        "Gen. best".bold(),
        "Best so far".bold()
    );
    for record in &result.records {
        println!(
            "  {:>10}  {:>10}  {:>14}  {:>12}",
            record.generation,
            record.best_candidate_index,
            fitness(record.generation_best_fitness),
            fitness(record.best_fitness_so_far)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fitness_formatting() {
        assert_eq!(fitness(0.81234), "0.8123");
        assert_eq!(fitness(f64::NEG_INFINITY), "n/a");
    }
}
