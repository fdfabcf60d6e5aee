//! CLI integration tests for the apiary binary.

#![allow(clippy::unwrap_used)]

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

fn apiary() -> Command {
    Command::cargo_bin("apiary").expect("Failed to find apiary binary")
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_help_lists_subcommands() {
    apiary()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("resume"))
        .stdout(predicate::str::contains("inspect"));
}

#[test]
fn test_space_prints_reference_experiment() {
    apiary()
        .arg("space")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"colony_size\": 5"))
        .stdout(predicate::str::contains("learning_rate"))
        .stdout(predicate::str::contains("pooling_type"));
}

#[test]
fn test_run_without_evaluator_is_usage_error() {
    apiary()
        .args(["run", "--generations", "1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No evaluator"));
}

#[test]
fn test_run_rejects_invalid_experiment() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("experiment.json");
    fs::write(&config, r#"{"abc": {"colony_size": 1}}"#).unwrap();

    apiary()
        .args(["run", "--synthetic", "--config"])
        .arg(&config)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Colony too small"));
}

#[test]
fn test_synthetic_run_writes_result() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("result.json");

    apiary()
        .args(["--quiet", "run", "--synthetic", "--seed", "3", "--generations", "2"])
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Best fitness"))
        .stdout(predicate::str::contains("learning_rate"));

    let result = read_json(&output);
    assert_eq!(result["records"].as_array().unwrap().len(), 2);
    assert_eq!(result["seed"], 3);
    assert_eq!(result["evaluations"]["initialization"], 5);
    assert_eq!(result["evaluations"]["employed"], 10);
    assert_eq!(result["evaluations"]["onlooker"], 6);
}

#[test]
fn test_resume_matches_uninterrupted_run() {
    let dir = tempfile::tempdir().unwrap();
    let checkpoint = dir.path().join("checkpoint.json");
    let resumed = dir.path().join("resumed.json");
    let full = dir.path().join("full.json");

    apiary()
        .args(["-q", "run", "--synthetic", "--seed", "21", "--generations", "2"])
        .arg("--checkpoint")
        .arg(&checkpoint)
        .assert()
        .success();
    assert!(checkpoint.exists());

    apiary()
        .args(["-q", "resume"])
        .arg(&checkpoint)
        .args(["--synthetic", "--generations", "5", "--output"])
        .arg(&resumed)
        .assert()
        .success();

    apiary()
        .args(["-q", "run", "--synthetic", "--seed", "21", "--generations", "5", "--output"])
        .arg(&full)
        .assert()
        .success();

    let resumed = read_json(&resumed);
    let full = read_json(&full);
    assert_eq!(resumed["records"].as_array().unwrap().len(), 5);
    assert_eq!(resumed["records"], full["records"]);
    assert_eq!(resumed["best_configuration"], full["best_configuration"]);
}

#[test]
fn test_resume_keeps_checkpointing_to_new_file() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.json");
    let second = dir.path().join("second.json");

    apiary()
        .args(["-q", "run", "--synthetic", "--seed", "13", "--generations", "2"])
        .arg("--checkpoint")
        .arg(&first)
        .assert()
        .success();

    apiary()
        .args(["-q", "resume"])
        .arg(&first)
        .args(["--synthetic", "--generations", "4", "--checkpoint"])
        .arg(&second)
        .assert()
        .success();

    let before = read_json(&first);
    let after = read_json(&second);
    assert_eq!(before["state"]["recorder"]["records"].as_array().unwrap().len(), 2);
    assert_eq!(after["state"]["recorder"]["records"].as_array().unwrap().len(), 4);
    assert_eq!(after["state"]["seed"], 13);
}

#[test]
fn test_resume_rejects_missing_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    apiary()
        .arg("resume")
        .arg(dir.path().join("absent.json"))
        .arg("--synthetic")
        .assert()
        .code(7);
}

#[test]
fn test_inspect_prints_history() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("result.json");

    apiary()
        .args(["-q", "run", "--synthetic", "--seed", "8", "--generations", "3", "--output"])
        .arg(&output)
        .assert()
        .success();

    apiary()
        .arg("inspect")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("History"))
        .stdout(predicate::str::contains("Best so far"));
}

#[cfg(unix)]
#[test]
fn test_trainer_command_receives_hyperparameters() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("result.json");

    apiary()
        .args(["-q", "run", "--seed", "4", "--generations", "1", "--output"])
        .arg(&output)
        .args(["--", "sh", "-c", "test -n \"$APIARY_LEARNING_RATE\" && echo 0.5 && echo 0.8"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0.8000"));

    let result = read_json(&output);
    assert_eq!(result["best_fitness"], 0.8);
}

#[cfg(unix)]
#[test]
fn test_failing_trainer_reports_location() {
    apiary()
        .args(["-q", "run", "--seed", "4", "--generations", "1"])
        .args(["--", "sh", "-c", "echo broken >&2; exit 3"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("generation 0"))
        .stderr(predicate::str::contains("broken"));
}
