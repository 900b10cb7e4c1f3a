//! Integration tests for the `slots` CLI binary.
//!
//! These run the actual binary through `assert_cmd`, feeding it the JSON
//! fixtures under `tests/fixtures`.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;

macro_rules! fixture {
    ($name:literal) => {
        concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/", $name)
    };
}

fn slots() -> Command {
    let mut cmd = Command::cargo_bin("slots").unwrap();
    cmd.env_remove("SLOTS_CONFLICT_SCOPE")
        .env_remove("SLOTS_CHECK_SINGLES_AGAINST_RULES")
        .env_remove("SLOTS_LOG");
    cmd
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout must be JSON")
}

// ─────────────────────────────────────────────────────────────────────────────
// expand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn expand_produces_sorted_instances_minus_exclusions() {
    let output = slots()
        .args([
            "expand",
            "--rules",
            fixture!("rules.json"),
            "--exclusions",
            fixture!("exclusions.json"),
            "--today",
            "2024-01-01",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let listings = stdout_json(&output);
    let dates: Vec<&str> = listings
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["date"].as_str().unwrap())
        .collect();
    assert_eq!(
        dates,
        [
            "2024-01-01",
            "2024-01-06",
            "2024-01-08",
            "2024-01-13",
            "2024-01-22",
            "2024-01-29"
        ]
    );
    assert_eq!(listings[0]["origin"]["kind"], "recurring");
    assert_eq!(listings[0]["origin"]["ruleId"], "rule-mon");
}

#[test]
fn expand_skips_days_before_today() {
    let output = slots()
        .args(["expand", "--rules", fixture!("rules.json"), "--today", "2024-01-20"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let listings = stdout_json(&output);
    assert_eq!(listings.as_array().unwrap().len(), 2);
}

#[test]
fn expand_writes_to_file() {
    let output_path = std::env::temp_dir().join("slots-test-expand-output.json");
    let _ = std::fs::remove_file(&output_path);

    slots()
        .args(["expand", "--rules", fixture!("rules.json"), "--today", "2024-01-01", "-o"])
        .arg(&output_path)
        .assert()
        .success();

    let content = std::fs::read_to_string(&output_path).expect("output file must exist");
    let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 7);

    let _ = std::fs::remove_file(&output_path);
}

#[test]
fn expand_missing_rules_file_fails() {
    slots()
        .args(["expand", "--rules", "/nonexistent/rules.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read file"));
}

// ─────────────────────────────────────────────────────────────────────────────
// filter
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn filter_by_skill_from_file() {
    let output = slots()
        .args(["filter", "-i", fixture!("listings.json"), "--skill", "skiing"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output).as_array().unwrap().len(), 2);
}

#[test]
fn filter_combines_criteria_from_stdin() {
    let input = std::fs::read_to_string(fixture!("listings.json")).unwrap();
    let output = slots()
        .args([
            "filter",
            "--from",
            "2024-01-01",
            "--to",
            "2024-01-10",
            "--max-price",
            "100",
            "--start-time",
            "09:00",
            "--end-time",
            "17:00",
        ])
        .write_stdin(input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let kept = stdout_json(&output);
    let ids: Vec<&str> = kept
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["date"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["2024-01-05", "2024-01-08"]);
}

#[test]
fn filter_rejects_half_a_date_range() {
    slots()
        .args(["filter", "-i", fixture!("listings.json"), "--from", "2024-01-01"])
        .assert()
        .failure();
}

#[test]
fn filter_rejects_unknown_skill() {
    slots()
        .args(["filter", "-i", fixture!("listings.json"), "--skill", "sledding"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sledding"));
}

#[test]
fn filter_empty_stdin_fails() {
    slots()
        .arg("filter")
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No JSON input"));
}

// ─────────────────────────────────────────────────────────────────────────────
// check
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn check_reports_conflict_with_existing_window() {
    slots()
        .args([
            "check",
            "--candidate",
            fixture!("candidate.json"),
            "--singles",
            fixture!("singles.json"),
        ])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("9:00 AM - 11:00 AM on 2024-02-01"));
}

#[test]
fn check_same_skill_flag_ignores_other_sports() {
    slots()
        .args([
            "check",
            "--candidate",
            fixture!("candidate.json"),
            "--singles",
            fixture!("singles.json"),
            "--same-skill",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("No conflicts"));
}

#[test]
fn check_reads_scope_from_config_file() {
    slots()
        .args([
            "--config",
            fixture!("same_skill_config.json"),
            "check",
            "--candidate",
            fixture!("candidate.json"),
            "--singles",
            fixture!("singles.json"),
        ])
        .assert()
        .success();
}

#[test]
fn check_reads_scope_from_environment() {
    slots()
        .env("SLOTS_CONFLICT_SCOPE", "same-skill")
        .args([
            "check",
            "--candidate",
            fixture!("candidate.json"),
            "--singles",
            fixture!("singles.json"),
        ])
        .assert()
        .success();
}

#[test]
fn check_rule_candidate_against_rules() {
    slots()
        .args([
            "check",
            "--candidate",
            fixture!("candidate_rule.json"),
            "--rules",
            fixture!("rules.json"),
        ])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("every Monday"));
}

#[test]
fn check_rejects_invalid_candidate() {
    let bad = r#"{"teacherId":"t","date":"2024-02-01","startTime":"12:00","endTime":"10:00","location":"X","price":10,"skill":"skiing"}"#;
    let path = std::env::temp_dir().join("slots-test-bad-candidate.json");
    std::fs::write(&path, bad).unwrap();

    slots()
        .args(["check", "--candidate"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid candidate listing"));

    let _ = std::fs::remove_file(&path);
}

// ─────────────────────────────────────────────────────────────────────────────
// time
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn time_to_display() {
    slots()
        .args(["time", "14:30"])
        .assert()
        .success()
        .stdout("2:30 PM\n");
}

#[test]
fn time_to_24_hour() {
    slots()
        .args(["time", "12:15 am", "--to-24h"])
        .assert()
        .success()
        .stdout("00:15\n");
}

#[test]
fn time_rejects_malformed_value() {
    slots()
        .args(["time", "25:00"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid time"));
}
