//! Integration tests for the dosis binary.
//!
//! These tests run the calculator end to end: dose output, selection
//! gating, presets on disk and catalog maintenance.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("dosis"))
}

fn adult() -> [&'static str; 4] {
    ["--weight", "70", "--age", "30"]
}

fn json_stdout(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.output().expect("Failed to run dosis");
    assert!(output.status.success(), "dosis failed: {:?}", output);
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Injectable dose and syringe calculator"));
}

#[test]
fn test_calc_adult_ceftriaxone() {
    cli()
        .arg("calc")
        .args(adult())
        .arg("ceftriaxona")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ceftriaxona: 1500 mg"))
        .stdout(predicate::str::contains("diluent: Lidocaína"))
        .stdout(predicate::str::contains("(adult)"));
}

#[test]
fn test_calc_json_total_volume() {
    let value = json_stdout(
        cli()
            .arg("calc")
            .arg("--json")
            .args(adult())
            .args(["--additive", "recommended"])
            .args(["ceftriaxona", "ketorolaco"]),
    );

    let report = &value["report"];
    assert_eq!(report["additive"], "recommended");
    assert_eq!(report["additive_volume_ml"].as_f64(), Some(3.0));
    let total = report["total_syringe_volume_ml"].as_f64().unwrap();
    assert!((total - 8.0).abs() < 1e-9, "total was {}", total);
    assert_eq!(report["drugs"].as_array().unwrap().len(), 2);
    assert!(value["rejected"].as_array().unwrap().is_empty());
}

#[test]
fn test_calc_rejects_blocking_interaction() {
    cli()
        .arg("calc")
        .args(adult())
        .args(["diazepam", "lorazepam"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rejected lorazepam"));
}

#[test]
fn test_calc_rejects_blocking_condition() {
    let value = json_stdout(
        cli()
            .arg("calc")
            .arg("--json")
            .args(adult())
            .args(["--condition", "embarazo"])
            .args(["ketorolaco", "ondansetron"]),
    );

    let rejected = value["rejected"].as_array().unwrap();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0]["drug_id"], "ketorolaco");
    assert_eq!(rejected[0]["rejection"]["kind"], "condition");
}

#[test]
fn test_calc_unknown_drug_fails() {
    cli()
        .arg("calc")
        .args(adult())
        .arg("unobtainium")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unobtainium"));
}

#[test]
fn test_calc_invalid_weight_fails() {
    cli()
        .args(["calc", "--weight", "0", "--age", "30", "ceftriaxona"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("weight"));
}

#[test]
fn test_calc_invalid_route_fails() {
    cli()
        .args(["calc", "--weight", "70", "--age", "30", "--route", "PO", "ceftriaxona"])
        .assert()
        .failure();
}

#[test]
fn test_status_shows_blocked_interaction() {
    let value = json_stdout(
        cli()
            .arg("status")
            .arg("--json")
            .args(adult())
            .args(["--selected", "diazepam"]),
    );

    assert_eq!(value["diazepam"], "selected");
    assert_eq!(value["lorazepam"], "blocked_by_interaction");
    assert_eq!(value["ceftriaxona"], "available");
}

#[test]
fn test_syndromes_ranks_dengue() {
    cli()
        .args(["syndromes", "fiebre", "cefalea", "mialgias", "dolor_retroocular"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dengue"));
}

#[test]
fn test_syndromes_unknown_symptom_fails() {
    cli().args(["syndromes", "hiccups"]).assert().failure();
}

#[test]
fn test_listing_commands() {
    cli()
        .arg("drugs")
        .assert()
        .success()
        .stdout(predicate::str::contains("ceftriaxona"));
    cli()
        .arg("conditions")
        .assert()
        .success()
        .stdout(predicate::str::contains("embarazo"));
    cli()
        .arg("symptoms")
        .assert()
        .success()
        .stdout(predicate::str::contains("fiebre"));
}

#[test]
fn test_preset_roundtrip() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    cli()
        .arg("--data-dir")
        .arg(&data_dir)
        .args(["preset", "save", "--slot", "2", "--name", "otitis"])
        .args(["--weight", "22", "--age", "7"])
        .arg("ceftriaxona")
        .assert()
        .success()
        .stdout(predicate::str::contains("slot 2"));

    assert!(data_dir.join("presets.json").exists());

    cli()
        .arg("--data-dir")
        .arg(&data_dir)
        .args(["preset", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("otitis"))
        .stdout(predicate::str::contains("(empty)"));

    cli()
        .arg("--data-dir")
        .arg(&data_dir)
        .args(["preset", "load", "--slot", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Preset 'otitis'"))
        .stdout(predicate::str::contains("Ceftriaxona"));

    cli()
        .arg("--data-dir")
        .arg(&data_dir)
        .args(["preset", "delete", "--slot", "2"])
        .assert()
        .success();

    cli()
        .arg("--data-dir")
        .arg(&data_dir)
        .args(["preset", "load", "--slot", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("empty"));
}

#[test]
fn test_preset_slot_out_of_range() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("--data-dir")
        .arg(temp_dir.path())
        .args(["preset", "delete", "--slot", "99"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn test_catalog_check_default() {
    cli()
        .args(["catalog", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Catalog OK"));
}

#[test]
fn test_catalog_export_then_use() {
    let temp_dir = setup_test_dir();
    let path = temp_dir.path().join("catalog.json");

    cli()
        .args(["catalog", "export", "--out"])
        .arg(&path)
        .assert()
        .success();
    assert!(path.exists());

    cli()
        .arg("--catalog")
        .arg(&path)
        .args(["catalog", "check"])
        .assert()
        .success();

    cli()
        .arg("--catalog")
        .arg(&path)
        .arg("calc")
        .args(adult())
        .arg("ceftriaxona")
        .assert()
        .success()
        .stdout(predicate::str::contains("1500 mg"));
}

#[test]
fn test_catalog_check_reports_problems() {
    let temp_dir = setup_test_dir();
    let path = temp_dir.path().join("catalog.json");

    cli()
        .args(["catalog", "export", "--out"])
        .arg(&path)
        .assert()
        .success();

    let mut value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    value["drugs"]["ceftriaxona"]["name"] = serde_json::Value::String(String::new());
    fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

    cli()
        .arg("--catalog")
        .arg(&path)
        .args(["catalog", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("empty name"));
}

#[test]
fn test_catalog_migrate_report() {
    cli()
        .args(["catalog", "migrate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("migrated"))
        .stdout(predicate::str::contains("kept as text"));
}

#[test]
fn test_corrupt_catalog_fails() {
    let temp_dir = setup_test_dir();
    let path = temp_dir.path().join("catalog.json");
    fs::write(&path, "not json").unwrap();

    cli()
        .arg("--catalog")
        .arg(&path)
        .arg("drugs")
        .assert()
        .failure();
}
