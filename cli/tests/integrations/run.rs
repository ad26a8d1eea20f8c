use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const BODIES: &str = r#"{
    "classes": [{ "name": "Body", "fields": { "mass": "number", "weight": "number" } }],
    "formulas": [{
        "name": "weight",
        "requirements": [{ "alias": "b", "class": "Body", "variables": { "m": "mass", "w": "weight" } }],
        "output": { "variable": "w", "alias": "b", "field": "weight" },
        "expression": { "prod": [{ "var": "m" }, { "const": { "value": "9.81" } }] }
    }],
    "components": [
        { "label": "rock", "class": "Body", "fields": { "mass": "2" } },
        { "label": "pebble", "class": "Body", "fields": { "weight": "29.43" } },
        { "label": "cloud", "class": "Body" }
    ]
}"#;

fn write_declarations(temp_dir: &TempDir, json: &str) -> PathBuf {
    let file = temp_dir.path().join("bodies.json");
    fs::write(&file, json).unwrap();
    file
}

#[test]
fn test_cli_fill_forward() {
    let temp_dir = TempDir::new().unwrap();
    let file = write_declarations(&temp_dir, BODIES);

    let mut cmd = Command::cargo_bin("tenet").unwrap();
    cmd.arg("fill").arg(&file).arg("rock.weight");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("rock.weight = 19.62"))
        .stdout(predicate::str::contains("w = m * 9.81"));
}

#[test]
fn test_cli_fill_by_isolation() {
    let temp_dir = TempDir::new().unwrap();
    let file = write_declarations(&temp_dir, BODIES);

    let mut cmd = Command::cargo_bin("tenet").unwrap();
    cmd.arg("fill").arg(&file).arg("pebble.mass");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("pebble.mass = 3"))
        .stdout(predicate::str::contains("m = w / 9.81"));
}

#[test]
fn test_cli_fill_json_output() {
    let temp_dir = TempDir::new().unwrap();
    let file = write_declarations(&temp_dir, BODIES);

    let mut cmd = Command::cargo_bin("tenet").unwrap();
    cmd.arg("fill").arg(&file).arg("rock.weight").arg("--json");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"field\": \"weight\""))
        .stdout(predicate::str::contains("\"formula\": \"weight\""))
        .stdout(predicate::str::contains("19.62"));
}

#[test]
fn test_cli_fill_without_applicable_formula() {
    let temp_dir = TempDir::new().unwrap();
    let file = write_declarations(&temp_dir, BODIES);

    let mut cmd = Command::cargo_bin("tenet").unwrap();
    cmd.arg("fill").arg(&file).arg("cloud.mass");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("No formula can compute 'mass' of cloud"))
        .stderr(predicate::str::contains("×"));
}

#[test]
fn test_cli_fill_rejects_malformed_target() {
    let temp_dir = TempDir::new().unwrap();
    let file = write_declarations(&temp_dir, BODIES);

    let mut cmd = Command::cargo_bin("tenet").unwrap();
    cmd.arg("fill").arg(&file).arg("rock");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("component.field"));
}

#[test]
fn test_cli_solve_fills_everything_it_can() {
    let temp_dir = TempDir::new().unwrap();
    let file = write_declarations(&temp_dir, BODIES);

    let mut cmd = Command::cargo_bin("tenet").unwrap();
    cmd.arg("solve").arg(&file);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("19.62"))
        .stdout(predicate::str::contains("pebble"))
        .stdout(predicate::str::contains("2 field(s) filled"));
}

#[test]
fn test_cli_show_lists_components() {
    let temp_dir = TempDir::new().unwrap();
    let file = write_declarations(&temp_dir, BODIES);

    let mut cmd = Command::cargo_bin("tenet").unwrap();
    cmd.arg("show").arg(&file);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("rock (Body)"))
        .stdout(predicate::str::contains("given"))
        .stdout(predicate::str::contains("3 component(s)"));
}

#[test]
fn test_cli_invalid_declarations() {
    let temp_dir = TempDir::new().unwrap();
    let file = write_declarations(&temp_dir, "{ \"classes\": 3 }");

    let mut cmd = Command::cargo_bin("tenet").unwrap();
    cmd.arg("show").arg(&file);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid model"));
}

#[test]
fn test_cli_missing_file() {
    let temp_dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("tenet").unwrap();
    cmd.arg("show").arg(temp_dir.path().join("nowhere.json"));

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Cannot read declarations"));
}
