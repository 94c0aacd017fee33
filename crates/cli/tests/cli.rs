use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn configs(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../configs")
        .join(relative)
}

#[test]
fn windows_lists_aligned_opportunities() {
    Command::cargo_bin("lunar-windows")
        .expect("lunar-windows bin")
        .arg("--config")
        .arg(configs("missions/lunar_transfer.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("=== Launch Windows: Kennedy LC-39A ==="))
        .stdout(predicate::str::contains("Best overall"))
        .stdout(predicate::str::contains("Aligned         :\n"));
}

#[test]
fn windows_json_is_machine_readable() {
    let output = Command::cargo_bin("lunar-windows")
        .expect("lunar-windows bin")
        .arg("--config")
        .arg(configs("missions/lunar_transfer.toml"))
        .args(["--days", "2", "--json"])
        .output()
        .expect("run lunar-windows");
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json output");
    let aligned = value["aligned"].as_array().expect("aligned array");
    assert!(!aligned.is_empty());
    for window in aligned {
        assert!(window["raan_error_deg"].as_f64().expect("raan error").abs() <= 5.0);
    }
    assert!(value["best"]["quality_score"].as_f64().is_some());
}

#[test]
fn windows_rejects_bad_start_epoch() {
    Command::cargo_bin("lunar-windows")
        .expect("lunar-windows bin")
        .arg("--config")
        .arg(configs("missions/lunar_transfer.toml"))
        .args(["--start", "not-a-date"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not-a-date"));
}

#[test]
fn plan_prints_burn_and_corrector_audit() {
    Command::cargo_bin("lunar-plan")
        .expect("lunar-plan bin")
        .arg("--config")
        .arg(configs("missions/inline_vehicle.yaml"))
        .arg("--estimate-hohmann")
        .assert()
        .success()
        .stdout(predicate::str::contains("Vehicle         : Heavy TLI Stage"))
        .stdout(predicate::str::contains("Burn            :"))
        .stdout(predicate::str::contains("--- Corrector ---"))
        .stdout(predicate::str::contains("  #0 "))
        .stdout(predicate::str::contains("Converged       :"))
        .stdout(predicate::str::contains("Hohmann est."));
}

#[test]
fn plan_uses_catalog_vehicle_from_manifest() {
    Command::cargo_bin("lunar-plan")
        .expect("lunar-plan bin")
        .arg("--config")
        .arg(configs("missions/lunar_transfer.toml"))
        .arg("--vehicles")
        .arg(configs("vehicles"))
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"Cryogenic Upper Stage\""))
        .stdout(predicate::str::contains("\"iterations\""));
}

#[test]
fn plan_reports_unknown_vehicle() {
    Command::cargo_bin("lunar-plan")
        .expect("lunar-plan bin")
        .arg("--config")
        .arg(configs("missions/lunar_transfer.toml"))
        .arg("--vehicles")
        .arg(configs("vehicles"))
        .args(["--vehicle", "Saturn V"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Saturn V"));
}

#[test]
fn plan_reads_a_yaml_catalog() {
    let dir = tempfile::tempdir().expect("tempdir");
    let catalog = dir.path().join("vehicles.yaml");
    let mut file = File::create(&catalog).expect("catalog create");
    writeln!(
        file,
        "- name: Test Stage\n  dry_mass_kg: 8000\n  propellant_mass_kg: 22000\n  engine:\n    thrust_n: 2000000\n    isp_s: 450"
    )
    .expect("catalog write");

    Command::cargo_bin("lunar-plan")
        .expect("lunar-plan bin")
        .arg("--config")
        .arg(configs("missions/lunar_transfer.toml"))
        .arg("--vehicles")
        .arg(&catalog)
        .args(["--vehicle", "test stage"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Vehicle         : Test Stage"));
}

#[test]
fn plan_requires_a_config() {
    Command::cargo_bin("lunar-plan")
        .expect("lunar-plan bin")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--config"));
}
