//! CLI integration tests for the `lineage` binary.
//!
//! Uses `assert_cmd` to spawn the binary and verify exit codes, stdout
//! and stderr. Simulations run against the built-in pipeline with the
//! processing hold disabled so runs finish immediately.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn lineage() -> Command {
    let mut cmd = cargo_bin_cmd!("lineage");
    for var in [
        "LINEAGE_SERVICE_URL",
        "LINEAGE_SETTLE_MS",
        "LINEAGE_PORT",
        "LINEAGE_RATE_LIMIT",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd.env("LINEAGE_SETTLE_MS", "0");
    cmd
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    lineage()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Transaction lineage simulator"));
}

#[test]
fn version_exits_0() {
    lineage()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("lineage"));
}

#[test]
fn offline_conflicts_with_service_url() {
    lineage()
        .args(["run", "--offline", "--service-url", "http://x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

// ──────────────────────────────────────────────
// 2. steps
// ──────────────────────────────────────────────

#[test]
fn steps_offline_lists_six_steps() {
    lineage()
        .args(["steps", "--offline"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1. Trade Capture (Front Office)"))
        .stdout(predicate::str::contains("6. Regulatory Reporting (Compliance)"));
}

#[test]
fn steps_json_output() {
    let output = lineage()
        .args(["--output", "json", "steps", "--offline"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let steps: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(steps.as_array().unwrap().len(), 6);
    assert_eq!(steps[3]["name"], "Risk Calculation");
}

#[test]
fn unreachable_service_exits_1() {
    lineage()
        .args(["steps", "--service-url", "http://127.0.0.1:9"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error:"));
}

// ──────────────────────────────────────────────
// 3. run
// ──────────────────────────────────────────────

#[test]
fn run_offline_reaches_completion() {
    lineage()
        .args(["run", "--offline"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Transaction ID: TXN-"))
        .stdout(predicate::str::contains("Transaction processing complete!"));
}

#[test]
fn run_json_reports_final_session() {
    let output = lineage()
        .args(["--output", "json", "run", "--offline"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let out: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(out["session"]["status"], "completed");
    assert_eq!(out["session"]["current_step"], 5);
    assert_eq!(out["view"]["screen"], "simulation");
}

#[test]
fn run_stops_after_requested_steps() {
    let output = lineage()
        .args(["--output", "json", "run", "--offline", "--steps", "2"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let out: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(out["session"]["status"], "ready");
    assert_eq!(out["session"]["current_step"], 2);
}

#[test]
fn run_against_unreachable_service_fails_initialization() {
    lineage()
        .args(["run", "--service-url", "http://127.0.0.1:9"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "Failed to initialize transaction simulation",
        ));
}

// ──────────────────────────────────────────────
// 4. shell
// ──────────────────────────────────────────────

#[test]
fn shell_routes_commands() {
    lineage()
        .args(["shell", "--offline"])
        .write_stdin("zoom in\npanel toggle\ndown 100 300\nmove 150 320\nup\nhelp\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("zoom 110%"))
        .stdout(predicate::str::contains("(minimized)"))
        .stdout(predicate::str::contains("ViewportMoved"))
        .stdout(predicate::str::contains("offset (50, 20)"))
        .stdout(predicate::str::contains("process to the next step"));
}

#[test]
fn shell_finishes_initialization_when_input_ends() {
    lineage()
        .args(["shell", "--offline"])
        .write_stdin("view\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[ready] step 1/6 Trade Capture"));
}

#[test]
fn shell_back_command_ends_the_session() {
    lineage()
        .args(["shell", "--offline"])
        .write_stdin("back\nzoom in\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Left the simulation."))
        .stdout(predicate::str::contains("zoom 110%").not());
}

#[test]
fn shell_back_control_ends_the_session() {
    // The Back control sits at (16, 16) with size 140x32.
    lineage()
        .args(["shell", "--offline"])
        .write_stdin("down 80 30\nzoom in\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Control(Back)"))
        .stdout(predicate::str::contains("Left the simulation."))
        .stdout(predicate::str::contains("zoom 110%").not());
}

#[test]
fn shell_reports_unknown_commands() {
    lineage()
        .args(["shell", "--offline"])
        .write_stdin("fly\nquit\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("unknown command 'fly'"));
}

// ──────────────────────────────────────────────
// 5. Configuration
// ──────────────────────────────────────────────

#[test]
fn config_file_sets_service_url() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lineage.toml");
    fs::write(
        &path,
        "[service]\nbase_url = \"http://127.0.0.1:9\"\ntimeout_secs = 2\n",
    )
    .unwrap();

    lineage()
        .arg("--config")
        .arg(&path)
        .arg("steps")
        .assert()
        .failure()
        .stderr(predicate::str::contains("127.0.0.1:9"));
}

#[test]
fn malformed_config_exits_1() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[service\n").unwrap();

    lineage()
        .arg("--config")
        .arg(&path)
        .args(["steps", "--offline"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("could not parse"));
}

#[test]
fn invalid_env_value_exits_1() {
    lineage()
        .env("LINEAGE_SETTLE_MS", "later")
        .args(["steps", "--offline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("LINEAGE_SETTLE_MS"));
}
