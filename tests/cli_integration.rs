//! Runs the binary end to end.

use std::fs;
use std::process::Command;

fn erp_sim() -> Command {
    Command::new(env!("CARGO_BIN_EXE_erp-sim"))
}

#[test]
fn generator_scenario_writes_json_and_csv() {
    let dir = std::env::temp_dir();
    let json_path = dir.join(format!("erp-sim-cli-{}.json", std::process::id()));
    let csv_path = dir.join(format!("erp-sim-cli-{}.csv", std::process::id()));

    let output = erp_sim()
        .args(["--scenario", "scenarios/generator_only.toml", "--threads", "2"])
        .arg("--json-out")
        .arg(&json_path)
        .arg("--csv-out")
        .arg(&csv_path)
        .output()
        .expect("erp-sim process should run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ERP Report"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json_path).expect("json written"))
            .expect("valid json");
    for d in ["1", "4", "8"] {
        assert_eq!(json["probs_of_surviving"][d], 1.0);
    }
    assert_eq!(json["starts_evaluated"], 8760);

    let csv = fs::read_to_string(&csv_path).expect("csv written");
    assert_eq!(csv.lines().count(), 4);

    fs::remove_file(&json_path).ok();
    fs::remove_file(&csv_path).ok();
}

#[test]
fn seed_and_trials_overrides_apply() {
    let dir = std::env::temp_dir();
    let json_path = dir.join(format!("erp-sim-cli-trials-{}.json", std::process::id()));
    let output = erp_sim()
        .args(["--preset", "generator_only", "--trials", "2", "--seed", "9"])
        .arg("--json-out")
        .arg(&json_path)
        .output()
        .expect("erp-sim process should run");
    assert!(output.status.success());

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json_path).expect("json written"))
            .expect("valid json");
    assert_eq!(json["num_trials"], 2);
    fs::remove_file(&json_path).ok();
}

#[test]
fn unknown_preset_fails() {
    let output = erp_sim()
        .args(["--preset", "nope"])
        .output()
        .expect("erp-sim process should run");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown preset"));
}

#[test]
fn invalid_override_reports_field() {
    let output = erp_sim()
        .args(["--preset", "generator_only", "--trials", "0"])
        .output()
        .expect("erp-sim process should run");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("simulation.num_trials"));
}

#[test]
fn help_exits_cleanly() {
    let output = erp_sim().arg("--help").output().expect("erp-sim process should run");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--scenario"));
}
