use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

/// A link drop mid-sweep must abort with the device exit code, and the
/// telemetry log must never show the power that failed to apply.
#[test]
fn link_drop_aborts_sweep_with_device_exit_code() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(
        &cfg,
        r#"
[sweep]
tick_ms = 1
measure_ticks = 5
settle_delay_ms = 0

[logger]
interval_ms = 2
"#,
    )
    .unwrap();
    let log = dir.path().join("fan_log");

    let mut cmd = Command::cargo_bin("fantune").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("sweep")
        .arg("--log")
        .arg(&log)
        .env("FANTUNE_TEST_SIM_FAIL_AT_POWER", "50");

    cmd.assert()
        .code(4)
        .stdout(predicate::str::contains("Fan power 40%"))
        .stdout(predicate::str::contains("Fan power 50%").not())
        .stderr(predicate::str::contains("device disconnected"));

    let text = fs::read_to_string(&log).unwrap();
    let powers: Vec<f64> = text
        .lines()
        .filter_map(|l| serde_json::from_str::<serde_json::Value>(l).ok())
        .filter_map(|v| v["cmd_power"].as_f64())
        .collect();
    assert!(!powers.is_empty(), "no telemetry records written");
    assert!(powers.iter().all(|&p| p <= 40.0), "powers: {powers:?}");
}

#[test]
fn link_drop_json_error_names_the_device() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(
        &cfg,
        "[sweep]\ntick_ms = 1\nmeasure_ticks = 2\nsettle_delay_ms = 0\n",
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("fantune").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("off")
        .arg("--config")
        .arg(&cfg)
        .arg("sweep")
        .arg("--log")
        .arg(dir.path().join("fan_log"))
        .env("FANTUNE_TEST_SIM_FAIL_AT_POWER", "10");

    let out = cmd.assert().code(4).get_output().stderr.clone();
    let stderr = String::from_utf8_lossy(&out);
    let line = stderr
        .lines()
        .find(|l| l.contains("\"reason\""))
        .unwrap_or_else(|| panic!("no JSON error line; stderr was: {stderr}"));
    let v: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(v["reason"], "Device");
    assert!(v["error"].as_str().unwrap().contains("device disconnected"));
}
