use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[sweep]
min_power = 25.0
power_step = 25.0
tick_ms = 1
measure_ticks = 10
settle_delay_ms = 0

[logger]
interval_ms = 1

[sim]
stall_every = 3
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn run_json_sweep(dir: &tempfile::TempDir) -> (String, PathBuf) {
    let cfg = write_config(dir);
    let log = dir.path().join("fan_log");
    let mut cmd = Command::cargo_bin("fantune").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg("sweep")
        .arg("--log")
        .arg(&log);
    let out = cmd.assert().success().get_output().stdout.clone();
    (String::from_utf8_lossy(&out).into_owned(), log)
}

/// Every stdout line is JSON: one object per step, then a summary.
#[rstest]
fn step_lines_and_summary_schema() {
    let dir = tempdir().unwrap();
    let (stdout, _) = run_json_sweep(&dir);

    let values: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).expect("valid JSON line"))
        .collect();
    assert_eq!(values.len(), 5, "stdout was: {stdout}");

    let powers: Vec<f64> = values[..4]
        .iter()
        .map(|v| v["power"].as_f64().unwrap())
        .collect();
    assert_eq!(powers, vec![25.0, 50.0, 75.0, 100.0]);
    for v in &values[..4] {
        assert!(v["overshoot_ratio"].as_f64().is_some());
        assert!(v["max_rpm"].as_u64().is_some());
        assert!(v["max_power"].as_u64().is_some());
        assert!(v["within_tolerance"].as_bool().is_some());
    }

    let summary = &values[4]["summary"];
    assert_eq!(summary["steps"], 4);
    assert_eq!(summary["device_type"], "sim");
    assert_eq!(summary["device_max_rpm"], 6500);
    assert!(summary["log_records"].as_u64().is_some());
}

/// The telemetry log holds one flat JSON object per line.
#[rstest]
fn telemetry_log_schema() {
    let dir = tempdir().unwrap();
    let (_, log) = run_json_sweep(&dir);

    let text = fs::read_to_string(&log).unwrap();
    assert!(text.ends_with('\n'));
    let mut last_t = 0.0;
    for line in text.lines() {
        let v: serde_json::Value = serde_json::from_str(line).expect("valid JSON");
        let t = v["time_elapsed"].as_f64().unwrap();
        assert!(t >= last_t);
        last_t = t;
        let cmd = v["cmd_power"].as_f64().unwrap();
        assert!((0.0..=100.0).contains(&cmd));
        for key in [
            "pwm_power",
            "target_rpm",
            "rpm_fast",
            "rpm",
            "stall_counter",
            "total_stall_count",
        ] {
            assert!(v[key].as_u64().is_some(), "{key} missing in {line}");
        }
    }
}
