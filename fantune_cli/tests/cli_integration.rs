use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Short sweep on the ideal simulated fan: 20%, 60%, 100%
fn write_fast_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[sweep]
min_power = 20.0
power_step = 40.0
tick_ms = 1
measure_ticks = 5
settle_delay_ms = 0

[logger]
interval_ms = 5
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["sweep"], 0, "Sweep complete: 3 steps", "stdout")]
#[case(&["sweep"], 0, "Fan power 60%: overshoot 0.00%, Max RPM 3900, Max power 60%", "stdout")]
#[case(&["sweep", "--min-power", "0"], 3, "Invalid configuration", "stderr")]
#[case(&["sweep", "--step", "abc"], 2, "invalid value", "stderr")]
#[case(&["self-check"], 0, "self-check ok: device 'sim' (max 6500 RPM)", "stdout")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);

    let mut cmd = Command::cargo_bin("fantune").unwrap();

    // Always include a valid config to avoid relying on default path
    cmd.arg("--config").arg(&cfg);
    for a in args {
        cmd.arg(a);
    }
    if args.first().copied() == Some("sweep") {
        cmd.arg("--log").arg(dir.path().join("fan_log"));
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn cli_reports_bad_rpm_table_header() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);

    let bad_csv = dir.path().join("rpm.csv");
    let mut f = fs::File::create(&bad_csv).unwrap();
    writeln!(f, "variant,rpm").unwrap();
    writeln!(f, "sim,6500").unwrap();

    let mut cmd = Command::cargo_bin("fantune").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("--rpm-table")
        .arg(&bad_csv)
        .arg("self-check");

    cmd.assert()
        .code(3)
        .stderr(predicate::str::contains("Invalid headers"));
}

#[rstest]
fn rpm_table_overrides_config() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);
    let csv = dir.path().join("rpm.csv");
    fs::write(&csv, "device_type,max_rpm\nsim,4000\n").unwrap();

    let mut cmd = Command::cargo_bin("fantune").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("--rpm-table")
        .arg(&csv)
        .arg("self-check");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("(max 4000 RPM)"));
}

#[rstest]
fn unknown_device_type_is_a_config_error() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, "[sim]\ndevice_type = \"quatro\"\n").unwrap();
    let log = dir.path().join("fan_log");

    let mut cmd = Command::cargo_bin("fantune").unwrap();
    cmd.arg("--config").arg(&cfg).arg("sweep").arg("--log").arg(&log);

    cmd.assert()
        .code(3)
        .stderr(predicate::str::contains("quatro"));
    // Rejected before the logger opened its file
    assert!(!log.exists());
}

#[rstest]
fn missing_config_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("fantune").unwrap();
    cmd.arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("self-check");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("self-check ok"));
}

#[rstest]
fn inspect_summarizes_a_sweep_log() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);
    let log = dir.path().join("fan_log");

    Command::cargo_bin("fantune")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("sweep")
        .arg("--log")
        .arg(&log)
        .assert()
        .success();

    // simulate a torn write from an interrupted run
    let mut f = fs::OpenOptions::new().append(true).open(&log).unwrap();
    write!(f, "{{\"time_elapsed\": 9.9, \"cmd_").unwrap();
    drop(f);

    Command::cargo_bin("fantune")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("inspect")
        .arg("--log")
        .arg(&log)
        .assert()
        .success()
        .stdout(predicate::str::contains("(1 skipped)"));
}

#[rstest]
fn inspect_missing_log_is_an_io_error() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("fantune").unwrap();
    cmd.arg("--config")
        .arg(write_fast_config(&dir))
        .arg("inspect")
        .arg("--log")
        .arg(dir.path().join("nope"));
    cmd.assert().code(5);
}
