mod cli;
mod error_fmt;
mod sweep;

use std::path::Path;

use clap::Parser;
use eyre::Result;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

use fantune_config::{Config, Logging};
use fantune_core::error::{FanError, Report};
use fantune_core::{LogSummary, read_records, resolve_max_rpm};
use fantune_traits::FanDevice;

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::sweep::{SweepOverrides, build_device, run_sweep};

fn main() {
    // Pretty panic reports; failure to install only loses formatting
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = run(cli) {
        tracing::error!(error = %e, "fantune failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn run(cli: Cli) -> Result<()> {
    let (cfg, found) = load_config(&cli.config, cli.rpm_table.as_deref())?;
    init_tracing(cli.json, &cli.log_level, &cfg.logging);
    if !found {
        tracing::info!(path = %cli.config.display(), "config not found; using defaults");
    }

    match cli.cmd {
        Commands::Sweep {
            log,
            min_power,
            step,
            ticks,
        } => {
            let overrides = SweepOverrides {
                log,
                min_power,
                step,
                ticks,
            };
            run_sweep(&cfg, &overrides, cli.json)?;
        }
        Commands::Inspect { log } => inspect(&log, cli.json)?,
        Commands::SelfCheck => self_check(&cfg, cli.json)?,
    }
    Ok(())
}

/// Load and validate the config. Returns whether the file existed.
fn load_config(path: &Path, rpm_table: Option<&Path>) -> Result<(Config, bool)> {
    let found = path.exists();
    let mut cfg = if found {
        let text = std::fs::read_to_string(path)
            .map_err(|e| FanError::Io(format!("read config {}: {e}", path.display())))?;
        fantune_config::load_toml(&text)
            .map_err(|e| FanError::Config(format!("{}: {e}", path.display())))?
    } else {
        Config::default()
    };

    if let Some(csv) = rpm_table {
        let table = fantune_config::load_max_rpm_csv(csv)
            .map_err(|e| FanError::Config(format!("{e:#}")))?;
        cfg.merge_max_rpm(table);
    }
    cfg.validate()
        .map_err(|e| FanError::Config(e.to_string()))?;
    Ok((cfg, found))
}

fn init_tracing(json: bool, level: &str, logging: &Logging) {
    // RUST_LOG wins over --log-level
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    // stdout carries results; diagnostics go to stderr
    if json {
        layers.push(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_filter(console_filter)
                .boxed(),
        );
    } else {
        layers.push(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(console_filter)
                .boxed(),
        );
    }

    if let Some(file) = &logging.file {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map_or_else(|| "fantune.log".into(), |n| n.to_os_string());
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let file_level = logging.level.as_deref().unwrap_or("info");
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(EnvFilter::new(file_level))
                .boxed(),
        );
    }

    // A second init (tests) keeps the first subscriber
    let _ = tracing_subscriber::registry().with(layers).try_init();
}

fn inspect(log: &Path, json: bool) -> Result<()> {
    let readout = read_records(log)?;
    let summary: LogSummary = readout.summary();
    if json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        println!(
            "{}: {} records ({} skipped) over {:.1} s; peak {} RPM, peak power {}%, {} stall events",
            log.display(),
            summary.records,
            summary.skipped,
            summary.duration_s,
            summary.peak_rpm,
            summary.peak_pwm_power,
            summary.stall_events
        );
    }
    Ok(())
}

fn self_check(cfg: &Config, json: bool) -> Result<()> {
    let device = build_device(cfg);
    let (device_type, max_rpm) = resolve_max_rpm(&device, &cfg.max_fan_rpm)?;
    let device_err = |e: fantune_traits::DeviceError| {
        Report::new(fantune_core::map_device_error(e.as_ref()))
    };
    let rpm = device.fan_rpm().map_err(device_err)?;
    let health = device.health().map_err(device_err)?;

    if json {
        let obj = serde_json::json!({
            "ok": true,
            "device_type": device_type,
            "device_max_rpm": max_rpm,
            "rpm": rpm,
            "fan_power": health.fan_power,
            "fan_stall_count": health.fan_stall_count,
        });
        println!("{obj}");
    } else {
        println!(
            "self-check ok: device '{device_type}' (max {max_rpm} RPM), rpm {rpm}, power {}%, stalls {}",
            health.fan_power, health.fan_stall_count
        );
    }
    Ok(())
}
