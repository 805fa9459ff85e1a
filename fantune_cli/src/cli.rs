//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "fantune", version, about = "Fan overshoot characterization")]
pub struct Cli {
    /// Path to config TOML (a missing file means built-in defaults)
    #[arg(long, value_name = "FILE", default_value = "etc/fantune.toml")]
    pub config: PathBuf,

    /// Optional max RPM table CSV (strict header: device_type,max_rpm)
    #[arg(long = "rpm-table", value_name = "FILE")]
    pub rpm_table: Option<PathBuf>,

    /// Print results and logs as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sweep fan power from the minimum to 100% and measure overshoot at each step
    Sweep {
        /// Telemetry log file (appended; overrides logger.path)
        #[arg(long, value_name = "FILE")]
        log: Option<PathBuf>,
        /// First power level in percent (overrides sweep.min_power)
        #[arg(long = "min-power", value_name = "P")]
        min_power: Option<f32>,
        /// Power increment in percent (overrides sweep.power_step)
        #[arg(long, value_name = "P")]
        step: Option<f32>,
        /// Measurement window length in polls (overrides sweep.measure_ticks)
        #[arg(long, value_name = "N")]
        ticks: Option<u32>,
    },
    /// Summarize a telemetry log written by a previous sweep
    Inspect {
        #[arg(long, value_name = "FILE")]
        log: PathBuf,
    },
    /// Quick health check: build the device, resolve its max RPM, read sensors
    SelfCheck,
}
