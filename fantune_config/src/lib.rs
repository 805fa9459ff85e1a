#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and max-RPM table parsing for the fan sweep harness.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//!   Every section has defaults, so an empty document is a valid config.
//! - The max-RPM table CSV loader enforces exact headers and rejects
//!   duplicate or zero entries.
use serde::Deserialize;
use std::collections::BTreeMap;

/// Max-RPM table CSV schema.
///
/// Expected headers:
/// device_type,max_rpm
///
/// Example:
/// device_type,max_rpm
/// dos,6500
/// tres,6600
#[derive(Debug, Deserialize, Clone)]
pub struct MaxRpmRow {
    pub device_type: String,
    pub max_rpm: u32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SweepCfg {
    /// First commanded power of the sweep (percent).
    pub min_power: f32,
    /// Increment between power levels (percent).
    pub power_step: f32,
    /// Polling quantum shared by settle and measurement loops.
    pub tick_ms: u64,
    /// Number of ticks in one measurement window.
    pub measure_ticks: u32,
    /// Rest period after settling, before the next measurement starts.
    pub settle_delay_ms: u64,
    /// Fan counts as stopped at or below this RPM.
    pub stop_rpm_threshold: u32,
    /// Steps whose |overshoot| exceeds this ratio are flagged in the report.
    pub overshoot_tolerance: f64,
}

impl Default for SweepCfg {
    fn default() -> Self {
        Self {
            min_power: 10.0,
            power_step: 10.0,
            tick_ms: 100,
            measure_ticks: 700,
            settle_delay_ms: 3000,
            stop_rpm_threshold: 100,
            overshoot_tolerance: 0.10,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggerCfg {
    /// Telemetry log (JSON lines, append-only)
    pub path: String,
    pub interval_ms: u64,
    /// Serial channel carrying the firmware's fan telemetry lines
    pub serial_channel: u8,
    /// Upper bound on lines drained in a single tick
    pub max_lines_per_tick: usize,
}

impl Default for LoggerCfg {
    fn default() -> Self {
        Self {
            path: "/tmp/fan_log".to_string(),
            interval_ms: 100,
            serial_channel: 0,
            max_lines_per_tick: 256,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimCfg {
    /// Hardware variant the simulated device reports
    pub device_type: String,
    /// Fraction of the remaining RPM error closed on each sensor read, (0, 1]
    pub response: f32,
    /// Peak overshoot ratio applied right after a power change
    pub overshoot: f32,
    /// Emit a stall event every N sensor reads at nonzero power (0 disables)
    pub stall_every: u32,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            device_type: "sim".to_string(),
            response: 1.0,
            overshoot: 0.0,
            stall_every: 0,
        }
    }
}

/// Rated max RPM per hardware variant.
pub fn default_max_fan_rpm() -> BTreeMap<String, u32> {
    [
        ("uno", 5100),
        ("dos", 6500),
        ("red_panda", 6500),
        ("tres", 6600),
        ("sim", 6500),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sweep: SweepCfg,
    #[serde(default)]
    pub logger: LoggerCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default = "default_max_fan_rpm")]
    pub max_fan_rpm: BTreeMap<String, u32>,
    #[serde(default)]
    pub sim: SimCfg,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sweep: SweepCfg::default(),
            logger: LoggerCfg::default(),
            logging: Logging::default(),
            max_fan_rpm: default_max_fan_rpm(),
            sim: SimCfg::default(),
        }
    }
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

pub fn load_max_rpm_csv(path: &std::path::Path) -> eyre::Result<BTreeMap<String, u32>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open max rpm CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["device_type", "max_rpm"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "max rpm CSV must have headers 'device_type,max_rpm', got: {}",
            actual.join(",")
        );
    }

    let mut table = BTreeMap::new();
    for (idx, rec) in rdr.deserialize::<MaxRpmRow>().enumerate() {
        let row = rec.map_err(|e| eyre::eyre!("invalid CSV row {}: {}", idx + 2, e))?;
        if row.device_type.is_empty() {
            eyre::bail!("invalid CSV row {}: empty device_type", idx + 2);
        }
        if row.max_rpm == 0 {
            eyre::bail!("invalid CSV row {}: max_rpm must be > 0", idx + 2);
        }
        if table.insert(row.device_type.clone(), row.max_rpm).is_some() {
            eyre::bail!(
                "max rpm CSV lists device type '{}' more than once",
                row.device_type
            );
        }
    }
    if table.is_empty() {
        eyre::bail!("max rpm CSV has no rows");
    }
    Ok(table)
}

impl Config {
    /// Merge a table loaded from CSV; CSV entries win over TOML ones.
    pub fn merge_max_rpm(&mut self, table: BTreeMap<String, u32>) {
        self.max_fan_rpm.extend(table);
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Sweep
        let s = &self.sweep;
        if !(s.min_power > 0.0 && s.min_power <= 100.0) {
            eyre::bail!("sweep.min_power must be in (0, 100]");
        }
        if !(s.power_step > 0.0 && s.power_step <= 100.0) {
            eyre::bail!("sweep.power_step must be in (0, 100]");
        }
        if s.tick_ms == 0 {
            eyre::bail!("sweep.tick_ms must be >= 1");
        }
        if s.measure_ticks == 0 {
            eyre::bail!("sweep.measure_ticks must be >= 1");
        }
        if s.settle_delay_ms > 10 * 60 * 1000 {
            eyre::bail!("sweep.settle_delay_ms is unreasonably large (>10min)");
        }
        if !(s.overshoot_tolerance.is_finite() && s.overshoot_tolerance >= 0.0) {
            eyre::bail!("sweep.overshoot_tolerance must be >= 0.0");
        }

        // Logger
        if self.logger.path.trim().is_empty() {
            eyre::bail!("logger.path must not be empty");
        }
        if self.logger.interval_ms == 0 {
            eyre::bail!("logger.interval_ms must be >= 1");
        }
        if self.logger.max_lines_per_tick == 0 {
            eyre::bail!("logger.max_lines_per_tick must be >= 1");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        // Max RPM table
        if self.max_fan_rpm.is_empty() {
            eyre::bail!("max_fan_rpm table must not be empty");
        }
        if let Some((name, _)) = self.max_fan_rpm.iter().find(|(_, rpm)| **rpm == 0) {
            eyre::bail!("max_fan_rpm.{name} must be > 0");
        }

        // Simulator
        if !(self.sim.response > 0.0 && self.sim.response <= 1.0) {
            eyre::bail!("sim.response must be in (0.0, 1.0]");
        }
        if !(self.sim.overshoot >= 0.0 && self.sim.overshoot <= 1.0) {
            eyre::bail!("sim.overshoot must be in [0.0, 1.0]");
        }

        Ok(())
    }
}
