//! Runtime configuration for the sweep components.
//!
//! These are the typed structs the core works with. They are separate from
//! the TOML-deserialized config in `fantune_config`.

use std::collections::BTreeMap;
use std::time::Duration;

/// Settle controller: poll cadence and the "stopped" RPM threshold.
#[derive(Debug, Clone)]
pub struct SettleCfg {
    pub tick: Duration,
    pub stop_rpm_threshold: u32,
}

impl Default for SettleCfg {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(100),
            stop_rpm_threshold: 100,
        }
    }
}

/// Overshoot measurement window: `ticks` polls, `tick` apart.
#[derive(Debug, Clone)]
pub struct MeasureCfg {
    pub tick: Duration,
    pub ticks: u32,
}

impl Default for MeasureCfg {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(100),
            ticks: 700,
        }
    }
}

/// Background telemetry logger.
#[derive(Debug, Clone)]
pub struct LoggerCfg {
    pub interval: Duration,
    pub serial_channel: u8,
    pub max_lines_per_tick: usize,
}

impl Default for LoggerCfg {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            serial_channel: 0,
            max_lines_per_tick: 256,
        }
    }
}

/// Full sweep: power schedule plus every component's settings.
#[derive(Debug, Clone)]
pub struct SweepCfg {
    pub min_power: f32,
    pub power_step: f32,
    /// Rest period between settling and measuring.
    pub settle_delay: Duration,
    pub overshoot_tolerance: f64,
    pub settle: SettleCfg,
    pub measure: MeasureCfg,
    pub logger: LoggerCfg,
    /// Rated max RPM per hardware variant.
    pub max_fan_rpm: BTreeMap<String, u32>,
}

impl Default for SweepCfg {
    fn default() -> Self {
        Self {
            min_power: 10.0,
            power_step: 10.0,
            settle_delay: Duration::from_secs(3),
            overshoot_tolerance: 0.10,
            settle: SettleCfg::default(),
            measure: MeasureCfg::default(),
            logger: LoggerCfg::default(),
            max_fan_rpm: fantune_config::default_max_fan_rpm(),
        }
    }
}
