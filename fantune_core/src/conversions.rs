//! `From` implementations bridging `fantune_config` types to `fantune_core` types.

use std::time::Duration;

use crate::config::{LoggerCfg, MeasureCfg, SettleCfg, SweepCfg};

// ── LoggerCfg ────────────────────────────────────────────────────────────────

impl From<&fantune_config::LoggerCfg> for LoggerCfg {
    fn from(c: &fantune_config::LoggerCfg) -> Self {
        Self {
            interval: Duration::from_millis(c.interval_ms),
            serial_channel: c.serial_channel,
            max_lines_per_tick: c.max_lines_per_tick,
        }
    }
}

// ── SettleCfg / MeasureCfg ───────────────────────────────────────────────────

impl From<&fantune_config::SweepCfg> for SettleCfg {
    fn from(c: &fantune_config::SweepCfg) -> Self {
        Self {
            tick: Duration::from_millis(c.tick_ms),
            stop_rpm_threshold: c.stop_rpm_threshold,
        }
    }
}

impl From<&fantune_config::SweepCfg> for MeasureCfg {
    fn from(c: &fantune_config::SweepCfg) -> Self {
        Self {
            tick: Duration::from_millis(c.tick_ms),
            ticks: c.measure_ticks,
        }
    }
}

// ── SweepCfg ─────────────────────────────────────────────────────────────────

impl From<&fantune_config::Config> for SweepCfg {
    fn from(c: &fantune_config::Config) -> Self {
        Self {
            min_power: c.sweep.min_power,
            power_step: c.sweep.power_step,
            settle_delay: Duration::from_millis(c.sweep.settle_delay_ms),
            overshoot_tolerance: c.sweep.overshoot_tolerance,
            settle: (&c.sweep).into(),
            measure: (&c.sweep).into(),
            logger: (&c.logger).into(),
            max_fan_rpm: c.max_fan_rpm.clone(),
        }
    }
}
