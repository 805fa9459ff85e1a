//! Fixed-window overshoot measurement.

use serde::Serialize;

use fantune_traits::FanDevice;
use fantune_traits::clock::Clock;

use crate::config::MeasureCfg;
use crate::error::{FanError, Report, Result};
use crate::hw_error::device_err;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OvershootResult {
    pub overshoot_ratio: f64,
    pub max_rpm: u32,
    pub max_power: u32,
}

/// `max_rpm / expected - 1`, with `expected = device_max_rpm * power / 100`.
pub fn overshoot_ratio(max_rpm: u32, device_max_rpm: u32, power: f32) -> Result<f64> {
    if !(power.is_finite() && power > 0.0) {
        return Err(Report::new(FanError::InvalidPower(power)));
    }
    if device_max_rpm == 0 {
        return Err(Report::new(FanError::Config(
            "device max rpm must be > 0".into(),
        )));
    }
    let expected = f64::from(device_max_rpm) * f64::from(power) / 100.0;
    Ok(f64::from(max_rpm) / expected - 1.0)
}

/// Command `power` and sample RPM and reported power for exactly
/// `cfg.ticks` polls, then compute the overshoot ratio.
///
/// The fan must already be at rest. The window always runs to completion;
/// it does not stop early once the reading stabilizes.
pub fn measure<D, C>(
    device: &D,
    power: f32,
    device_max_rpm: u32,
    cfg: &MeasureCfg,
    clock: &C,
) -> Result<OvershootResult>
where
    D: FanDevice + ?Sized,
    C: Clock,
{
    if !(power.is_finite() && power > 0.0) {
        return Err(Report::new(FanError::InvalidPower(power)));
    }
    device.set_fan_power(power).map_err(device_err)?;

    let mut max_rpm = 0u32;
    let mut max_power = 0u32;
    for _ in 0..cfg.ticks {
        let rpm = device.fan_rpm().map_err(device_err)?;
        max_rpm = max_rpm.max(rpm);
        let health = device.health().map_err(device_err)?;
        max_power = max_power.max(health.fan_power);
        clock.sleep(cfg.tick);
    }

    let overshoot_ratio = overshoot_ratio(max_rpm, device_max_rpm, power)?;
    tracing::debug!(power, max_rpm, max_power, overshoot_ratio, "measurement window done");
    Ok(OvershootResult {
        overshoot_ratio,
        max_rpm,
        max_power,
    })
}
