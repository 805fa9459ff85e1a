//! Bring the fan to rest before a measurement.

use fantune_traits::FanDevice;
use fantune_traits::clock::Clock;

use crate::config::SettleCfg;
use crate::error::Result;
use crate::hw_error::device_err;

/// Polls between progress warnings while the fan is still spinning.
const WARN_EVERY_POLLS: u64 = 100;

/// Command zero power and block until the fan reads at or below
/// `cfg.stop_rpm_threshold`. Returns the final RPM reading.
///
/// There is no timeout. If the fan never slows below the threshold this
/// call does not return; only process termination ends the wait.
pub fn settle<D, C>(device: &D, cfg: &SettleCfg, clock: &C) -> Result<u32>
where
    D: FanDevice + ?Sized,
    C: Clock,
{
    let mut polls: u64 = 0;
    loop {
        device.set_fan_power(0.0).map_err(device_err)?;
        let rpm = device.fan_rpm().map_err(device_err)?;
        if rpm <= cfg.stop_rpm_threshold {
            tracing::debug!(rpm, polls, "fan settled");
            return Ok(rpm);
        }

        polls += 1;
        if polls % WARN_EVERY_POLLS == 0 {
            tracing::warn!(rpm, polls, threshold = cfg.stop_rpm_threshold, "fan still spinning");
        } else {
            tracing::debug!(rpm, "waiting for fan to stop");
        }
        clock.sleep(cfg.tick);
    }
}
