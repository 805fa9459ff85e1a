use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use fantune_traits::FanDevice;
use fantune_traits::clock::Clock;

use crate::cancel::CancelToken;
use crate::config::SweepCfg;
use crate::error::{FanError, Report, Result};
use crate::hw_error::device_err;
use crate::logger::{LoggerStats, TelemetryLogger};
use crate::overshoot::{OvershootResult, measure};
use crate::settle::settle;

/// Top of every sweep (percent).
pub const MAX_POWER: f32 = 100.0;

#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub power: f32,
    #[serde(flatten)]
    pub result: OvershootResult,
    /// |overshoot_ratio| within the configured tolerance
    pub within_tolerance: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub device_type: String,
    pub device_max_rpm: u32,
    pub steps: Vec<StepResult>,
    pub logger: LoggerStats,
}

/// Ascending power schedule `min, min + step, …` up to and including `max`.
pub fn power_levels(min_power: f32, power_step: f32, max_power: f32) -> Vec<f32> {
    if !(min_power > 0.0 && min_power <= max_power && power_step > 0.0) {
        return Vec::new();
    }
    // Index-based so float steps don't accumulate error past the top
    let n = ((max_power - min_power) / power_step + 1e-4).floor() as usize;
    (0..=n)
        .map(|i| (min_power + i as f32 * power_step).min(max_power))
        .collect()
}

/// Look up the rated max RPM for the connected hardware variant.
pub fn resolve_max_rpm<D: FanDevice + ?Sized>(
    device: &D,
    table: &BTreeMap<String, u32>,
) -> Result<(String, u32)> {
    let device_type = device.device_type().map_err(device_err)?;
    match table.get(&device_type) {
        Some(&rpm) if rpm > 0 => Ok((device_type, rpm)),
        _ => Err(Report::new(FanError::Config(format!(
            "no max fan RPM configured for device type '{device_type}'"
        )))),
    }
}

/// One-shot overshoot sweep with background telemetry logging.
pub struct Sweep<D: ?Sized, C> {
    device: Arc<D>,
    cfg: SweepCfg,
    clock: C,
    cancel: CancelToken,
}

impl<D, C> Sweep<D, C>
where
    D: FanDevice + Send + Sync + ?Sized + 'static,
    C: Clock + Clone + Send + 'static,
{
    pub fn new(device: Arc<D>, cfg: SweepCfg, clock: C) -> Self {
        Self {
            device,
            cfg,
            clock,
            cancel: CancelToken::new(),
        }
    }

    /// Cancellation flag handed to the telemetry logger.
    ///
    /// The sweep sets it exactly once, at teardown. Setting it from outside
    /// (e.g. a signal handler) stops the logger, which zeroes the fan.
    pub fn token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn run(self, log_path: &Path) -> Result<SweepReport> {
        self.run_with(log_path, |_| {})
    }

    /// Run the sweep, calling `on_step` after each power level is measured.
    pub fn run_with<F>(self, log_path: &Path, mut on_step: F) -> Result<SweepReport>
    where
        F: FnMut(&StepResult),
    {
        // Configuration problems surface before the fan is touched
        let (device_type, device_max_rpm) = resolve_max_rpm(&*self.device, &self.cfg.max_fan_rpm)?;
        let levels = power_levels(self.cfg.min_power, self.cfg.power_step, MAX_POWER);
        if levels.is_empty() {
            return Err(Report::new(FanError::Config(format!(
                "empty power schedule (min {}%, step {}%)",
                self.cfg.min_power, self.cfg.power_step
            ))));
        }
        tracing::info!(
            device_type = %device_type,
            device_max_rpm,
            steps = levels.len(),
            log = %log_path.display(),
            "sweep start"
        );

        let logger = TelemetryLogger::start_with_token(
            self.device.clone(),
            0.0,
            log_path,
            self.cfg.logger.clone(),
            self.clock.clone(),
            self.cancel.clone(),
        )?;

        let outcome = self.measure_levels(&levels, device_max_rpm, &logger, &mut on_step);

        // Teardown runs on every path; the logger zeroes the fan on exit
        let interrupted = !self.cancel.cancel();
        if interrupted {
            tracing::info!("sweep interrupted");
        }
        let logger_outcome = logger.join();
        if logger_outcome.is_err() || interrupted {
            // The logger zeroed the fan when it stopped, but the sweep may
            // have commanded power again since
            if let Err(e) = self.device.set_fan_power(0.0) {
                tracing::error!(error = %e, "failed to force fan power to zero");
            }
        }

        match (outcome, logger_outcome) {
            (Ok(steps), Ok(stats)) => {
                tracing::info!(steps = steps.len(), "sweep complete");
                Ok(SweepReport {
                    device_type,
                    device_max_rpm,
                    steps,
                    logger: stats,
                })
            }
            (Ok(_), Err(le)) => Err(le),
            (Err(e), Ok(_)) => {
                tracing::error!(error = %e, "sweep aborted");
                Err(e)
            }
            (Err(e), Err(le)) => {
                // A dead logger is the root cause when the sweep noticed it
                let logger_first = matches!(e.downcast_ref::<FanError>(), Some(FanError::Logger(_)));
                let (primary, secondary) = if logger_first { (le, e) } else { (e, le) };
                tracing::error!(error = %primary, also = %secondary, "sweep aborted");
                Err(primary)
            }
        }
    }

    fn measure_levels<F>(
        &self,
        levels: &[f32],
        device_max_rpm: u32,
        logger: &TelemetryLogger,
        on_step: &mut F,
    ) -> Result<Vec<StepResult>>
    where
        F: FnMut(&StepResult),
    {
        let device = &*self.device;
        let mut steps = Vec::with_capacity(levels.len());
        for &power in levels {
            if self.cancel.is_cancelled() {
                return Err(Report::new(FanError::Cancelled));
            }
            if !logger.is_running() {
                return Err(Report::new(FanError::Logger(
                    "telemetry logger stopped before the sweep finished".into(),
                )));
            }

            settle(device, &self.cfg.settle, &self.clock)?;
            self.clock.sleep(self.cfg.settle_delay);
            if self.cancel.is_cancelled() {
                return Err(Report::new(FanError::Cancelled));
            }
            let result = measure(device, power, device_max_rpm, &self.cfg.measure, &self.clock)?;

            let within_tolerance = result.overshoot_ratio.abs() <= self.cfg.overshoot_tolerance;
            tracing::info!(
                power,
                overshoot_pct = result.overshoot_ratio * 100.0,
                max_rpm = result.max_rpm,
                max_power = result.max_power,
                "Fan power {power}%: overshoot {:.2}%, Max RPM {}, Max power {}%",
                result.overshoot_ratio * 100.0,
                result.max_rpm,
                result.max_power
            );
            if !within_tolerance {
                tracing::warn!(
                    power,
                    overshoot_ratio = result.overshoot_ratio,
                    tolerance = self.cfg.overshoot_tolerance,
                    "overshoot outside tolerance"
                );
            }

            let step = StepResult {
                power,
                result,
                within_tolerance,
            };
            on_step(&step);
            steps.push(step);
        }
        Ok(steps)
    }
}
