//! Sweep execution: config mapping, device assembly, Ctrl-C wiring and reporting.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use fantune_config::Config;
use fantune_core::error::{FanError, Report, Result as CoreResult};
use fantune_core::{StepResult, Sweep, SweepCfg, SweepReport};
use fantune_hardware::{SimParams, SimulatedFan};
use fantune_traits::FanDevice;
use fantune_traits::clock::MonotonicClock;

/// Rated RPM for a simulated variant missing from the table.
const SIM_FALLBACK_RPM: u32 = 6500;

/// How long Ctrl-C waits for the sweep to tear down before forcing exit.
const INTERRUPT_GRACE: Duration = Duration::from_secs(2);

/// CLI overrides for a single run; `None` keeps the config value.
#[derive(Debug, Default, Clone)]
pub struct SweepOverrides {
    pub log: Option<PathBuf>,
    pub min_power: Option<f32>,
    pub step: Option<f32>,
    pub ticks: Option<u32>,
}

/// Build the simulated fan described by `[sim]`.
///
/// Its rated speed comes from the max RPM table so an ideal simulated fan
/// reads zero overshoot.
pub fn build_device(cfg: &Config) -> SimulatedFan {
    let rated_rpm = cfg
        .max_fan_rpm
        .get(&cfg.sim.device_type)
        .copied()
        .unwrap_or(SIM_FALLBACK_RPM);
    let fan = SimulatedFan::new(SimParams {
        device_type: cfg.sim.device_type.clone(),
        rated_rpm,
        response: cfg.sim.response,
        overshoot: cfg.sim.overshoot,
        stall_every: cfg.sim.stall_every,
    });

    // Test hook: drop the link the first time this power is commanded
    match std::env::var("FANTUNE_TEST_SIM_FAIL_AT_POWER")
        .ok()
        .and_then(|s| s.parse::<f32>().ok())
    {
        Some(p) => fan.fail_at_power(p),
        None => fan,
    }
}

fn apply_overrides(mut core: SweepCfg, o: &SweepOverrides) -> CoreResult<SweepCfg> {
    if let Some(p) = o.min_power {
        if !(p > 0.0 && p <= 100.0) {
            return Err(Report::new(FanError::Config(format!(
                "--min-power must be in (0, 100], got {p}"
            ))));
        }
        core.min_power = p;
    }
    if let Some(s) = o.step {
        if !(s > 0.0 && s <= 100.0) {
            return Err(Report::new(FanError::Config(format!(
                "--step must be in (0, 100], got {s}"
            ))));
        }
        core.power_step = s;
    }
    if let Some(n) = o.ticks {
        if n == 0 {
            return Err(Report::new(FanError::Config("--ticks must be >= 1".into())));
        }
        core.measure.ticks = n;
    }
    Ok(core)
}

fn print_step(step: &StepResult, json: bool) {
    if json {
        match serde_json::to_string(step) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(error = %e, "failed to serialize step"),
        }
    } else {
        let flag = if step.within_tolerance { "" } else { "  (outside tolerance)" };
        println!(
            "Fan power {}%: overshoot {:.2}%, Max RPM {}, Max power {}%{flag}",
            step.power,
            step.result.overshoot_ratio * 100.0,
            step.result.max_rpm,
            step.result.max_power
        );
    }
}

fn print_summary(report: &SweepReport, log: &std::path::Path, tolerance: f64, json: bool) {
    let outside = report.steps.iter().filter(|s| !s.within_tolerance).count();
    if json {
        let obj = serde_json::json!({
            "summary": {
                "device_type": report.device_type,
                "device_max_rpm": report.device_max_rpm,
                "steps": report.steps.len(),
                "outside_tolerance": outside,
                "tolerance": tolerance,
                "log": log.display().to_string(),
                "log_records": report.logger.records,
            }
        });
        println!("{obj}");
    } else {
        println!(
            "Sweep complete: {} steps on '{}' (max {} RPM), {} outside ±{:.1}%; telemetry: {} ({} records)",
            report.steps.len(),
            report.device_type,
            report.device_max_rpm,
            outside,
            tolerance * 100.0,
            log.display(),
            report.logger.records
        );
    }
}

fn zero_fan<D: FanDevice + ?Sized>(device: &D) {
    if let Err(e) = device.set_fan_power(0.0) {
        eprintln!("interrupted; failed to zero fan power: {e}");
    }
}

/// Run a full sweep on the simulated device and print per-step results.
pub fn run_sweep(cfg: &Config, overrides: &SweepOverrides, json: bool) -> CoreResult<SweepReport> {
    let core_cfg = apply_overrides(SweepCfg::from(cfg), overrides)?;
    let tolerance = core_cfg.overshoot_tolerance;
    let log = overrides
        .log
        .clone()
        .unwrap_or_else(|| PathBuf::from(&cfg.logger.path));

    let device = Arc::new(build_device(cfg));
    let sweep = Sweep::new(device.clone(), core_cfg, MonotonicClock::new());

    // Ctrl-C: cancel and zero now. The sweep normally tears down and exits
    // 130 through Cancelled; a sweep still inside a measurement window
    // commands nothing more, so after the grace period zero again and exit.
    let token = sweep.token();
    let handler_device = device.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        token.cancel();
        zero_fan(&*handler_device);
        std::thread::sleep(INTERRUPT_GRACE);
        zero_fan(&*handler_device);
        eprintln!("interrupted; fan power set to 0%");
        std::process::exit(130);
    }) {
        tracing::warn!(error = %e, "failed to install Ctrl-C handler");
    }

    let report = sweep.run_with(&log, |step| print_step(step, json))?;
    print_summary(&report, &log, tolerance, json);
    Ok(report)
}
