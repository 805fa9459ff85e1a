//! Background telemetry logger.
//!
//! Spawns a thread that shares the fan device with the sweep. Every tick it
//! re-asserts the commanded power, drains the firmware's telemetry lines and
//! appends the newest valid sample, enriched with live sensor reads, to a
//! JSON-lines log file.
//!
//! Safety: when the thread exits, for whatever reason, it commands zero fan
//! power. Dropping the `TelemetryLogger` cancels and joins the thread.
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use fantune_traits::FanDevice;
use fantune_traits::clock::Clock;

use crate::cancel::CancelToken;
use crate::config::LoggerCfg;
use crate::error::{FanError, Report, Result};
use crate::hw_error::map_device_error;
use crate::record::LogRecord;
use crate::telemetry::latest_sample;

/// What the logger thread did before it exited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct LoggerStats {
    pub ticks: u64,
    pub records: u64,
}

pub struct TelemetryLogger {
    cancel: CancelToken,
    join_handle: Option<JoinHandle<std::result::Result<LoggerStats, FanError>>>,
}

impl TelemetryLogger {
    /// Open the log for appending, command `initial_power`, discard stale
    /// telemetry and start the logging thread.
    pub fn start<D, C>(
        device: Arc<D>,
        initial_power: f32,
        path: &Path,
        cfg: LoggerCfg,
        clock: C,
    ) -> Result<Self>
    where
        D: FanDevice + Send + Sync + ?Sized + 'static,
        C: Clock + Send + 'static,
    {
        Self::start_with_token(device, initial_power, path, cfg, clock, CancelToken::new())
    }

    /// Like [`TelemetryLogger::start`], stopping when `cancel` is set.
    pub fn start_with_token<D, C>(
        device: Arc<D>,
        initial_power: f32,
        path: &Path,
        cfg: LoggerCfg,
        clock: C,
        cancel: CancelToken,
    ) -> Result<Self>
    where
        D: FanDevice + Send + Sync + ?Sized + 'static,
        C: Clock + Send + 'static,
    {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| FanError::Io(format!("open telemetry log {}: {e}", path.display())))?;

        let epoch = clock.now();
        device
            .set_fan_power(initial_power)
            .map_err(|e| map_device_error(e.as_ref()))?;
        let stale = drain_lines(&*device, cfg.serial_channel, cfg.max_lines_per_tick)?;
        tracing::debug!(stale = stale.len(), "discarded stale telemetry");

        let cancel_clone = cancel.clone();
        tracing::info!(
            path = %path.display(),
            interval_ms = cfg.interval.as_millis() as u64,
            "telemetry logger start"
        );

        let join_handle = std::thread::Builder::new()
            .name("fan-telemetry".into())
            .spawn(move || run_loop(&*device, file, &cfg, &clock, epoch, &cancel_clone))
            .map_err(|e| FanError::Logger(format!("spawn logger thread: {e}")))?;

        Ok(Self {
            cancel,
            join_handle: Some(join_handle),
        })
    }

    /// Shared cancellation flag; setting it stops the logger at its next tick.
    pub fn token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Request cancellation. Returns true if this call set the flag.
    pub fn cancel(&self) -> bool {
        self.cancel.cancel()
    }

    /// False once the thread has exited (after cancellation or a failure).
    pub fn is_running(&self) -> bool {
        self.join_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Wait for the thread to exit and collect its outcome.
    ///
    /// Cancels first if nobody has, so this never waits on a live loop.
    pub fn join(mut self) -> Result<LoggerStats> {
        self.cancel.cancel();
        self.join_inner()
    }

    fn join_inner(&mut self) -> Result<LoggerStats> {
        let Some(handle) = self.join_handle.take() else {
            return Ok(LoggerStats::default());
        };
        match handle.join() {
            Ok(Ok(stats)) => {
                tracing::info!(
                    ticks = stats.ticks,
                    records = stats.records,
                    "telemetry logger stopped"
                );
                Ok(stats)
            }
            Ok(Err(e)) => Err(Report::new(e)),
            Err(_) => Err(Report::new(FanError::Logger("logger thread panicked".into()))),
        }
    }
}

impl Drop for TelemetryLogger {
    fn drop(&mut self) {
        if self.join_handle.is_none() {
            return;
        }
        self.cancel.cancel();
        if let Err(e) = self.join_inner() {
            // We're in Drop; the caller already lost interest in the outcome
            tracing::warn!(error = %e, "telemetry logger failed during shutdown");
        }
    }
}

/// Read lines until the device reports none pending, or `max` lines.
fn drain_lines<D: FanDevice + ?Sized>(
    device: &D,
    channel: u8,
    max: usize,
) -> std::result::Result<Vec<String>, FanError> {
    let mut out = Vec::new();
    while out.len() < max {
        let raw = device
            .read_serial_line(channel)
            .map_err(|e| map_device_error(e.as_ref()))?;
        if raw.is_empty() {
            break;
        }
        out.push(String::from_utf8_lossy(&raw).trim().to_string());
    }
    Ok(out)
}

fn run_loop<D, C>(
    device: &D,
    mut out: File,
    cfg: &LoggerCfg,
    clock: &C,
    epoch: Instant,
    cancel: &CancelToken,
) -> std::result::Result<LoggerStats, FanError>
where
    D: FanDevice + ?Sized,
    C: Clock,
{
    let mut stats = LoggerStats::default();
    let mut outcome = Ok(());
    while !cancel.is_cancelled() {
        match tick(device, &mut out, cfg, clock, epoch) {
            Ok(wrote) => {
                stats.ticks += 1;
                stats.records += u64::from(wrote);
            }
            Err(e) => {
                tracing::error!(error = %e, "telemetry logger aborting");
                outcome = Err(e);
                break;
            }
        }
        clock.sleep(cfg.interval);
    }

    let zero = device
        .set_fan_power(0.0)
        .map_err(|e| map_device_error(e.as_ref()));
    if let Err(e) = &zero {
        tracing::error!(error = %e, "failed to force fan power to zero");
    }
    outcome.and(zero).map(|()| stats)
}

/// One logger tick. Returns whether a record was written.
fn tick<D, C>(
    device: &D,
    out: &mut File,
    cfg: &LoggerCfg,
    clock: &C,
    epoch: Instant,
) -> std::result::Result<bool, FanError>
where
    D: FanDevice + ?Sized,
    C: Clock,
{
    let cmd_power = device
        .reassert_fan_power()
        .map_err(|e| map_device_error(e.as_ref()))?;
    let lines = drain_lines(device, cfg.serial_channel, cfg.max_lines_per_tick)?;
    let Some(sample) = latest_sample(&lines) else {
        return Ok(false);
    };

    let rpm = device.fan_rpm().map_err(|e| map_device_error(e.as_ref()))?;
    let health = device.health().map_err(|e| map_device_error(e.as_ref()))?;
    let record = LogRecord::compose(
        clock.secs_since(epoch),
        cmd_power,
        sample,
        rpm,
        health.fan_stall_count,
    );

    let mut line = serde_json::to_string(&record).map_err(|e| FanError::Io(e.to_string()))?;
    line.push('\n');
    // whole line in one write
    out.write_all(line.as_bytes())?;
    out.flush()?;
    tracing::trace!(rpm, cmd_power, "telemetry record");
    Ok(true)
}
