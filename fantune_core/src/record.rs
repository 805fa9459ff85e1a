//! Telemetry log records and the line-oriented reader for them.

use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::path::Path;

use crate::error::{FanError, Result};
use crate::telemetry::TelemetrySample;

/// One line of the telemetry log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Seconds since the logger started
    pub time_elapsed: f64,
    pub cmd_power: f32,
    pub pwm_power: u32,
    pub target_rpm: u32,
    pub rpm_fast: u32,
    /// Live sensor read taken when the record was composed
    pub rpm: u32,
    pub stall_counter: u32,
    pub total_stall_count: u32,
}

impl LogRecord {
    pub fn compose(
        time_elapsed: f64,
        cmd_power: f32,
        sample: TelemetrySample,
        rpm: u32,
        total_stall_count: u32,
    ) -> Self {
        Self {
            time_elapsed,
            cmd_power,
            pwm_power: sample.pwm_power,
            target_rpm: sample.target_rpm,
            rpm_fast: sample.rpm_fast,
            rpm,
            stall_counter: sample.stall_count,
            total_stall_count,
        }
    }
}

#[derive(Debug, Default)]
pub struct LogReadout {
    pub records: Vec<LogRecord>,
    /// Lines that did not decode (blank lines excluded)
    pub skipped: usize,
}

/// Read a telemetry log, skipping undecodable lines.
///
/// A torn last line is normal after an interrupted run.
pub fn read_records(path: &Path) -> Result<LogReadout> {
    let file = std::fs::File::open(path)
        .map_err(|e| FanError::Io(format!("open telemetry log {}: {e}", path.display())))?;
    let mut reader = std::io::BufReader::new(file);
    let mut out = LogReadout::default();
    let mut buf = Vec::new();
    let mut idx = 0usize;
    loop {
        buf.clear();
        // Raw bytes: a corrupted line must not end the read
        if reader.read_until(b'\n', &mut buf).map_err(FanError::from)? == 0 {
            break;
        }
        idx += 1;
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(e) => {
                tracing::debug!(line = idx, error = %e, "skipping non-UTF-8 log line");
                out.skipped += 1;
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<LogRecord>(line) {
            Ok(rec) => out.records.push(rec),
            Err(e) => {
                tracing::debug!(line = idx, error = %e, "skipping undecodable log line");
                out.skipped += 1;
            }
        }
    }
    Ok(out)
}

impl LogReadout {
    pub fn summary(&self) -> LogSummary {
        LogSummary {
            skipped: self.skipped,
            ..LogSummary::from_records(&self.records)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LogSummary {
    pub records: usize,
    pub skipped: usize,
    pub duration_s: f64,
    pub peak_rpm: u32,
    pub peak_pwm_power: u32,
    /// Stall events seen by the device while the log was being written
    pub stall_events: u32,
}

impl LogSummary {
    pub fn from_records(records: &[LogRecord]) -> Self {
        let (first, last) = match (records.first(), records.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => {
                return Self {
                    records: 0,
                    skipped: 0,
                    duration_s: 0.0,
                    peak_rpm: 0,
                    peak_pwm_power: 0,
                    stall_events: 0,
                };
            }
        };
        Self {
            records: records.len(),
            skipped: 0,
            duration_s: (last.time_elapsed - first.time_elapsed).max(0.0),
            peak_rpm: records.iter().map(|r| r.rpm).max().unwrap_or(0),
            peak_pwm_power: records.iter().map(|r| r.pwm_power).max().unwrap_or(0),
            stall_events: last.total_stall_count.saturating_sub(first.total_stall_count),
        }
    }
}
