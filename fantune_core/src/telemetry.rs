//! Fan telemetry line decoding.
//!
//! The firmware prints one line per update with four whitespace-separated
//! hexadecimal fields: `target_rpm rpm_fast pwm_power stall_count`.
//! Anything else is noise on the serial link and is dropped.

use std::str::FromStr;
use thiserror::Error;

const FIELD_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetrySample {
    pub target_rpm: u32,
    pub rpm_fast: u32,
    pub pwm_power: u32,
    pub stall_count: u32,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("expected 4 fields, got {0}")]
    FieldCount(usize),
    #[error("field {index} is not a hex u32: {token:?}")]
    BadField { index: usize, token: String },
}

impl FromStr for TelemetrySample {
    type Err = DecodeError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != FIELD_COUNT {
            return Err(DecodeError::FieldCount(tokens.len()));
        }
        let mut fields = [0u32; FIELD_COUNT];
        for (index, (slot, token)) in fields.iter_mut().zip(&tokens).enumerate() {
            // from_str_radix accepts a leading '+', the firmware never prints one
            if token.starts_with('+') {
                return Err(DecodeError::BadField {
                    index,
                    token: (*token).to_string(),
                });
            }
            *slot = u32::from_str_radix(token, 16).map_err(|_| DecodeError::BadField {
                index,
                token: (*token).to_string(),
            })?;
        }
        let [target_rpm, rpm_fast, pwm_power, stall_count] = fields;
        Ok(TelemetrySample {
            target_rpm,
            rpm_fast,
            pwm_power,
            stall_count,
        })
    }
}

/// Decode one line, discarding anything malformed.
pub fn decode_line(line: &str) -> Option<TelemetrySample> {
    match line.parse::<TelemetrySample>() {
        Ok(sample) => Some(sample),
        Err(e) => {
            tracing::trace!(error = %e, line, "dropping telemetry line");
            None
        }
    }
}

/// Most recent valid sample among lines given in arrival order.
pub fn latest_sample<I, S>(lines: I) -> Option<TelemetrySample>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .filter_map(|l| decode_line(l.as_ref()))
        .last()
}
