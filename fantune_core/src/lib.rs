#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Fan overshoot characterization (hardware-agnostic).
//!
//! All hardware access goes through `fantune_traits::FanDevice`. The device
//! is shared between the sweep (foreground) and the telemetry logger
//! (background thread), so implementations synchronize internally.
//!
//! ## Architecture
//!
//! - **Telemetry**: hex telemetry line decoding (`telemetry` module)
//! - **Logger**: background thread appending JSON-lines records (`logger`)
//! - **Settle**: drive the fan to rest before each step (`settle`)
//! - **Overshoot**: fixed-window peak measurement and ratio (`overshoot`)
//! - **Sweep**: power schedule orchestration and teardown (`sweep`)
//! - **Record**: log record schema, reader and summary (`record`)
//!
//! ## Safety
//!
//! The logger commands zero power whenever it exits, and every sweep path
//! (success, error, panic unwinding) stops the logger before returning.

pub mod cancel;
pub mod config;
pub mod conversions;
pub mod error;
pub mod hw_error;
pub mod logger;
pub mod mocks;
pub mod overshoot;
pub mod record;
pub mod settle;
pub mod sweep;
pub mod telemetry;

pub use cancel::CancelToken;
pub use config::{LoggerCfg, MeasureCfg, SettleCfg, SweepCfg};
pub use error::{FanError, Report, Result};
pub use hw_error::map_device_error;
pub use logger::{LoggerStats, TelemetryLogger};
pub use overshoot::{OvershootResult, measure, overshoot_ratio};
pub use record::{LogReadout, LogRecord, LogSummary, read_records};
pub use settle::settle;
pub use sweep::{StepResult, Sweep, SweepReport, power_levels, resolve_max_rpm};
pub use telemetry::{TelemetrySample, decode_line, latest_sample};
