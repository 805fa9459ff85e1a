pub mod error;

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use fantune_traits::{DeviceError, FanDevice, Health};

pub use error::HwError;

/// Oldest telemetry lines are dropped once this many are pending.
const SERIAL_BACKLOG: usize = 64;
/// The firmware prints fan telemetry on this channel.
const TELEMETRY_CHANNEL: u8 = 0;

/// Physical behaviour of the simulated fan.
#[derive(Debug, Clone)]
pub struct SimParams {
    pub device_type: String,
    /// RPM the simulated fan reaches at 100% power
    pub rated_rpm: u32,
    /// Fraction of the remaining RPM error closed on each sensor read, (0, 1]
    pub response: f32,
    /// Peak overshoot ratio after a power increase
    pub overshoot: f32,
    /// Count a stall every N sensor reads while powered (0 disables)
    pub stall_every: u32,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            device_type: "sim".to_string(),
            rated_rpm: 6500,
            response: 1.0,
            overshoot: 0.0,
            stall_every: 0,
        }
    }
}

#[derive(Debug, Default)]
struct SimState {
    commanded: f32,
    rpm: f32,
    overshoot_pending: bool,
    reads: u64,
    stall_count: u32,
    serial: VecDeque<String>,
    fail_at_power: Option<f32>,
}

/// Simulated fan controller.
///
/// All state sits behind one mutex, so commands from the sweep and the
/// background logger are applied in a single well-defined order.
pub struct SimulatedFan {
    params: SimParams,
    state: Mutex<SimState>,
}

impl SimulatedFan {
    pub fn new(params: SimParams) -> Self {
        SimulatedFan {
            params,
            state: Mutex::new(SimState::default()),
        }
    }

    /// Fail the first `set_fan_power(power)` call with `HwError::Disconnected`.
    pub fn fail_at_power(self, power: f32) -> Self {
        if let Ok(mut st) = self.state.lock() {
            st.fail_at_power = Some(power);
        }
        self
    }

    fn state(&self) -> Result<MutexGuard<'_, SimState>, HwError> {
        self.state.lock().map_err(|_| HwError::Poisoned)
    }

    fn target_rpm(&self, commanded: f32) -> f32 {
        commanded / 100.0 * self.params.rated_rpm as f32
    }

    fn apply(&self, st: &mut SimState, percent: f32) -> Result<(), HwError> {
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return Err(HwError::InvalidCommand(percent));
        }
        if st.fail_at_power == Some(percent) {
            st.fail_at_power = None;
            tracing::warn!(percent, "simulated link drop");
            return Err(HwError::Disconnected);
        }
        if percent > st.commanded {
            st.overshoot_pending = self.params.overshoot > 0.0;
        }
        st.commanded = percent;

        // The firmware answers every command with a telemetry line:
        // target_rpm rpm_fast pwm_power stall_count, in hex.
        let line = format!(
            "{:x} {:x} {:x} {:x}",
            self.target_rpm(percent).round() as u32,
            st.rpm.round() as u32,
            percent.round() as u32,
            st.stall_count
        );
        if st.serial.len() == SERIAL_BACKLOG {
            st.serial.pop_front();
        }
        st.serial.push_back(line);
        Ok(())
    }

    fn step_rpm(&self, st: &mut SimState) -> u32 {
        let target = self.target_rpm(st.commanded);
        let aim = if st.overshoot_pending {
            target * (1.0 + self.params.overshoot)
        } else {
            target
        };
        st.rpm += self.params.response * (aim - st.rpm);
        if st.overshoot_pending && (aim - st.rpm).abs() <= aim * 0.01 {
            st.overshoot_pending = false;
        }

        st.reads += 1;
        if self.params.stall_every > 0
            && st.commanded > 0.0
            && st.reads % u64::from(self.params.stall_every) == 0
        {
            st.stall_count = st.stall_count.wrapping_add(1);
        }
        st.rpm.max(0.0).round() as u32
    }
}

impl FanDevice for SimulatedFan {
    fn set_fan_power(&self, percent: f32) -> Result<(), DeviceError> {
        let mut st = self.state()?;
        self.apply(&mut st, percent)?;
        tracing::trace!(percent, "fan power set");
        Ok(())
    }

    fn fan_rpm(&self) -> Result<u32, DeviceError> {
        let mut st = self.state()?;
        Ok(self.step_rpm(&mut st))
    }

    fn health(&self) -> Result<Health, DeviceError> {
        let st = self.state()?;
        Ok(Health {
            fan_power: st.commanded.round() as u32,
            fan_stall_count: st.stall_count,
        })
    }

    fn read_serial_line(&self, channel: u8) -> Result<Vec<u8>, DeviceError> {
        if channel != TELEMETRY_CHANNEL {
            return Err(Box::new(HwError::Serial(format!(
                "no such serial channel {channel}"
            ))));
        }
        let mut st = self.state()?;
        Ok(st.serial.pop_front().map(String::into_bytes).unwrap_or_default())
    }

    fn device_type(&self) -> Result<String, DeviceError> {
        Ok(self.params.device_type.clone())
    }

    fn commanded_power(&self) -> Result<f32, DeviceError> {
        Ok(self.state()?.commanded)
    }

    fn reassert_fan_power(&self) -> Result<f32, DeviceError> {
        let mut st = self.state()?;
        let power = st.commanded;
        self.apply(&mut st, power)?;
        Ok(power)
    }
}
