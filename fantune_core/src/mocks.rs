//! Test and helper mocks for fantune_core

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use fantune_traits::{DeviceError, FanDevice, Health};

#[derive(Debug, Default)]
struct ScriptState {
    commanded: f32,
    history: Vec<f32>,
    rpm_script: VecDeque<u32>,
    rpm_reads: usize,
    fail_rpm_after: Option<usize>,
    fail_on_power: Option<f32>,
    batches: VecDeque<Vec<String>>,
    pending: VecDeque<String>,
    stall_count: u32,
}

/// Scriptable fan for exercising the sweep components without hardware.
///
/// - RPM follows `power / 100 * max_rpm` instantly unless an RPM script is
///   given; scripted values are consumed one per read and the last one sticks.
/// - Every successful power command releases the next scripted batch of
///   serial lines, so a logger tick sees exactly one batch.
/// - Faults are one-shot (`fail_on_power`) or permanent (`fail_rpm_after`).
pub struct ScriptedFan {
    device_type: String,
    max_rpm: u32,
    state: Mutex<ScriptState>,
}

impl ScriptedFan {
    pub fn new(device_type: &str, max_rpm: u32) -> Self {
        Self {
            device_type: device_type.to_string(),
            max_rpm,
            state: Mutex::new(ScriptState::default()),
        }
    }

    pub fn with_rpm_script(self, rpms: impl IntoIterator<Item = u32>) -> Self {
        self.lock().rpm_script = rpms.into_iter().collect();
        self
    }

    pub fn with_serial_batches<I, B, S>(self, batches: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().batches = batches
            .into_iter()
            .map(|b| b.into_iter().map(Into::into).collect())
            .collect();
        self
    }

    /// Lines already pending before any command is issued.
    pub fn with_pending_lines<S: Into<String>>(self, lines: impl IntoIterator<Item = S>) -> Self {
        self.lock().pending = lines.into_iter().map(Into::into).collect();
        self
    }

    /// The first `set_fan_power(power)` fails and leaves the command unchanged.
    pub fn fail_on_power(self, power: f32) -> Self {
        self.lock().fail_on_power = Some(power);
        self
    }

    /// Every RPM read after the first `n` fails.
    pub fn fail_rpm_after(self, n: usize) -> Self {
        self.lock().fail_rpm_after = Some(n);
        self
    }

    pub fn with_stall_count(self, n: u32) -> Self {
        self.lock().stall_count = n;
        self
    }

    /// Every power value successfully commanded, in order.
    pub fn commands(&self) -> Vec<f32> {
        self.lock().history.clone()
    }

    pub fn rpm_reads(&self) -> usize {
        self.lock().rpm_reads
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        // A panicking test thread must not hide the state from the assertions
        match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn apply(st: &mut ScriptState, percent: f32) -> Result<(), DeviceError> {
        if st.fail_on_power == Some(percent) {
            st.fail_on_power = None;
            return Err(format!("injected fault commanding {percent}%").into());
        }
        st.commanded = percent;
        st.history.push(percent);
        if let Some(batch) = st.batches.pop_front() {
            st.pending.extend(batch);
        }
        Ok(())
    }
}

impl FanDevice for ScriptedFan {
    fn set_fan_power(&self, percent: f32) -> Result<(), DeviceError> {
        Self::apply(&mut self.lock(), percent)
    }

    fn fan_rpm(&self) -> Result<u32, DeviceError> {
        let mut st = self.lock();
        if let Some(n) = st.fail_rpm_after
            && st.rpm_reads >= n
        {
            return Err("injected rpm sensor fault".into());
        }
        st.rpm_reads += 1;
        let rpm = match st.rpm_script.len() {
            0 => (st.commanded / 100.0 * self.max_rpm as f32).round() as u32,
            1 => st.rpm_script[0],
            _ => st.rpm_script.pop_front().unwrap_or_default(),
        };
        Ok(rpm)
    }

    fn health(&self) -> Result<Health, DeviceError> {
        let st = self.lock();
        Ok(Health {
            fan_power: st.commanded.round() as u32,
            fan_stall_count: st.stall_count,
        })
    }

    fn read_serial_line(&self, _channel: u8) -> Result<Vec<u8>, DeviceError> {
        let mut st = self.lock();
        Ok(st.pending.pop_front().map(String::into_bytes).unwrap_or_default())
    }

    fn device_type(&self) -> Result<String, DeviceError> {
        Ok(self.device_type.clone())
    }

    fn commanded_power(&self) -> Result<f32, DeviceError> {
        Ok(self.lock().commanded)
    }

    fn reassert_fan_power(&self) -> Result<f32, DeviceError> {
        let mut st = self.lock();
        let power = st.commanded;
        Self::apply(&mut st, power)?;
        Ok(power)
    }
}
