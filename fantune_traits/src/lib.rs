pub mod clock;

pub use clock::{Clock, MonotonicClock};

pub type DeviceError = Box<dyn std::error::Error + Send + Sync>;

/// Status snapshot reported by the fan controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Health {
    /// Fan power the controller reports it is currently applying (percent).
    pub fan_power: u32,
    /// Cumulative stall events since device boot.
    pub fan_stall_count: u32,
}

/// Handle to a fan speed controller.
///
/// Methods take `&self`: implementations synchronize internally so the
/// handle can be shared between a foreground sweep and a background logger.
pub trait FanDevice {
    fn set_fan_power(&self, percent: f32) -> Result<(), DeviceError>;
    fn fan_rpm(&self) -> Result<u32, DeviceError>;
    fn health(&self) -> Result<Health, DeviceError>;
    /// Non-blocking read of one raw telemetry line; empty when nothing is pending.
    fn read_serial_line(&self, channel: u8) -> Result<Vec<u8>, DeviceError>;
    fn device_type(&self) -> Result<String, DeviceError>;
    /// Last power value commanded through `set_fan_power`.
    fn commanded_power(&self) -> Result<f32, DeviceError>;

    /// Re-issue the last commanded power and return it.
    ///
    /// The default is a read followed by a write. Devices holding a lock
    /// should override this so a concurrent `set_fan_power` cannot land
    /// between the two.
    fn reassert_fan_power(&self) -> Result<f32, DeviceError> {
        let power = self.commanded_power()?;
        self.set_fan_power(power)?;
        Ok(power)
    }
}
