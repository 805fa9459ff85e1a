//! Maps `Box<dyn Error>` from the device trait boundary to typed `FanError`.
//!
//! `FanDevice` uses `Box<dyn Error + Send + Sync>` so any transport can sit
//! behind it; this module converts those to our typed error enum, with an
//! optional feature-gated path for `fantune_hardware::HwError` downcasting.

use crate::error::FanError;

/// Map a trait-boundary error to a typed `FanError`.
///
/// Every device failure is a communication failure from the sweep's point
/// of view; the downcast only sharpens the message.
pub fn map_device_error(e: &(dyn std::error::Error + 'static)) -> FanError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<fantune_hardware::HwError>() {
            return match hw {
                fantune_hardware::HwError::Disconnected => {
                    FanError::Device("device disconnected (check the USB link)".into())
                }
                other => FanError::Device(other.to_string()),
            };
        }
    }

    FanError::Device(e.to_string())
}

/// Convenience adapter for `map_err` on device calls.
pub(crate) fn device_err(e: fantune_traits::DeviceError) -> eyre::Report {
    eyre::Report::new(map_device_error(e.as_ref()))
}
