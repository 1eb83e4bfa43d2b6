//! Output device enumeration via cpal.

use cpal::Device;
use cpal::traits::{DeviceTrait, HostTrait};

use crate::Result;

/// Extract device name via `description()` (cpal 0.17+).
pub(crate) fn device_name(device: &Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// Output device information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    /// Human-readable device name.
    pub name: String,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
    /// Default channel count.
    pub channels: u16,
    /// Whether this is the system default output.
    pub is_default: bool,
}

// Default (sample rate, channels), falling back to 48 kHz stereo.
fn summarize(device: &Device) -> (u32, u16) {
    device
        .default_output_config()
        .map(|c| (c.sample_rate(), c.channels()))
        .unwrap_or((48000, 2))
}

/// Lists output devices on the default host.
pub fn list_output_devices() -> Result<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let default_name = host
        .default_output_device()
        .and_then(|d| device_name(&d).ok());

    let mut devices = Vec::new();
    if let Ok(outputs) = host.output_devices() {
        for device in outputs {
            let Ok(name) = device_name(&device) else {
                continue;
            };
            let (default_sample_rate, channels) = summarize(&device);
            devices.push(AudioDevice {
                is_default: default_name.as_deref() == Some(name.as_str()),
                name,
                default_sample_rate,
                channels,
            });
        }
    }
    tracing::debug!(count = devices.len(), "enumerated output devices");
    Ok(devices)
}

/// The default output device, if any.
pub fn default_output_device() -> Result<Option<AudioDevice>> {
    let host = cpal::default_host();
    Ok(host.default_output_device().and_then(|d| {
        device_name(&d).ok().map(|name| {
            let (default_sample_rate, channels) = summarize(&d);
            AudioDevice {
                name,
                default_sample_rate,
                channels,
                is_default: true,
            }
        })
    }))
}
