//! Output device lookup

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{SampleFormat, SupportedStreamConfigRange};

use crate::error::PlaybackError;

/// Name and default flag of an output device
#[derive(Debug, Clone)]
pub struct OutputDeviceInfo {
    pub name: String,
    pub is_default: bool,
}

/// List all output devices on the default host
pub fn list_output_devices() -> Vec<OutputDeviceInfo> {
    let host = cpal::default_host();
    let default_name = host.default_output_device().and_then(|d| d.name().ok());

    let mut devices = Vec::new();
    if let Ok(outputs) = host.output_devices() {
        for device in outputs {
            if let Ok(name) = device.name() {
                let is_default = default_name.as_ref() == Some(&name);
                devices.push(OutputDeviceInfo { name, is_default });
            }
        }
    }
    devices
}

/// Find an output device by name; an empty name selects the default device
pub fn get_output_device(name: &str) -> Result<cpal::Device, PlaybackError> {
    let host = cpal::default_host();

    if name.is_empty() {
        return host
            .default_output_device()
            .ok_or_else(|| PlaybackError::DeviceNotFound("No default output device".to_string()));
    }

    let devices = host
        .output_devices()
        .map_err(|e| PlaybackError::DeviceNotFound(e.to_string()))?;

    for device in devices {
        if device.name().map(|n| n == name).unwrap_or(false) {
            return Ok(device);
        }
    }

    Err(PlaybackError::DeviceNotFound(name.to_string()))
}

/// Whether any of `ranges` offers f32 output at this channel count and rate
pub fn supports_output_format(
    ranges: impl IntoIterator<Item = SupportedStreamConfigRange>,
    channels: u16,
    sample_rate: u32,
) -> bool {
    ranges.into_iter().any(|range| {
        range.channels() == channels
            && range.sample_format() == SampleFormat::F32
            && range.min_sample_rate().0 <= sample_rate
            && range.max_sample_rate().0 >= sample_rate
    })
}

/// Fail early with a readable reason if the device cannot play the stream format
pub fn check_output_format(
    device: &cpal::Device,
    channels: u16,
    sample_rate: u32,
) -> Result<(), PlaybackError> {
    let name = device.name().unwrap_or_else(|_| "unknown".to_string());
    let ranges = device.supported_output_configs().map_err(|e| {
        PlaybackError::Output(format!("Cannot query output formats of {}: {}", name, e))
    })?;

    if supports_output_format(ranges, channels, sample_rate) {
        Ok(())
    } else {
        Err(PlaybackError::Output(format!(
            "{} does not support {} channel f32 output at {} Hz",
            name, channels, sample_rate
        )))
    }
}
