// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Hardware output through cpal. The mixer is moved into the device callback and
//! renders straight into the device buffer.

use std::{error::Error, fmt};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info};

use super::mixer::Mixer;

/// An output device as reported by cpal.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// The name of the device.
    pub name: String,
    /// The cpal host the device belongs to.
    pub host: String,
    /// The maximum number of channels the device supports.
    pub max_channels: u16,
    /// The device's preferred sample rate, if it reports one.
    pub default_sample_rate: Option<u32>,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name, self.max_channels, self.host
        )?;
        if let Some(rate) = self.default_sample_rate {
            write!(f, " {} Hz", rate)?;
        }
        Ok(())
    }
}

/// Lists output devices across every available host, sorted by name.
pub fn list_devices() -> Result<Vec<DeviceInfo>, Box<dyn Error>> {
    let mut devices = Vec::new();
    for host_id in cpal::available_hosts() {
        let host_devices = match cpal::host_from_id(host_id)?.devices() {
            Ok(host_devices) => host_devices,
            Err(e) => {
                error!(
                    err = e.to_string(),
                    host = host_id.name(),
                    "Unable to list devices for host"
                );
                continue;
            }
        };

        for device in host_devices {
            let Ok(output_configs) = device.supported_output_configs() else {
                continue;
            };
            let max_channels = output_configs.map(|c| c.channels()).max().unwrap_or(0);
            if max_channels == 0 {
                continue;
            }

            devices.push(DeviceInfo {
                name: device.name()?,
                host: host_id.name().to_string(),
                max_channels,
                default_sample_rate: device
                    .default_output_config()
                    .ok()
                    .map(|c| c.sample_rate().0),
            });
        }
    }

    devices.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(devices)
}

/// Finds an output device by name on the default host, or the host's default
/// output device when no name is given.
pub fn find_device(name: Option<&str>) -> Result<cpal::Device, Box<dyn Error>> {
    let host = cpal::default_host();
    match name {
        None => host
            .default_output_device()
            .ok_or_else(|| "no default output device".into()),
        Some(name) => {
            for device in host.output_devices()? {
                if device.name().is_ok_and(|n| n.trim() == name) {
                    return Ok(device);
                }
            }
            Err(format!("no device found with name {}", name).into())
        }
    }
}

/// The sample rate the device prefers, for sizing an engine to it.
pub fn default_sample_rate(device: &cpal::Device) -> Result<u32, Box<dyn Error>> {
    Ok(device.default_output_config()?.sample_rate().0)
}

/// A running output stream. Audio stops when this is dropped.
pub struct OutputStream {
    device_name: String,
    sample_rate: u32,
    channels: u16,
    _stream: cpal::Stream,
}

impl OutputStream {
    /// Opens `device` at the mixer's rate and channel count and starts rendering.
    pub fn start(device: &cpal::Device, mut mixer: Mixer) -> Result<Self, Box<dyn Error>> {
        let device_name = device.name()?;
        let sample_rate = mixer.sample_rate();
        let channels = mixer.num_channels();
        let config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let sample_format = device.default_output_config()?.sample_format();
        let stream = match sample_format {
            cpal::SampleFormat::F32 => device.build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    mixer.process_into_output(data);
                },
                |err| error!(err = %err, "Output stream error"),
                None,
            )?,
            cpal::SampleFormat::I16 => build_converting_stream::<i16>(device, &config, mixer)?,
            cpal::SampleFormat::I32 => build_converting_stream::<i32>(device, &config, mixer)?,
            cpal::SampleFormat::U16 => build_converting_stream::<u16>(device, &config, mixer)?,
            other => return Err(format!("unsupported sample format {:?}", other).into()),
        };
        stream.play()?;

        info!(
            device = device_name,
            sample_rate,
            channels,
            format = ?sample_format,
            "Output stream started"
        );
        Ok(Self {
            device_name,
            sample_rate,
            channels,
            _stream: stream,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

impl fmt::Debug for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputStream")
            .field("device_name", &self.device_name)
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .finish()
    }
}

/// Renders f32 into a scratch block and converts it to the device's sample type.
fn build_converting_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut mixer: Mixer,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let mut scratch: Vec<f32> = Vec::new();
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            // Allocates only on the first callback or when the host changes its
            // buffer size.
            scratch.resize(data.len(), 0.0);
            mixer.process_into_output(&mut scratch);
            convert_block(&scratch, data);
        },
        |err| error!(err = %err, "Output stream error"),
        None,
    )
}

fn convert_block<T: cpal::Sample + cpal::FromSample<f32>>(src: &[f32], dst: &mut [T]) {
    for (dst, &src) in dst.iter_mut().zip(src) {
        *dst = T::from_sample(src.clamp(-1.0, 1.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_block() {
        let src = [0.0f32, 1.0, -1.0, 2.0];
        let mut ints = [0i16; 4];
        convert_block(&src, &mut ints);
        assert_eq!(ints[0], 0);
        assert!(ints[1] >= i16::MAX - 1);
        assert!(ints[2] <= i16::MIN + 1);
        assert_eq!(ints[3], ints[1]);

        let mut unsigned = [0u16; 1];
        convert_block(&src[..1], &mut unsigned);
        assert_eq!(unsigned[0], 32768);
    }

    #[test]
    fn test_device_info_display() {
        let info = DeviceInfo {
            name: "UltraLite".to_string(),
            host: "ALSA".to_string(),
            max_channels: 8,
            default_sample_rate: Some(48000),
        };
        assert_eq!(info.to_string(), "UltraLite (Channels=8) (ALSA) 48000 Hz");
    }
}
