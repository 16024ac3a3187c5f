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

//! Signal generators and helpers shared by the unit tests.

use std::error::Error;
use std::f32::consts::PI;
use std::fs::File;
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

/// Generate a sine wave starting at phase zero.
pub fn sine(frequency: f32, amplitude: f32, sample_rate: u32, duration_seconds: f32) -> Vec<f32> {
    let sample_count = (sample_rate as f32 * duration_seconds) as usize;
    (0..sample_count)
        .map(|i| amplitude * (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin())
        .collect()
}

/// A square-ish signal of magnitude 0.5 that touches zero exactly at the given
/// times and flips sign after each of them. Nothing else in it is near zero, so
/// its zero crossings are exactly `crossings` (rounded to whole samples).
pub fn crossing_signal(sample_rate: u32, duration_seconds: f64, crossings: &[f64]) -> Vec<f32> {
    let sample_count = (sample_rate as f64 * duration_seconds) as usize;
    let mut zeros: Vec<usize> = crossings
        .iter()
        .map(|t| (t * sample_rate as f64).round() as usize)
        .collect();
    zeros.sort_unstable();

    let mut samples = Vec::with_capacity(sample_count);
    let mut sign = 1.0;
    let mut next = zeros.iter().peekable();
    for i in 0..sample_count {
        if next.peek().is_some_and(|&&z| z == i) {
            next.next();
            samples.push(0.0);
            sign = -sign;
        } else {
            samples.push(0.5 * sign);
        }
    }
    samples
}

/// Calculate RMS (Root Mean Square) of a signal
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|&x| x * x).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Writes planar float channels to a 32-bit float WAV file.
pub fn write_wav(
    path: &Path,
    channels: &[Vec<f32>],
    sample_rate: u32,
) -> Result<(), Box<dyn Error>> {
    let mut writer = WavWriter::new(
        File::create(path)?,
        WavSpec {
            channels: channels.len() as u16,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        },
    )?;

    let frames = channels.first().map(Vec::len).unwrap_or(0);
    for frame in 0..frames {
        for channel in channels {
            writer.write_sample(channel[frame])?;
        }
    }
    writer.finalize()?;
    Ok(())
}
