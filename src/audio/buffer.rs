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

//! Decoded audio held in memory for zero-latency playback.

/// Errors raised when a decoded buffer does not have a usable shape.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BufferError {
    #[error("buffer has no channels")]
    NoChannels,

    #[error("buffer has no frames")]
    Empty,

    #[error("sample rate must be non-zero")]
    ZeroSampleRate,

    #[error("channel {channel} has {actual} frames, expected {expected}")]
    RaggedChannels {
        channel: usize,
        expected: usize,
        actual: usize,
    },
}

/// An already-decoded, fixed-format multichannel buffer.
///
/// Samples are stored planar (one Vec per channel). The buffer is read-only once
/// built and is shared between every voice of a sample through an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBuffer {
    /// Planar sample storage (one Vec per channel)
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl DecodedBuffer {
    /// Creates a buffer from planar channel data.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self, BufferError> {
        if sample_rate == 0 {
            return Err(BufferError::ZeroSampleRate);
        }
        let expected = match channels.first() {
            Some(first) => first.len(),
            None => return Err(BufferError::NoChannels),
        };
        if expected == 0 {
            return Err(BufferError::Empty);
        }
        if let Some((channel, ch)) = channels
            .iter()
            .enumerate()
            .find(|(_, ch)| ch.len() != expected)
        {
            return Err(BufferError::RaggedChannels {
                channel,
                expected,
                actual: ch.len(),
            });
        }

        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Creates a single-channel buffer.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self, BufferError> {
        Self::new(vec![samples], sample_rate)
    }

    /// Creates a buffer from interleaved samples, converting to planar storage.
    /// Trailing samples that do not fill a whole frame are dropped.
    pub fn from_interleaved(
        interleaved: &[f32],
        channel_count: u16,
        sample_rate: u32,
    ) -> Result<Self, BufferError> {
        let num_channels = channel_count as usize;
        if num_channels == 0 {
            return Err(BufferError::NoChannels);
        }
        let num_frames = interleaved.len() / num_channels;

        let mut planar = vec![Vec::with_capacity(num_frames); num_channels];
        for frame in interleaved.chunks_exact(num_channels) {
            for (ch, sample) in frame.iter().enumerate() {
                planar[ch].push(*sample);
            }
        }

        Self::new(planar, sample_rate)
    }

    /// Returns the number of channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Returns the native sample rate of the data.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    /// Returns the duration in seconds.
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Returns the samples for a channel.
    pub fn channel(&self, channel: usize) -> &[f32] {
        &self.channels[channel]
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.channels.len() * self.frames() * std::mem::size_of::<f32>()
    }

    /// Reads a channel at a fractional position (in seconds) with linear
    /// interpolation. Positions outside the buffer read as silence.
    #[inline]
    pub fn sample_at(&self, channel: usize, position: f64) -> f32 {
        if position < 0.0 {
            return 0.0;
        }
        let data = &self.channels[channel % self.channels.len()];
        let index = position * self.sample_rate as f64;
        let i0 = index.floor() as usize;
        if i0 >= data.len() {
            return 0.0;
        }
        let frac = (index - i0 as f64) as f32;
        let s0 = data[i0];
        let s1 = data.get(i0 + 1).copied().unwrap_or(0.0);
        s0 + (s1 - s0) * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleaved_to_planar() {
        let buffer = DecodedBuffer::from_interleaved(&[0.1, 0.2, 0.3, 0.4, 0.5], 2, 10).unwrap();
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frames(), 2);
        assert_eq!(buffer.channel(0), &[0.1, 0.3]);
        assert_eq!(buffer.channel(1), &[0.2, 0.4]);
        assert!((buffer.duration() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_shapes() {
        assert_eq!(
            DecodedBuffer::new(vec![], 44100),
            Err(BufferError::NoChannels)
        );
        assert_eq!(
            DecodedBuffer::mono(vec![], 44100),
            Err(BufferError::Empty)
        );
        assert_eq!(
            DecodedBuffer::mono(vec![0.0], 0),
            Err(BufferError::ZeroSampleRate)
        );
        assert_eq!(
            DecodedBuffer::new(vec![vec![0.0, 0.0], vec![0.0]], 44100),
            Err(BufferError::RaggedChannels {
                channel: 1,
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_interpolated_read() {
        let buffer = DecodedBuffer::mono(vec![0.0, 1.0, 0.0], 4).unwrap();
        assert_eq!(buffer.sample_at(0, 0.0), 0.0);
        assert!((buffer.sample_at(0, 0.125) - 0.5).abs() < 1e-6);
        assert_eq!(buffer.sample_at(0, 0.25), 1.0);
        assert_eq!(buffer.sample_at(0, 10.0), 0.0);
        assert_eq!(buffer.sample_at(0, -1.0), 0.0);
    }
}
