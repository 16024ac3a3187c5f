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
use std::path::Path;

use hound::{SampleFormat, WavReader};
use tracing::debug;

use super::buffer::{BufferError, DecodedBuffer};

#[derive(Debug, thiserror::Error)]
pub enum WavError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("unsupported bit depth {0}")]
    BitDepth(u16),

    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// Decodes a whole WAV file into memory.
///
/// Integer samples are scaled into `[-1, 1)`; float samples are taken as is.
pub fn read_wav(path: &Path) -> Result<DecodedBuffer, WavError> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(WavError::BitDepth(spec.bits_per_sample));
            }
            // i64 so that 32-bit samples do not overflow the shift.
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    debug!(
        path = %path.display(),
        channels = spec.channels,
        sample_rate = spec.sample_rate,
        bits = spec.bits_per_sample,
        samples = interleaved.len(),
        "WAV decoded"
    );
    Ok(DecodedBuffer::from_interleaved(
        &interleaved,
        spec.channels,
        spec.sample_rate,
    )?)
}

#[cfg(test)]
mod tests {
    use hound::{WavSpec, WavWriter};

    use super::*;
    use crate::testutil::write_wav;

    #[test]
    fn test_read_float_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let left = vec![0.0, 0.25, 0.5, 0.75];
        let right = vec![0.0, -0.25, -0.5, -0.75];
        write_wav(&path, &[left.clone(), right.clone()], 44100).unwrap();

        let buffer = read_wav(&path).unwrap();
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.sample_rate(), 44100);
        assert_eq!(buffer.frames(), 4);
        assert_eq!(buffer.channel(0), left.as_slice());
        assert_eq!(buffer.channel(1), right.as_slice());
    }

    #[test]
    fn test_read_int_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono16.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for s in [0i16, 16384, -16384, i16::MIN] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let buffer = read_wav(&path).unwrap();
        assert_eq!(buffer.channel(0), &[0.0, 0.5, -0.5, -1.0]);
    }

    #[test]
    fn test_missing_and_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_wav(&dir.path().join("missing.wav")),
            Err(WavError::Wav(_))
        ));

        let path = dir.path().join("empty.wav");
        write_wav(&path, &[Vec::new()], 44100).unwrap();
        assert!(matches!(
            read_wav(&path),
            Err(WavError::Buffer(BufferError::Empty))
        ));
    }
}
