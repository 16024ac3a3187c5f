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
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The render clock. Counts output frames rendered by the mixer.
///
/// The control plane only ever reads it; the mixer is the single writer.
#[derive(Clone, Debug)]
pub struct AudioClock {
    frames: Arc<AtomicU64>,
    sample_rate: u32,
}

impl AudioClock {
    /// Creates a clock at frame zero.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            sample_rate,
        }
    }

    /// Returns the number of frames rendered so far.
    pub fn current_frame(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    /// Returns the current render time in seconds.
    pub fn now(&self) -> f64 {
        self.current_frame() as f64 / self.sample_rate as f64
    }

    /// Returns the output sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Converts a frame index into seconds.
    pub fn frame_to_time(&self, frame: u64) -> f64 {
        frame as f64 / self.sample_rate as f64
    }

    pub(crate) fn advance(&self, frames: u64) {
        self.frames.fetch_add(frames, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advances() {
        let clock = AudioClock::new(48000);
        let reader = clock.clone();
        assert_eq!(reader.now(), 0.0);

        clock.advance(24000);
        assert_eq!(reader.current_frame(), 24000);
        assert!((reader.now() - 0.5).abs() < 1e-12);
    }
}
