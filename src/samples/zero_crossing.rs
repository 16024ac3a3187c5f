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

//! Zero-crossing index for click-free loop and play boundaries.

use crate::audio::DecodedBuffer;

/// Default magnitude below which a sample counts as touching zero.
pub const DEFAULT_ZERO_THRESHOLD: f32 = 0.001;

/// Sorted times (seconds) where channel 0 of a buffer crosses or touches zero.
///
/// Built once per loaded buffer and immutable afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZeroCrossings {
    times: Vec<f64>,
}

impl ZeroCrossings {
    /// Scans channel 0 of `buffer`.
    ///
    /// A sign change between `x[i-1]` and `x[i]` records whichever of the two indices
    /// is closer to the interpolated zero; any sample with `|x[i]| < threshold` is
    /// recorded as is.
    pub fn build(buffer: &DecodedBuffer, threshold: f32) -> Self {
        let data = buffer.channel(0);
        let sample_rate = buffer.sample_rate() as f64;
        let mut indices: Vec<usize> = Vec::new();

        let mut push = |index: usize| {
            if indices.last().is_none_or(|&last| last < index) {
                indices.push(index);
            }
        };

        if data.first().is_some_and(|s| s.abs() < threshold) {
            push(0);
        }
        for i in 1..data.len() {
            let (prev, cur) = (data[i - 1], data[i]);
            if (prev < 0.0 && cur > 0.0) || (prev > 0.0 && cur < 0.0) {
                // Fraction of the way from i-1 to i where the line hits zero.
                let frac = prev / (prev - cur);
                push(if frac < 0.5 { i - 1 } else { i });
            }
            if cur.abs() < threshold {
                push(i);
            }
        }

        Self {
            times: indices
                .into_iter()
                .map(|i| i as f64 / sample_rate)
                .collect(),
        }
    }

    /// Wraps an already sorted list of times.
    pub fn from_sorted(times: Vec<f64>) -> Self {
        debug_assert!(times.windows(2).all(|w| w[0] <= w[1]));
        Self { times }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Returns the crossing nearest to `time`, or `time` itself when there are none.
    pub fn snap(&self, time: f64) -> f64 {
        snap_to_nearest(time, &self.times)
    }
}

/// Nearest value in an ascending list, first (earlier) candidate on a tie.
/// Returns `time` unchanged for an empty list.
pub fn snap_to_nearest(time: f64, sorted: &[f64]) -> f64 {
    let idx = sorted.partition_point(|&t| t < time);
    let after = sorted.get(idx).copied();
    let before = idx.checked_sub(1).map(|i| sorted[i]);
    match (before, after) {
        (Some(b), Some(a)) => {
            if (time - b).abs() <= (a - time).abs() {
                b
            } else {
                a
            }
        }
        (Some(b), None) => b,
        (None, Some(a)) => a,
        (None, None) => time,
    }
}
