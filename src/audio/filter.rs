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

//! The persistent per-sample filter stage: high-pass ("low cutoff") into
//! low-pass ("high cutoff"), one filter pair per output channel.

use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type, Q_BUTTERWORTH_F32};

use crate::samples::FilterSettings;

/// Lowest cutoff the filters accept.
const MIN_CUTOFF_HZ: f32 = 1.0;

/// A per-sample bus every voice of that sample is mixed into before the master stage.
pub struct SampleBus {
    sample_rate: f32,
    high_pass: Vec<DirectForm2Transposed<f32>>,
    low_pass: Vec<DirectForm2Transposed<f32>>,
    settings: FilterSettings,
    /// Voices of this sample are summed here each frame.
    scratch: Vec<f32>,
}

impl SampleBus {
    /// Creates a bus for `num_channels` output channels.
    pub fn new(sample_rate: u32, num_channels: u16, settings: FilterSettings) -> Self {
        let sample_rate = sample_rate as f32;
        let (hp, lp) = Self::coefficients(sample_rate, &settings);
        let channels = num_channels as usize;
        Self {
            sample_rate,
            high_pass: (0..channels)
                .map(|_| DirectForm2Transposed::<f32>::new(hp))
                .collect(),
            low_pass: (0..channels)
                .map(|_| DirectForm2Transposed::<f32>::new(lp))
                .collect(),
            settings,
            scratch: vec![0.0; channels],
        }
    }

    /// Returns the current filter settings.
    pub fn settings(&self) -> &FilterSettings {
        &self.settings
    }

    /// Updates the cutoffs. Filter state is kept so the change does not click.
    pub fn set_filters(&mut self, settings: FilterSettings) {
        let (hp, lp) = Self::coefficients(self.sample_rate, &settings);
        for f in self.high_pass.iter_mut() {
            f.update_coefficients(hp);
        }
        for f in self.low_pass.iter_mut() {
            f.update_coefficients(lp);
        }
        self.settings = settings;
    }

    /// Mutable access to the per-frame input accumulator.
    #[inline]
    pub fn input_mut(&mut self) -> &mut [f32] {
        &mut self.scratch
    }

    /// Clears the accumulator for the next frame.
    #[inline]
    pub fn clear(&mut self) {
        self.scratch.fill(0.0);
    }

    /// Filters the accumulated frame and adds it into `output`.
    #[inline]
    pub fn process_into(&mut self, output: &mut [f32]) {
        for (ch, out) in output.iter_mut().enumerate().take(self.scratch.len()) {
            let s = self.high_pass[ch].run(self.scratch[ch]);
            *out += self.low_pass[ch].run(s);
        }
    }

    fn coefficients(
        sample_rate: f32,
        settings: &FilterSettings,
    ) -> (Coefficients<f32>, Coefficients<f32>) {
        let fs = sample_rate.hz();
        let nyquist = sample_rate / 2.0 - 1.0;

        let hp = Coefficients::<f32>::from_params(
            Type::HighPass,
            fs,
            (settings.low_cutoff as f32).clamp(MIN_CUTOFF_HZ, nyquist).hz(),
            Q_BUTTERWORTH_F32,
        )
        .unwrap_or_else(|_| Self::unity_coeffs());

        let lp = Coefficients::<f32>::from_params(
            Type::LowPass,
            fs,
            (settings.high_cutoff as f32).clamp(MIN_CUTOFF_HZ, nyquist).hz(),
            Q_BUTTERWORTH_F32,
        )
        .unwrap_or_else(|_| Self::unity_coeffs());

        (hp, lp)
    }

    /// Coefficients that pass audio unmodified.
    fn unity_coeffs() -> Coefficients<f32> {
        Coefficients {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{calculate_rms, sine};

    fn run_mono(bus: &mut SampleBus, input: &[f32]) -> Vec<f32> {
        input
            .iter()
            .map(|&x| {
                bus.clear();
                bus.input_mut()[0] = x;
                let mut out = [0.0f32];
                bus.process_into(&mut out);
                out[0]
            })
            .collect()
    }

    #[test]
    fn test_wide_open_bus_passes_signal() {
        let mut bus = SampleBus::new(44100, 1, FilterSettings::default());
        let input = sine(1000.0, 0.5, 44100, 0.5);
        let output = run_mono(&mut bus, &input);

        let ratio = calculate_rms(&output[4410..]) / calculate_rms(&input[4410..]);
        assert!((ratio - 1.0).abs() < 0.05, "ratio was {ratio}");
    }

    #[test]
    fn test_low_pass_attenuates_highs() {
        let mut bus = SampleBus::new(
            44100,
            1,
            FilterSettings {
                low_cutoff: 20.0,
                high_cutoff: 200.0,
            },
        );
        let input = sine(5000.0, 0.5, 44100, 0.5);
        let output = run_mono(&mut bus, &input);

        let ratio = calculate_rms(&output[4410..]) / calculate_rms(&input[4410..]);
        assert!(ratio < 0.05, "ratio was {ratio}");
    }

    #[test]
    fn test_high_pass_attenuates_lows_after_update() {
        let mut bus = SampleBus::new(44100, 1, FilterSettings::default());
        bus.set_filters(FilterSettings {
            low_cutoff: 5000.0,
            high_cutoff: 20000.0,
        });
        assert_eq!(bus.settings().low_cutoff, 5000.0);

        let input = sine(100.0, 0.5, 44100, 0.5);
        let output = run_mono(&mut bus, &input);
        let ratio = calculate_rms(&output[4410..]) / calculate_rms(&input[4410..]);
        assert!(ratio < 0.05, "ratio was {ratio}");
    }
}
