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
use std::time::Duration;

use config::{Config, File, FileFormat};
use duration_string::DurationString;
use serde::Deserialize;

use super::error::ConfigError;
use crate::samples::{EnvelopeSettings, FilterSettings, VolumeSettings, DEFAULT_ZERO_THRESHOLD};

const DEFAULT_SAMPLE_RATE: u32 = 44100;
const DEFAULT_CHANNELS: u16 = 2;
const DEFAULT_MASTER_VOLUME: f32 = 1.0;
const DEFAULT_SCHEDULE_AHEAD: Duration = Duration::from_millis(5);
const DEFAULT_RELEASE_TAIL: Duration = Duration::from_millis(100);
const DEFAULT_PANIC_FADE: Duration = Duration::from_millis(5);
const DEFAULT_PARAM_SMOOTHING: Duration = Duration::from_millis(10);

fn parse_duration(
    field: &'static str,
    value: &Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match value {
        Some(value) => Ok(DurationString::from_string(value.clone())
            .map_err(|source| ConfigError::Duration { field, source })?
            .into()),
        None => Ok(default),
    }
}

/// A YAML representation of the sampler engine configuration.
///
/// Every field is optional; durations are strings like `"100ms"`.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct EngineConfig {
    /// Render sample rate in Hz (default: 44100).
    sample_rate: Option<u32>,

    /// Output channel count (default: 2).
    channels: Option<u16>,

    /// Initial master volume (default: 1.0).
    master_volume: Option<f32>,

    /// Lookahead between a note-on and its scheduled start (default: 5ms).
    schedule_ahead: Option<String>,

    /// Time between the end of a release ramp and the hard stop (default: 100ms).
    release_tail: Option<String>,

    /// Fade used when stopping every voice at once (default: 5ms).
    panic_fade: Option<String>,

    /// Ramp time for live volume edits (default: 10ms).
    param_smoothing: Option<String>,

    /// Samples with a magnitude below this count as zero crossings (default: 0.001).
    zero_crossing_threshold: Option<f32>,

    /// Settings given to newly loaded samples.
    #[serde(default)]
    defaults: SampleDefaults,
}

impl EngineConfig {
    /// A configuration with every default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads and validates a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<EngineConfig>()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize::<EngineConfig>()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every field that can hold a bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate() == 0 {
            return Err(ConfigError::Invalid {
                field: "sample_rate",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.channels() == 0 {
            return Err(ConfigError::Invalid {
                field: "channels",
                reason: "must be greater than zero".to_string(),
            });
        }
        self.schedule_ahead()?;
        self.release_tail()?;
        self.panic_fade()?;
        self.param_smoothing()?;
        self.defaults.envelope()?;
        let filters = self.defaults.filters();
        if filters.low_cutoff >= filters.high_cutoff {
            return Err(ConfigError::Invalid {
                field: "defaults.low_cutoff",
                reason: format!(
                    "{} Hz is not below high_cutoff {} Hz",
                    filters.low_cutoff, filters.high_cutoff
                ),
            });
        }
        Ok(())
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    /// Uses `sample_rate` unless a rate was already set.
    pub fn or_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate.get_or_insert(sample_rate);
        self
    }

    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channels = Some(channels);
        self
    }

    pub fn with_master_volume(mut self, volume: f32) -> Self {
        self.master_volume = Some(volume);
        self
    }

    pub fn with_defaults(mut self, defaults: SampleDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Returns the render sample rate (default: 44100).
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    /// Returns the output channel count (default: 2).
    pub fn channels(&self) -> u16 {
        self.channels.unwrap_or(DEFAULT_CHANNELS)
    }

    /// Returns the initial master volume, clamped to `[0, 1]`.
    pub fn master_volume(&self) -> f32 {
        self.master_volume
            .unwrap_or(DEFAULT_MASTER_VOLUME)
            .clamp(0.0, 1.0)
    }

    pub fn schedule_ahead(&self) -> Result<Duration, ConfigError> {
        parse_duration(
            "schedule_ahead",
            &self.schedule_ahead,
            DEFAULT_SCHEDULE_AHEAD,
        )
    }

    pub fn release_tail(&self) -> Result<Duration, ConfigError> {
        parse_duration("release_tail", &self.release_tail, DEFAULT_RELEASE_TAIL)
    }

    pub fn panic_fade(&self) -> Result<Duration, ConfigError> {
        parse_duration("panic_fade", &self.panic_fade, DEFAULT_PANIC_FADE)
    }

    pub fn param_smoothing(&self) -> Result<Duration, ConfigError> {
        parse_duration(
            "param_smoothing",
            &self.param_smoothing,
            DEFAULT_PARAM_SMOOTHING,
        )
    }

    pub fn zero_crossing_threshold(&self) -> f32 {
        self.zero_crossing_threshold.unwrap_or(DEFAULT_ZERO_THRESHOLD)
    }

    pub fn defaults(&self) -> &SampleDefaults {
        &self.defaults
    }
}

/// Settings given to a sample when its record does not carry them.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct SampleDefaults {
    /// Attack time (default: 20ms).
    attack: Option<String>,

    /// Release time (default: 200ms).
    release: Option<String>,

    sample_volume: Option<f32>,
    loop_volume: Option<f32>,

    /// High-pass cutoff in Hz (default: 20).
    low_cutoff: Option<f64>,

    /// Low-pass cutoff in Hz (default: 20000).
    high_cutoff: Option<f64>,
}

impl SampleDefaults {
    pub fn with_attack(mut self, attack: &str) -> Self {
        self.attack = Some(attack.to_string());
        self
    }

    pub fn with_release(mut self, release: &str) -> Self {
        self.release = Some(release.to_string());
        self
    }

    pub fn envelope(&self) -> Result<EnvelopeSettings, ConfigError> {
        let base = EnvelopeSettings::default();
        Ok(EnvelopeSettings {
            attack_time: parse_duration(
                "defaults.attack",
                &self.attack,
                Duration::from_secs_f64(base.attack_time),
            )?
            .as_secs_f64(),
            release_time: parse_duration(
                "defaults.release",
                &self.release,
                Duration::from_secs_f64(base.release_time),
            )?
            .as_secs_f64(),
        })
    }

    pub fn volume(&self) -> VolumeSettings {
        let base = VolumeSettings::default();
        VolumeSettings {
            sample_volume: self
                .sample_volume
                .unwrap_or(base.sample_volume)
                .clamp(0.0, 1.0),
            loop_volume: self
                .loop_volume
                .unwrap_or(base.loop_volume)
                .clamp(0.0, 1.0),
        }
    }

    pub fn filters(&self) -> FilterSettings {
        let base = FilterSettings::default();
        FilterSettings {
            low_cutoff: self.low_cutoff.unwrap_or(base.low_cutoff),
            high_cutoff: self.high_cutoff.unwrap_or(base.high_cutoff),
        }
    }
}
