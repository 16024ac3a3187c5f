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

//! Per-sample parameter records.
//!
//! These are the plain records exchanged with the persistence layer, so field names
//! serialize in camelCase (`startPoint`, `loopLocked`, ...).

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::SamplerError;

/// Opaque stable identifier for a loaded sample.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleId(String);

impl SampleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SampleId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SampleId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Playback and loop window, in buffer seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSettings {
    pub start_point: f64,
    pub end_point: f64,
    pub loop_start: f64,
    pub loop_end: f64,
}

impl TimeSettings {
    /// The whole buffer, for both playback and loop.
    pub fn full(duration: f64) -> Self {
        Self {
            start_point: 0.0,
            end_point: duration,
            loop_start: 0.0,
            loop_end: duration,
        }
    }

    /// Checks `0 <= start < end <= duration` for both windows.
    pub fn validate(&self, duration: f64) -> Result<(), SamplerError> {
        check_region(self.start_point, self.end_point, duration)?;
        check_region(self.loop_start, self.loop_end, duration)
    }
}

/// Checks that `start..end` is a non-empty, ordered region inside `0..=duration`.
pub(crate) fn check_region(start: f64, end: f64, duration: f64) -> Result<(), SamplerError> {
    if !(start.is_finite() && end.is_finite()) || start < 0.0 || end > duration || start >= end
    {
        return Err(SamplerError::DegenerateRegion { start, end });
    }
    Ok(())
}

/// Attack and release times in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeSettings {
    pub attack_time: f64,
    pub release_time: f64,
}

impl Default for EnvelopeSettings {
    fn default() -> Self {
        Self {
            attack_time: 0.02,
            release_time: 0.2,
        }
    }
}

/// Voice levels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSettings {
    pub sample_volume: f32,
    /// Extra factor applied while a voice's source is looping.
    pub loop_volume: f32,
}

impl Default for VolumeSettings {
    fn default() -> Self {
        Self {
            sample_volume: 1.0,
            loop_volume: 1.0,
        }
    }
}

/// Per-sample filter cutoffs in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSettings {
    /// High-pass cutoff.
    pub low_cutoff: f64,
    /// Low-pass cutoff.
    pub high_cutoff: f64,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            low_cutoff: 20.0,
            high_cutoff: 20000.0,
        }
    }
}

/// Static pitch offset applied on top of the played note.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PitchSettings {
    pub transpose: i32,
    pub detune_cents: f64,
}

impl PitchSettings {
    /// Offset in (fractional) semitones.
    pub fn semitones(&self) -> f64 {
        self.transpose as f64 + self.detune_cents / 100.0
    }
}

/// The authoritative parameter state of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleSettings {
    pub time: TimeSettings,
    pub envelope: EnvelopeSettings,
    pub volume: VolumeSettings,
    pub filters: FilterSettings,
    #[serde(default)]
    pub pitch: PitchSettings,
    /// When set the sample loops regardless of the global loop flag.
    #[serde(default)]
    pub loop_locked: bool,
}

impl SampleSettings {
    /// Settings covering the whole buffer with the given defaults.
    pub fn with_defaults(
        duration: f64,
        envelope: EnvelopeSettings,
        volume: VolumeSettings,
        filters: FilterSettings,
    ) -> Self {
        Self {
            time: TimeSettings::full(duration),
            envelope,
            volume,
            filters,
            pitch: PitchSettings::default(),
            loop_locked: false,
        }
    }

    /// Shallow-merges a partial update: every field that is set replaces the current one.
    pub fn merge(&mut self, update: &SettingsUpdate) {
        if let Some(time) = &update.time {
            merge_field(&mut self.time.start_point, time.start_point);
            merge_field(&mut self.time.end_point, time.end_point);
            merge_field(&mut self.time.loop_start, time.loop_start);
            merge_field(&mut self.time.loop_end, time.loop_end);
        }
        if let Some(envelope) = &update.envelope {
            merge_field(&mut self.envelope.attack_time, envelope.attack_time);
            merge_field(&mut self.envelope.release_time, envelope.release_time);
        }
        if let Some(volume) = &update.volume {
            merge_field(&mut self.volume.sample_volume, volume.sample_volume);
            merge_field(&mut self.volume.loop_volume, volume.loop_volume);
        }
        if let Some(filters) = &update.filters {
            merge_field(&mut self.filters.low_cutoff, filters.low_cutoff);
            merge_field(&mut self.filters.high_cutoff, filters.high_cutoff);
        }
        if let Some(pitch) = &update.pitch {
            merge_field(&mut self.pitch.transpose, pitch.transpose);
            merge_field(&mut self.pitch.detune_cents, pitch.detune_cents);
        }
        merge_field(&mut self.loop_locked, update.loop_locked);
    }

    /// Forces every field back inside its valid range for a buffer of `duration`
    /// seconds. Windows that cannot be repaired fall back to the whole buffer and
    /// non-finite values fall back to their defaults.
    pub fn sanitize(&mut self, duration: f64) {
        let full = TimeSettings::full(duration);
        let t = &mut self.time;
        t.start_point = t.start_point.clamp(0.0, duration);
        t.end_point = t.end_point.clamp(0.0, duration);
        if check_region(t.start_point, t.end_point, duration).is_err() {
            t.start_point = full.start_point;
            t.end_point = full.end_point;
        }
        t.loop_start = t.loop_start.clamp(0.0, duration);
        t.loop_end = t.loop_end.clamp(0.0, duration);
        if check_region(t.loop_start, t.loop_end, duration).is_err() {
            t.loop_start = full.loop_start;
            t.loop_end = full.loop_end;
        }

        let envelope = EnvelopeSettings::default();
        self.envelope.attack_time =
            finite_or(self.envelope.attack_time, envelope.attack_time).max(0.0);
        self.envelope.release_time =
            finite_or(self.envelope.release_time, envelope.release_time).max(0.0);

        let volume = VolumeSettings::default();
        self.volume.sample_volume = finite_or_f32(self.volume.sample_volume, volume.sample_volume)
            .clamp(0.0, 1.0);
        self.volume.loop_volume =
            finite_or_f32(self.volume.loop_volume, volume.loop_volume).clamp(0.0, 1.0);

        self.pitch.detune_cents = finite_or(self.pitch.detune_cents, 0.0);

        let filters = self.filters;
        if !(filters.low_cutoff > 0.0
            && filters.low_cutoff < filters.high_cutoff
            && filters.high_cutoff.is_finite())
        {
            self.filters = FilterSettings::default();
        }
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

fn finite_or_f32(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

fn merge_field<T: Copy>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

/// Partial [`TimeSettings`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeUpdate {
    pub start_point: Option<f64>,
    pub end_point: Option<f64>,
    pub loop_start: Option<f64>,
    pub loop_end: Option<f64>,
}

impl TimeUpdate {
    pub fn loop_points(start: f64, end: f64) -> Self {
        Self {
            loop_start: Some(start),
            loop_end: Some(end),
            ..Default::default()
        }
    }

    pub fn play_points(start: f64, end: f64) -> Self {
        Self {
            start_point: Some(start),
            end_point: Some(end),
            ..Default::default()
        }
    }
}

/// Partial [`EnvelopeSettings`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvelopeUpdate {
    pub attack_time: Option<f64>,
    pub release_time: Option<f64>,
}

/// Partial [`VolumeSettings`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VolumeUpdate {
    pub sample_volume: Option<f32>,
    pub loop_volume: Option<f32>,
}

/// Partial [`FilterSettings`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterUpdate {
    pub low_cutoff: Option<f64>,
    pub high_cutoff: Option<f64>,
}

/// Partial [`PitchSettings`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PitchUpdate {
    pub transpose: Option<i32>,
    pub detune_cents: Option<f64>,
}

/// A partial [`SampleSettings`] edit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsUpdate {
    pub time: Option<TimeUpdate>,
    pub envelope: Option<EnvelopeUpdate>,
    pub volume: Option<VolumeUpdate>,
    pub filters: Option<FilterUpdate>,
    pub pitch: Option<PitchUpdate>,
    pub loop_locked: Option<bool>,
}

impl SettingsUpdate {
    pub fn time(time: TimeUpdate) -> Self {
        Self {
            time: Some(time),
            ..Default::default()
        }
    }

    pub fn envelope(envelope: EnvelopeUpdate) -> Self {
        Self {
            envelope: Some(envelope),
            ..Default::default()
        }
    }

    pub fn volume(volume: VolumeUpdate) -> Self {
        Self {
            volume: Some(volume),
            ..Default::default()
        }
    }

    pub fn filters(filters: FilterUpdate) -> Self {
        Self {
            filters: Some(filters),
            ..Default::default()
        }
    }

    pub fn pitch(pitch: PitchUpdate) -> Self {
        Self {
            pitch: Some(pitch),
            ..Default::default()
        }
    }

    pub fn loop_locked(locked: bool) -> Self {
        Self {
            loop_locked: Some(locked),
            ..Default::default()
        }
    }

    /// True when nothing is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// True when the edit moves a loop boundary.
    pub fn touches_loop_points(&self) -> bool {
        self.time
            .is_some_and(|t| t.loop_start.is_some() || t.loop_end.is_some())
    }

    /// True when the edit changes a voice level.
    pub fn touches_volume(&self) -> bool {
        self.volume
            .is_some_and(|v| v.sample_volume.is_some() || v.loop_volume.is_some())
    }
}

/// A sample record as received from persistence: id, display name, and whatever
/// settings were saved. Missing settings are filled from the engine defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleRecord {
    pub id: SampleId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub settings: SettingsUpdate,
}

impl SampleRecord {
    pub fn new(id: impl Into<SampleId>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            settings: SettingsUpdate::default(),
        }
    }

    pub fn with_settings(mut self, settings: SettingsUpdate) -> Self {
        self.settings = settings;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults(duration: f64) -> SampleSettings {
        SampleSettings::with_defaults(
            duration,
            EnvelopeSettings::default(),
            VolumeSettings::default(),
            FilterSettings::default(),
        )
    }

    #[test]
    fn test_merge_is_shallow_per_field() {
        let mut settings = defaults(2.0);
        settings.merge(&SettingsUpdate {
            time: Some(TimeUpdate {
                loop_start: Some(0.5),
                ..Default::default()
            }),
            volume: Some(VolumeUpdate {
                loop_volume: Some(0.25),
                ..Default::default()
            }),
            loop_locked: Some(true),
            ..Default::default()
        });

        assert_eq!(settings.time.loop_start, 0.5);
        assert_eq!(settings.time.loop_end, 2.0);
        assert_eq!(settings.time.end_point, 2.0);
        assert_eq!(settings.volume.sample_volume, 1.0);
        assert_eq!(settings.volume.loop_volume, 0.25);
        assert!(settings.loop_locked);
    }

    #[test]
    fn test_sanitize_repairs_windows() {
        let mut settings = defaults(1.0);
        settings.time.start_point = 0.9;
        settings.time.end_point = 0.2;
        settings.time.loop_end = 5.0;
        settings.volume.sample_volume = 3.0;
        settings.filters.low_cutoff = 30000.0;
        settings.sanitize(1.0);

        assert_eq!(settings.time.start_point, 0.0);
        assert_eq!(settings.time.end_point, 1.0);
        assert_eq!(settings.time.loop_end, 1.0);
        assert_eq!(settings.volume.sample_volume, 1.0);
        assert_eq!(settings.filters, FilterSettings::default());
        assert!(settings.time.validate(1.0).is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_loop() {
        let time = TimeSettings {
            start_point: 0.0,
            end_point: 1.0,
            loop_start: 0.6,
            loop_end: 0.4,
        };
        assert_eq!(
            time.validate(1.0),
            Err(SamplerError::DegenerateRegion {
                start: 0.6,
                end: 0.4
            })
        );
    }

    #[test]
    fn test_update_helpers() {
        assert!(SettingsUpdate::default().is_empty());
        assert!(SettingsUpdate::time(TimeUpdate::loop_points(0.1, 0.2)).touches_loop_points());
        assert!(!SettingsUpdate::time(TimeUpdate::play_points(0.1, 0.2)).touches_loop_points());
        assert!(SettingsUpdate::volume(VolumeUpdate {
            sample_volume: Some(0.5),
            ..Default::default()
        })
        .touches_volume());
    }

    #[test]
    fn test_record_deserializes_camel_case() {
        let record: SampleRecord = serde_json::from_str(
            r#"{
                "id": "kick",
                "name": "Kick",
                "settings": {
                    "time": { "loopStart": 0.25 },
                    "loopLocked": true
                }
            }"#,
        )
        .unwrap();

        assert_eq!(record.id, SampleId::from("kick"));
        assert_eq!(record.name, "Kick");
        assert_eq!(record.settings.time.unwrap().loop_start, Some(0.25));
        assert_eq!(record.settings.loop_locked, Some(true));
    }
}
