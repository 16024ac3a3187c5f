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

//! Voices for polyphonic sample playback.
//!
//! A voice is single-use: created on note-on, started once, released at most once,
//! and dropped when the render side reports it finished. Its parameters come from a
//! private settings snapshot that only explicit fan-out updates change.

use std::sync::Arc;

use tracing::debug;

use super::error::SamplerError;
use super::note_table::{quantize_loop_length, MIN_LOOP_LENGTH, QUANTIZE_BELOW};
use super::settings::{check_region, SampleId, SampleSettings, SettingsUpdate};
use super::zero_crossing::ZeroCrossings;
use crate::audio::command::{RenderCommand, RenderSender, VoiceOp, VoicePlayback};
use crate::audio::param::{GainAutomation, GainOp};
use crate::audio::DecodedBuffer;

/// MIDI note that plays a sample at its recorded pitch.
pub const REFERENCE_NOTE: u8 = 60;

/// Generational handle to a voice in a [`VoiceArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId {
    index: u32,
    generation: u32,
}

impl VoiceId {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for VoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Lifecycle of a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Created,
    Attacking,
    Sustaining,
    Releasing,
    Stopped,
}

impl VoiceState {
    /// Attacking or sustaining: audible and not yet on its way out.
    pub fn is_sustaining(self) -> bool {
        matches!(self, VoiceState::Attacking | VoiceState::Sustaining)
    }
}

/// Scheduling constants shared by every voice of an engine, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceTiming {
    /// Lookahead between note-on and the scheduled start.
    pub schedule_ahead: f64,
    /// Gap between the end of the release ramp and the hard stop.
    pub release_tail: f64,
    /// Ramp time for live level changes.
    pub param_smoothing: f64,
}

impl Default for VoiceTiming {
    fn default() -> Self {
        Self {
            schedule_ahead: 0.005,
            release_tail: 0.1,
            param_smoothing: 0.01,
        }
    }
}

/// Playback rate for `note` with a pitch offset in semitones.
pub fn playback_rate(note: u8, semitones: f64) -> f64 {
    2f64.powf((note as f64 - REFERENCE_NOTE as f64 + semitones) / 12.0)
}

/// Places a loop region on click-free boundaries.
///
/// Both bounds snap to the nearest zero crossing. Returns `None`, meaning "keep the
/// previous loop", when the requested region is inverted or outside the buffer, or
/// when the snapped loop is shorter than [`MIN_LOOP_LENGTH`]. A snapped loop shorter
/// than [`QUANTIZE_BELOW`] has its length quantized to a note period with the start
/// held fixed.
pub fn calculate_loop_points(
    loop_start: f64,
    loop_end: f64,
    crossings: &ZeroCrossings,
    duration: f64,
) -> Option<(f64, f64)> {
    if check_region(loop_start, loop_end, duration).is_err() {
        return None;
    }

    let start = crossings.snap(loop_start);
    let mut end = crossings.snap(loop_end);
    let length = end - start;
    if length < MIN_LOOP_LENGTH {
        return None;
    }
    if length < QUANTIZE_BELOW {
        end = (start + quantize_loop_length(length)).min(duration);
    }
    Some((start, end))
}

/// An active voice playing one sample for one note.
#[derive(Debug)]
pub struct Voice {
    id: VoiceId,
    sample_id: SampleId,
    midi_note: u8,
    /// Clock time of the note-on.
    trigger_time: f64,
    /// Render time the source starts.
    start_time: f64,
    playback_rate: f64,
    settings: SampleSettings,
    crossings: Arc<ZeroCrossings>,
    duration: f64,
    looping: bool,
    loop_start: f64,
    loop_end: f64,
    /// Mirror of the render side's gain timeline.
    gain: GainAutomation,
    attack_end: f64,
    state: VoiceState,
    /// Note-off arrived while hold was on.
    release_pending: bool,
    stop_at: Option<f64>,
    timing: VoiceTiming,
    render: RenderSender,
}

impl Voice {
    /// Creates a voice from the sample's current settings. Nothing is scheduled
    /// until [`Voice::start`].
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: VoiceId,
        sample_id: SampleId,
        midi_note: u8,
        settings: SampleSettings,
        crossings: Arc<ZeroCrossings>,
        duration: f64,
        looping: bool,
        timing: VoiceTiming,
        render: RenderSender,
    ) -> Self {
        let (loop_start, loop_end) = calculate_loop_points(
            settings.time.loop_start,
            settings.time.loop_end,
            &crossings,
            duration,
        )
        .unwrap_or((settings.time.loop_start, settings.time.loop_end));

        Self {
            id,
            sample_id,
            midi_note,
            trigger_time: 0.0,
            start_time: 0.0,
            playback_rate: playback_rate(midi_note, settings.pitch.semitones()),
            settings,
            crossings,
            duration,
            looping,
            loop_start,
            loop_end,
            gain: GainAutomation::new(0.0),
            attack_end: 0.0,
            state: VoiceState::Created,
            release_pending: false,
            stop_at: None,
            timing,
            render,
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn sample_id(&self) -> &SampleId {
        &self.sample_id
    }

    pub fn midi_note(&self) -> u8 {
        self.midi_note
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn loop_points(&self) -> (f64, f64) {
        (self.loop_start, self.loop_end)
    }

    pub fn settings(&self) -> &SampleSettings {
        &self.settings
    }

    pub fn gain(&self) -> &GainAutomation {
        &self.gain
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn trigger_time(&self) -> f64 {
        self.trigger_time
    }

    pub fn stop_at(&self) -> Option<f64> {
        self.stop_at
    }

    pub fn is_release_pending(&self) -> bool {
        self.release_pending
    }

    /// Marks a note-off that arrived while hold was on.
    pub fn set_release_pending(&mut self) {
        self.release_pending = true;
    }

    /// Checks if this voice was triggered by `note`.
    pub fn matches_note(&self, note: u8) -> bool {
        self.midi_note == note
    }

    /// Level the voice sustains at.
    fn target_level(&self) -> f32 {
        let volume = &self.settings.volume;
        if self.looping {
            volume.sample_volume * volume.loop_volume
        } else {
            volume.sample_volume
        }
    }

    fn send_gain(&mut self, op: GainOp) -> Result<(), SamplerError> {
        self.gain.apply(op);
        if let GainOp::CancelAndHold { time } = op {
            self.gain.prune_before(time);
        }
        self.render.voice(self.id, VoiceOp::Gain(op))
    }

    /// Schedules playback against the render clock time `now` and hands the voice
    /// to the renderer.
    pub fn start(&mut self, buffer: Arc<DecodedBuffer>, now: f64) -> Result<(), SamplerError> {
        if self.state != VoiceState::Created {
            return Ok(());
        }

        let t0 = now + self.timing.schedule_ahead;
        let attack = self.settings.envelope.attack_time.max(0.0);
        let level = self.target_level();
        self.trigger_time = now;
        self.start_time = t0;
        self.attack_end = t0 + attack;

        let mut gain = GainAutomation::new(0.0);
        if attack > 0.0 {
            gain.set_value_at_time(0.0, t0);
            gain.linear_ramp_to_value_at_time(level, self.attack_end);
        } else {
            gain.set_value_at_time(level, t0);
        }
        self.gain = gain.clone();

        let playback = VoicePlayback {
            voice: self.id,
            sample: self.sample_id.clone(),
            buffer,
            playback_rate: self.playback_rate,
            start_time: t0,
            offset: self.settings.time.start_point,
            end_point: self.settings.time.end_point,
            looping: self.looping,
            loop_start: self.loop_start,
            loop_end: self.loop_end,
            gain,
        };
        self.render
            .send(RenderCommand::StartVoice(Box::new(playback)))?;
        self.state = VoiceState::Attacking;

        debug!(
            voice = %self.id,
            sample = %self.sample_id,
            note = self.midi_note,
            rate = self.playback_rate,
            start = t0,
            looping = self.looping,
            "Voice started"
        );
        Ok(())
    }

    /// Moves an attacking voice to sustaining once its attack ramp has passed.
    pub fn advance(&mut self, now: f64) {
        if self.state == VoiceState::Attacking && now >= self.attack_end {
            self.state = VoiceState::Sustaining;
        }
    }

    /// Ramps to silence over the release time, then stops after the release tail.
    /// Returns false if the voice was not sustaining.
    pub fn release(&mut self, now: f64) -> Result<bool, SamplerError> {
        let release = self.settings.envelope.release_time.max(0.0);
        self.fade_out(now, release).map(|released| {
            if released {
                debug!(voice = %self.id, note = self.midi_note, release, "Voice released");
            }
            released
        })
    }

    /// Like [`Voice::release`] with an explicit fade time, for panic stops.
    pub fn fade_out(&mut self, now: f64, fade: f64) -> Result<bool, SamplerError> {
        if !self.state.is_sustaining() {
            return Ok(false);
        }

        let at = now.max(self.start_time);
        let end = at + fade;
        let stop = end + self.timing.release_tail;
        self.send_gain(GainOp::CancelAndHold { time: at })?;
        self.send_gain(GainOp::LinearRampTo {
            value: 0.0,
            time: end,
        })?;
        self.render.voice(self.id, VoiceOp::StopAt(stop))?;

        self.stop_at = Some(stop);
        self.state = VoiceState::Releasing;
        self.release_pending = false;
        Ok(true)
    }

    /// Stops the source at once, skipping the release ramp.
    pub fn force_stop(&mut self) -> Result<(), SamplerError> {
        let scheduled = !matches!(self.state, VoiceState::Created | VoiceState::Stopped);
        self.state = VoiceState::Stopped;
        if scheduled {
            self.render.voice(self.id, VoiceOp::StopNow)?;
        }
        Ok(())
    }

    /// Marks the voice finished after the render side dropped it.
    pub fn finish(&mut self) {
        self.state = VoiceState::Stopped;
    }

    /// Switches the source's loop flag, retargeting the sustain level.
    pub fn set_looping(&mut self, looping: bool, now: f64) -> Result<(), SamplerError> {
        if self.looping == looping || self.state == VoiceState::Stopped {
            return Ok(());
        }
        self.looping = looping;
        self.render.voice(self.id, VoiceOp::SetLoop(looping))?;
        self.retarget_level(now)
    }

    /// Applies a fan-out edit: merges it into the snapshot, re-places the loop when a
    /// loop bound moved, and ramps to the new level when a volume changed.
    pub fn apply_update(&mut self, update: &SettingsUpdate, now: f64) -> Result<(), SamplerError> {
        self.settings.merge(update);

        if update.touches_loop_points() {
            match calculate_loop_points(
                self.settings.time.loop_start,
                self.settings.time.loop_end,
                &self.crossings,
                self.duration,
            ) {
                Some((start, end)) => {
                    self.loop_start = start;
                    self.loop_end = end;
                    self.render
                        .voice(self.id, VoiceOp::LoopPoints { start, end })?;
                }
                None => debug!(
                    voice = %self.id,
                    start = self.settings.time.loop_start,
                    end = self.settings.time.loop_end,
                    "Loop region too short to move, keeping previous loop"
                ),
            }
        }

        if update.touches_volume() {
            self.retarget_level(now)?;
        }
        Ok(())
    }

    /// Ramps the sustain level to the current target. Attacking voices land on the
    /// new level at the end of their attack; releasing voices are left alone.
    fn retarget_level(&mut self, now: f64) -> Result<(), SamplerError> {
        if !self.state.is_sustaining() {
            return Ok(());
        }
        let level = self.target_level();
        let at = now.max(self.start_time);
        let end = if at < self.attack_end {
            self.attack_end
        } else {
            at + self.timing.param_smoothing
        };
        self.send_gain(GainOp::CancelAndHold { time: at })?;
        self.send_gain(GainOp::LinearRampTo {
            value: level,
            time: end,
        })
    }

    /// A read-only summary for callers outside the engine.
    pub fn info(&self) -> VoiceInfo {
        VoiceInfo {
            id: self.id,
            sample_id: self.sample_id.clone(),
            midi_note: self.midi_note,
            state: self.state,
            playback_rate: self.playback_rate,
            looping: self.looping,
            loop_start: self.loop_start,
            loop_end: self.loop_end,
            start_time: self.start_time,
            attack_end: self.attack_end,
            stop_at: self.stop_at,
            release_pending: self.release_pending,
            level: self.gain.final_value(),
        }
    }
}

/// Snapshot of a live voice.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceInfo {
    pub id: VoiceId,
    pub sample_id: SampleId,
    pub midi_note: u8,
    pub state: VoiceState,
    pub playback_rate: f64,
    pub looping: bool,
    pub loop_start: f64,
    pub loop_end: f64,
    pub start_time: f64,
    pub attack_end: f64,
    pub stop_at: Option<f64>,
    pub release_pending: bool,
    /// Level the gain timeline ends on.
    pub level: f32,
}

struct Slot {
    generation: u32,
    voice: Option<Voice>,
}

/// Live voices keyed by generational index. Freed slots are reused with a bumped
/// generation, so a stale [`VoiceId`] never reaches a newer voice.
#[derive(Default)]
pub struct VoiceArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl VoiceArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a slot and stores the voice built for its id.
    pub fn insert_with(&mut self, build: impl FnOnce(VoiceId) -> Voice) -> VoiceId {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    voice: None,
                });
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        let id = VoiceId::new(index, slot.generation);
        slot.voice = Some(build(id));
        self.len += 1;
        id
    }

    pub fn get(&self, id: VoiceId) -> Option<&Voice> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.voice.as_ref())
    }

    pub fn get_mut(&mut self, id: VoiceId) -> Option<&mut Voice> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.voice.as_mut())
    }

    /// Removes a voice and retires its id.
    pub fn remove(&mut self, id: VoiceId) -> Option<Voice> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let voice = slot.voice.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(voice)
    }

    /// Voices in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Voice> {
        self.slots.iter().filter_map(|slot| slot.voice.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Voice> {
        self.slots.iter_mut().filter_map(|slot| slot.voice.as_mut())
    }

    /// Ids of the voices matching `filter`, in slot order.
    pub fn ids_where(&self, filter: impl Fn(&Voice) -> bool) -> Vec<VoiceId> {
        self.iter().filter(|v| filter(v)).map(Voice::id).collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl std::fmt::Debug for VoiceArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceArena")
            .field("active_voices", &self.len)
            .field("slots", &self.slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::command::command_channel;
    use crate::audio::param::AutomationEvent;
    use crate::samples::settings::{
        EnvelopeSettings, FilterSettings, TimeUpdate, VolumeSettings, VolumeUpdate,
    };
    use crossbeam_channel::Receiver;

    fn settings(duration: f64) -> SampleSettings {
        SampleSettings::with_defaults(
            duration,
            EnvelopeSettings::default(),
            VolumeSettings::default(),
            FilterSettings::default(),
        )
    }

    fn make_voice(note: u8, looping: bool) -> (Voice, Receiver<RenderCommand>) {
        let (tx, rx) = command_channel();
        let crossings = Arc::new(ZeroCrossings::from_sorted(vec![
            0.0, 0.1, 0.25, 0.5, 0.75, 1.0,
        ]));
        let voice = Voice::new(
            VoiceId::new(0, 0),
            SampleId::from("test"),
            note,
            settings(1.0),
            crossings,
            1.0,
            looping,
            VoiceTiming::default(),
            tx,
        );
        (voice, rx)
    }

    fn buffer() -> Arc<DecodedBuffer> {
        Arc::new(DecodedBuffer::mono(vec![0.0; 100], 100).unwrap())
    }

    #[test]
    fn test_playback_rate() {
        assert_eq!(playback_rate(60, 0.0), 1.0);
        assert!((playback_rate(72, 0.0) - 2.0).abs() < 1e-12);
        assert!((playback_rate(48, 0.0) - 0.5).abs() < 1e-12);
        assert!((playback_rate(60, 7.0) - playback_rate(67, 0.0)).abs() < 1e-12);
        assert!((playback_rate(60, 0.5) - 2f64.powf(0.5 / 12.0)).abs() < 1e-12);
    }

    #[test]
    fn test_loop_points_snap_to_crossings() {
        let crossings = ZeroCrossings::from_sorted(vec![0.0, 0.1, 0.25, 0.5]);
        assert_eq!(
            calculate_loop_points(0.11, 0.45, &crossings, 1.0),
            Some((0.1, 0.5))
        );
    }

    #[test]
    fn test_loop_points_degenerate() {
        let crossings = ZeroCrossings::from_sorted(vec![0.0, 0.1, 0.25, 0.5]);
        assert_eq!(calculate_loop_points(0.5, 0.2, &crossings, 1.0), None);
        assert_eq!(calculate_loop_points(0.2, 0.2, &crossings, 1.0), None);
        assert_eq!(calculate_loop_points(0.2, 1.5, &crossings, 1.0), None);
        // Both bounds land on the same crossing.
        assert_eq!(calculate_loop_points(0.24, 0.26, &crossings, 1.0), None);
    }

    #[test]
    fn test_short_loop_is_quantized() {
        let crossings = ZeroCrossings::from_sorted(vec![0.1, 0.103]);
        let (start, end) = calculate_loop_points(0.1012, 0.1017, &crossings, 1.0).unwrap();
        let c4 = 1.0 / 261.625_565_300_598_6;
        assert_eq!(start, 0.1);
        assert!((end - start - c4).abs() < 1e-9);
    }

    #[test]
    fn test_start_schedules_attack() {
        let (mut voice, rx) = make_voice(60, false);
        assert_eq!(voice.state(), VoiceState::Created);
        voice.start(buffer(), 1.0).unwrap();
        let t0 = 1.0 + VoiceTiming::default().schedule_ahead;
        assert_eq!(voice.state(), VoiceState::Attacking);

        let command = rx.try_recv().unwrap();
        let RenderCommand::StartVoice(playback) = command else {
            panic!("expected StartVoice, got {command:?}");
        };
        assert_eq!(playback.playback_rate, 1.0);
        assert_eq!(playback.start_time, t0);
        assert_eq!(
            playback.gain.events(),
            &[
                AutomationEvent::SetValue {
                    time: t0,
                    value: 0.0
                },
                AutomationEvent::LinearRamp {
                    time: t0 + 0.02,
                    value: 1.0
                },
            ]
        );

        voice.advance(1.01);
        assert_eq!(voice.state(), VoiceState::Attacking);
        voice.advance(1.03);
        assert_eq!(voice.state(), VoiceState::Sustaining);
    }

    #[test]
    fn test_release_schedules_ramp_and_tail() {
        let (mut voice, rx) = make_voice(60, false);
        voice.start(buffer(), 0.0).unwrap();
        voice.advance(1.0);
        rx.try_iter().count();

        assert!(voice.release(1.0).unwrap());
        assert_eq!(voice.state(), VoiceState::Releasing);
        let stop = voice.stop_at().unwrap();
        assert!((stop - (1.0 + 0.2 + 0.1)).abs() < 1e-12);
        assert_eq!(voice.gain().value_at(1.0), 1.0);
        assert_eq!(voice.gain().value_at(1.2), 0.0);

        let ops: Vec<_> = rx.try_iter().collect();
        assert_eq!(ops.len(), 3);

        // A second release changes nothing.
        assert!(!voice.release(1.1).unwrap());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_loop_flag_sets_level() {
        let (mut voice, _rx) = make_voice(60, true);
        voice.settings.volume.loop_volume = 0.5;
        voice.start(buffer(), 0.0).unwrap();
        assert_eq!(voice.gain().final_value(), 0.5);

        voice.advance(1.0);
        voice.set_looping(false, 1.0).unwrap();
        assert!(!voice.is_looping());
        assert_eq!(voice.gain().final_value(), 1.0);
    }

    #[test]
    fn test_repeated_level_edits_keep_timeline_short() {
        let (mut voice, _rx) = make_voice(60, true);
        voice.start(buffer(), 0.0).unwrap();
        voice.advance(1.0);

        for i in 0..200 {
            let now = 1.0 + i as f64 * 0.01;
            let level = if i % 2 == 0 { 0.25 } else { 0.75 };
            voice
                .apply_update(
                    &SettingsUpdate {
                        volume: Some(VolumeUpdate {
                            sample_volume: Some(level),
                            ..Default::default()
                        }),
                        ..Default::default()
                    },
                    now,
                )
                .unwrap();
        }

        assert!(voice.gain().events().len() <= 3);
        assert_eq!(voice.gain().final_value(), 0.75);
    }

    #[test]
    fn test_apply_update_moves_loop_and_level() {
        let (mut voice, rx) = make_voice(60, true);
        voice.start(buffer(), 0.0).unwrap();
        voice.advance(1.0);
        rx.try_iter().count();

        voice
            .apply_update(
                &SettingsUpdate {
                    time: Some(TimeUpdate::loop_points(0.26, 0.74)),
                    volume: Some(VolumeUpdate {
                        sample_volume: Some(0.5),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                1.0,
            )
            .unwrap();

        assert_eq!(voice.loop_points(), (0.25, 0.75));
        assert_eq!(voice.settings().time.loop_start, 0.26);
        assert_eq!(voice.gain().final_value(), 0.5);
        assert!(rx.try_iter().any(|c| matches!(
            c,
            RenderCommand::Voice {
                op: VoiceOp::LoopPoints { start, end },
                ..
            } if start == 0.25 && end == 0.75
        )));
    }

    #[test]
    fn test_arena_generations() {
        let (tx, _rx) = command_channel();
        let mut arena = VoiceArena::new();
        let make = |id: VoiceId| {
            Voice::new(
                id,
                SampleId::from("a"),
                60,
                settings(1.0),
                Arc::new(ZeroCrossings::default()),
                1.0,
                false,
                VoiceTiming::default(),
                tx.clone(),
            )
        };

        let first = arena.insert_with(make);
        let second = arena.insert_with(make);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(first).unwrap().id(), first);

        assert!(arena.remove(first).is_some());
        assert!(arena.get(first).is_none());
        assert!(arena.remove(first).is_none());

        let third = arena.insert_with(make);
        assert_eq!(third.index(), first.index());
        assert_ne!(third, first);
        assert!(arena.get(first).is_none());
        assert_eq!(arena.ids_where(|_| true), vec![third, second]);
    }
}
