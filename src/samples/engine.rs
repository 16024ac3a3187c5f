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

//! Main sampler engine that coordinates sample loading, note playback, and live
//! settings edits.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::error::SamplerError;
use super::loop_hold::LoopHoldState;
use super::settings::{
    check_region, EnvelopeSettings, EnvelopeUpdate, FilterSettings, FilterUpdate, PitchUpdate,
    SampleId, SampleRecord, SampleSettings, SettingsUpdate, TimeUpdate, VolumeSettings,
    VolumeUpdate,
};
use super::settings_store::SettingsStore;
use super::voice::{Voice, VoiceArena, VoiceId, VoiceInfo, VoiceTiming};
use super::zero_crossing::ZeroCrossings;
use crate::audio::command::{command_channel, RenderCommand, RenderEvent, RenderSender};
use crate::audio::{AudioClock, DecodedBuffer, Mixer};
use crate::config::{ConfigError, EngineConfig};

/// Output blocks buffered per tap before new ones are dropped.
const TAP_CAPACITY: usize = 256;

/// A loaded sample. Owns the decoded audio shared by all of its voices.
struct LoadedSample {
    name: String,
    buffer: Arc<DecodedBuffer>,
}

/// Control-plane state, guarded as one unit.
struct EngineState {
    samples: HashMap<SampleId, LoadedSample>,
    store: SettingsStore,
    voices: VoiceArena,
    loop_hold: LoopHoldState,
    /// Samples played by a note, in layering order.
    selected: Vec<SampleId>,
    /// Samples the settings editor is pointed at.
    settings_selection: Vec<SampleId>,
    master_volume: f32,
}

/// The sampler engine: loads samples, spawns and tracks voices, and fans settings
/// edits out to live voices.
///
/// Every method takes `&self`; the engine can be shared between threads behind an
/// `Arc`. Audio is rendered by the [`Mixer`] returned from [`SamplerEngine::new`].
pub struct SamplerEngine {
    state: Mutex<EngineState>,
    render: RenderSender,
    events: Receiver<RenderEvent>,
    clock: AudioClock,
    timing: VoiceTiming,
    panic_fade: f64,
    zero_crossing_threshold: f32,
    default_envelope: EnvelopeSettings,
    default_volume: VolumeSettings,
    default_filters: FilterSettings,
}

impl SamplerEngine {
    /// Creates an engine and the mixer that renders for it.
    pub fn new(config: &EngineConfig) -> Result<(Self, Mixer), ConfigError> {
        config.validate()?;

        let clock = AudioClock::new(config.sample_rate());
        let (render, commands) = command_channel();
        let (event_tx, events) = crossbeam_channel::unbounded();
        let master_volume = config.master_volume();
        let mixer = Mixer::new(
            config.channels(),
            clock.clone(),
            commands,
            event_tx,
            master_volume,
        );

        let timing = VoiceTiming {
            schedule_ahead: config.schedule_ahead()?.as_secs_f64(),
            release_tail: config.release_tail()?.as_secs_f64(),
            param_smoothing: config.param_smoothing()?.as_secs_f64(),
        };
        let defaults = config.defaults();

        info!(
            sample_rate = config.sample_rate(),
            channels = config.channels(),
            master_volume,
            "Sampler engine created"
        );

        let engine = Self {
            state: Mutex::new(EngineState {
                samples: HashMap::new(),
                store: SettingsStore::new(),
                voices: VoiceArena::new(),
                loop_hold: LoopHoldState::new(),
                selected: Vec::new(),
                settings_selection: Vec::new(),
                master_volume,
            }),
            render,
            events,
            clock,
            timing,
            panic_fade: config.panic_fade()?.as_secs_f64(),
            zero_crossing_threshold: config.zero_crossing_threshold(),
            default_envelope: defaults.envelope()?,
            default_volume: defaults.volume(),
            default_filters: defaults.filters(),
        };
        Ok((engine, mixer))
    }

    /// Returns the render clock the engine schedules against.
    pub fn clock(&self) -> &AudioClock {
        &self.clock
    }

    /// Drains finish notifications from the render side and frees finished voices.
    /// Returns the number of voices freed.
    pub fn poll_render_events(&self) -> usize {
        let mut state = self.state.lock();
        self.drain_events(&mut state)
    }

    fn drain_events(&self, state: &mut EngineState) -> usize {
        let mut freed = 0;
        while let Ok(event) = self.events.try_recv() {
            match event {
                RenderEvent::VoiceFinished { voice, reason } => {
                    if let Some(mut finished) = state.voices.remove(voice) {
                        finished.finish();
                        freed += 1;
                        debug!(
                            voice = %voice,
                            sample = %finished.sample_id(),
                            ?reason,
                            "Voice finished"
                        );
                    }
                }
            }
        }

        let now = self.clock.now();
        for voice in state.voices.iter_mut() {
            voice.advance(now);
        }
        freed
    }

    /// Loads a sample. Loading an id that is already loaded is a no-op and returns
    /// `Ok(false)`; the first load's settings and crossings stay in place.
    pub fn load_sample(
        &self,
        record: SampleRecord,
        buffer: DecodedBuffer,
    ) -> Result<bool, SamplerError> {
        let mut state = self.state.lock();
        self.drain_events(&mut state);

        if state.samples.contains_key(&record.id) {
            debug!(sample = %record.id, "Sample already loaded");
            return Ok(false);
        }

        let duration = buffer.duration();
        let crossings = ZeroCrossings::build(&buffer, self.zero_crossing_threshold);
        let mut settings = SampleSettings::with_defaults(
            duration,
            self.default_envelope,
            self.default_volume,
            self.default_filters,
        );
        settings.merge(&record.settings);
        settings.sanitize(duration);

        if let Err(e) = self.render.send(RenderCommand::AddBus {
            sample: record.id.clone(),
            filters: settings.filters,
        }) {
            error!(sample = %record.id, err = %e, "Failed to create sample bus");
            return Err(e);
        }

        info!(
            sample = %record.id,
            name = %record.name,
            duration,
            channels = buffer.channel_count(),
            crossings = crossings.len(),
            memory_kb = buffer.memory_size() / 1024,
            "Sample loaded"
        );

        state.store.set_sample_settings(record.id.clone(), settings);
        state.store.set_zero_crossings(record.id.clone(), crossings);
        state.samples.insert(
            record.id,
            LoadedSample {
                name: record.name,
                buffer: Arc::new(buffer),
            },
        );
        Ok(true)
    }

    /// Unloads a sample. Its live voices are stopped before the sample's bus is torn
    /// down, so no voice outlives the audio it plays.
    pub fn unload_sample(&self, id: &SampleId) -> Result<(), SamplerError> {
        let mut state = self.state.lock();
        self.drain_events(&mut state);

        let Some(sample) = state.samples.remove(id) else {
            warn!(sample = %id, "Cannot unload sample that is not loaded");
            return Err(SamplerError::NotLoaded(id.clone()));
        };

        let mut result = Ok(());
        let ids = state.voices.ids_where(|v| v.sample_id() == id);
        for voice_id in &ids {
            if let Some(mut voice) = state.voices.remove(*voice_id) {
                if let Err(e) = voice.force_stop() {
                    error!(voice = %voice_id, err = %e, "Failed to stop voice");
                    result = Err(e);
                }
            }
        }
        if let Err(e) = self
            .render
            .send(RenderCommand::RemoveBus { sample: id.clone() })
        {
            error!(sample = %id, err = %e, "Failed to remove sample bus");
            result = Err(e);
        }

        state.store.remove_sample_settings(id);
        state.store.remove_zero_crossings(id);
        state.selected.retain(|s| s != id);
        state.settings_selection.retain(|s| s != id);

        info!(
            sample = %id,
            name = %sample.name,
            stopped = ids.len(),
            "Sample unloaded"
        );
        result
    }

    /// Starts one voice per selected loaded sample, in selection order.
    pub fn play_note(&self, note: u8) -> Result<Vec<VoiceId>, SamplerError> {
        if note > 127 {
            return Err(SamplerError::InvalidNote(note));
        }

        let mut guard = self.state.lock();
        self.drain_events(&mut guard);
        let state = &mut *guard;

        let now = self.clock.now();
        let global_loop = state.loop_hold.is_looping();
        let mut started = Vec::with_capacity(state.selected.len());

        for id in &state.selected {
            let Some(sample) = state.samples.get(id) else {
                warn!(sample = %id, note, "Selected sample is not loaded");
                continue;
            };
            let settings = *state
                .store
                .get_sample_settings(id)
                .ok_or_else(|| SamplerError::NotLoaded(id.clone()))?;
            let crossings = state
                .store
                .get_zero_crossings(id)
                .ok_or_else(|| SamplerError::NotLoaded(id.clone()))?;
            let looping = global_loop || settings.loop_locked;
            let duration = sample.buffer.duration();

            let voice_id = state.voices.insert_with(|voice_id| {
                Voice::new(
                    voice_id,
                    id.clone(),
                    note,
                    settings,
                    crossings,
                    duration,
                    looping,
                    self.timing,
                    self.render.clone(),
                )
            });
            let result = match state.voices.get_mut(voice_id) {
                Some(voice) => voice.start(sample.buffer.clone(), now),
                None => Err(SamplerError::ResourceUnavailable("voice slot vanished")),
            };
            if let Err(e) = result {
                state.voices.remove(voice_id);
                error!(sample = %id, note, err = %e, "Failed to start voice");
                return Err(e);
            }
            started.push(voice_id);
        }

        if started.is_empty() {
            debug!(note, "No selected samples to play");
        } else {
            debug!(note, voices = started.len(), looping = global_loop, "Note played");
        }
        Ok(started)
    }

    /// Releases every live voice triggered by `note`. While hold is on the voices
    /// only remember the release. Returns the number of voices affected.
    pub fn release_note(&self, note: u8) -> usize {
        let mut state = self.state.lock();
        self.drain_events(&mut state);

        let now = self.clock.now();
        let holding = state.loop_hold.is_holding();
        let mut affected = 0;
        for voice in state.voices.iter_mut() {
            if !voice.matches_note(note) || !voice.state().is_sustaining() {
                continue;
            }
            if holding {
                voice.set_release_pending();
                affected += 1;
                continue;
            }
            match voice.release(now) {
                Ok(true) => affected += 1,
                Ok(false) => {}
                Err(e) => error!(voice = %voice.id(), err = %e, "Failed to release voice"),
            }
        }

        debug!(note, voices = affected, holding, "Note released");
        affected
    }

    /// Panic: fades out and drops every live voice and turns the global loop off.
    /// Hold is left as it is. Returns the number of voices stopped.
    pub fn stop_all_voices(&self) -> usize {
        let mut guard = self.state.lock();
        self.drain_events(&mut guard);
        let state = &mut *guard;

        let now = self.clock.now();
        let ids = state.voices.ids_where(|_| true);
        for id in &ids {
            let Some(mut voice) = state.voices.remove(*id) else {
                continue;
            };
            let result = if voice.state().is_sustaining() {
                voice.fade_out(now, self.panic_fade).map(|_| ())
            } else {
                voice.force_stop()
            };
            if let Err(e) = result {
                error!(voice = %id, err = %e, "Failed to stop voice");
            }
        }
        state.loop_hold.set_loop(false);

        if !ids.is_empty() {
            info!(stopped = ids.len(), "All voices stopped");
        }
        ids.len()
    }

    /// Sets the master output level, clamped to `[0, 1]`.
    pub fn set_master_volume(&self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        let mut state = self.state.lock();
        state.master_volume = volume;
        if let Err(e) = self.render.send(RenderCommand::MasterGain(volume)) {
            error!(err = %e, "Failed to set master volume");
        }
    }

    pub fn master_volume(&self) -> f32 {
        self.state.lock().master_volume
    }

    /// Flips the global loop flag and returns the new value.
    pub fn toggle_loop(&self) -> bool {
        let mut state = self.state.lock();
        self.drain_events(&mut state);
        let looping = !state.loop_hold.is_looping();
        self.apply_loop(&mut state, looping);
        looping
    }

    pub fn set_loop(&self, looping: bool) {
        let mut state = self.state.lock();
        self.drain_events(&mut state);
        self.apply_loop(&mut state, looping);
    }

    pub fn is_looping(&self) -> bool {
        self.state.lock().loop_hold.is_looping()
    }

    /// Turning loop on only affects voices started afterwards. Turning it off stops
    /// every unlocked voice from looping and releases it unless hold is on.
    fn apply_loop(&self, state: &mut EngineState, looping: bool) {
        let was_looping = state.loop_hold.is_looping();
        state.loop_hold.set_loop(looping);
        if !was_looping || looping {
            debug!(looping, "Loop set");
            return;
        }

        let now = self.clock.now();
        let holding = state.loop_hold.is_holding();
        let mut released = 0;
        for voice in state.voices.iter_mut() {
            let locked = state
                .store
                .get_sample_settings(voice.sample_id())
                .is_some_and(|s| s.loop_locked);
            if locked {
                continue;
            }
            let result = voice.set_looping(false, now).and_then(|()| {
                if holding {
                    Ok(false)
                } else {
                    voice.release(now)
                }
            });
            match result {
                Ok(true) => released += 1,
                Ok(false) => {}
                Err(e) => error!(voice = %voice.id(), err = %e, "Failed to end loop"),
            }
        }
        info!(released, holding, "Loop turned off");
    }

    /// Flips the hold flag and returns the new value.
    pub fn toggle_hold(&self) -> bool {
        let mut state = self.state.lock();
        self.drain_events(&mut state);
        let hold = !state.loop_hold.is_holding();
        self.apply_hold(&mut state, hold);
        hold
    }

    pub fn set_hold(&self, hold: bool) {
        let mut state = self.state.lock();
        self.drain_events(&mut state);
        self.apply_hold(&mut state, hold);
    }

    pub fn is_holding(&self) -> bool {
        self.state.lock().loop_hold.is_holding()
    }

    /// Releasing hold starts the release of every sustaining voice.
    fn apply_hold(&self, state: &mut EngineState, hold: bool) {
        let was_holding = state.loop_hold.is_holding();
        state.loop_hold.set_hold(hold);
        if !was_holding || hold {
            debug!(hold, "Hold set");
            return;
        }

        let now = self.clock.now();
        let mut released = 0;
        for voice in state.voices.iter_mut() {
            match voice.release(now) {
                Ok(true) => released += 1,
                Ok(false) => {}
                Err(e) => error!(voice = %voice.id(), err = %e, "Failed to release voice"),
            }
        }
        info!(released, "Hold released");
    }

    /// Applies a partial settings edit to a sample.
    ///
    /// The sample must be the only one in the settings selection. Play points snap to
    /// the nearest zero crossing; an inverted or out-of-range region is dropped from
    /// the edit and the previous one kept. Loop and volume changes are pushed to the
    /// sample's live voices and filter changes to its bus.
    pub fn update_sample_settings(
        &self,
        id: &SampleId,
        update: SettingsUpdate,
    ) -> Result<SampleSettings, SamplerError> {
        let mut guard = self.state.lock();
        self.drain_events(&mut guard);
        let state = &mut *guard;

        let Some(sample) = state.samples.get(id) else {
            warn!(sample = %id, "Cannot update settings of a sample that is not loaded");
            return Err(SamplerError::NotLoaded(id.clone()));
        };
        if state.settings_selection.as_slice() != std::slice::from_ref(id) {
            warn!(
                sample = %id,
                selected = ?state.settings_selection,
                "Settings edit does not match the settings selection"
            );
            return Err(SamplerError::InvalidSelection {
                target: id.clone(),
                selected: state.settings_selection.clone(),
            });
        }

        let current = *state
            .store
            .get_sample_settings(id)
            .ok_or_else(|| SamplerError::NotLoaded(id.clone()))?;
        let crossings = state
            .store
            .get_zero_crossings(id)
            .ok_or_else(|| SamplerError::NotLoaded(id.clone()))?;
        let update = normalize_update(
            id,
            update,
            &current,
            &crossings,
            sample.buffer.duration(),
        );

        let settings = *state.store.update_sample_settings(id, &update)?;
        let now = self.clock.now();

        if update.filters.is_some() {
            if let Err(e) = self.render.send(RenderCommand::BusFilters {
                sample: id.clone(),
                filters: settings.filters,
            }) {
                error!(sample = %id, err = %e, "Failed to update sample filters");
            }
        }

        if update.touches_loop_points() || update.touches_volume() {
            for voice in state.voices.iter_mut() {
                if voice.sample_id() != id {
                    continue;
                }
                if let Err(e) = voice.apply_update(&update, now) {
                    error!(voice = %voice.id(), err = %e, "Failed to update voice");
                }
            }
        }

        if settings.loop_locked != current.loop_locked {
            let looping = settings.loop_locked || state.loop_hold.is_looping();
            let holding = state.loop_hold.is_holding();
            for voice in state.voices.iter_mut() {
                if voice.sample_id() != id {
                    continue;
                }
                let result = voice.set_looping(looping, now).and_then(|()| {
                    if looping || holding {
                        Ok(false)
                    } else {
                        voice.release(now)
                    }
                });
                if let Err(e) = result {
                    error!(voice = %voice.id(), err = %e, "Failed to apply loop lock");
                }
            }
        }

        debug!(sample = %id, ?update, "Sample settings updated");
        Ok(settings)
    }

    pub fn update_time_settings(
        &self,
        id: &SampleId,
        time: TimeUpdate,
    ) -> Result<SampleSettings, SamplerError> {
        self.update_sample_settings(id, SettingsUpdate::time(time))
    }

    pub fn update_envelope_settings(
        &self,
        id: &SampleId,
        envelope: EnvelopeUpdate,
    ) -> Result<SampleSettings, SamplerError> {
        self.update_sample_settings(id, SettingsUpdate::envelope(envelope))
    }

    pub fn update_volume_settings(
        &self,
        id: &SampleId,
        volume: VolumeUpdate,
    ) -> Result<SampleSettings, SamplerError> {
        self.update_sample_settings(id, SettingsUpdate::volume(volume))
    }

    pub fn update_filter_settings(
        &self,
        id: &SampleId,
        filters: FilterUpdate,
    ) -> Result<SampleSettings, SamplerError> {
        self.update_sample_settings(id, SettingsUpdate::filters(filters))
    }

    pub fn update_pitch_settings(
        &self,
        id: &SampleId,
        pitch: PitchUpdate,
    ) -> Result<SampleSettings, SamplerError> {
        self.update_sample_settings(id, SettingsUpdate::pitch(pitch))
    }

    /// Locks or unlocks looping for one sample, independent of the global flag.
    pub fn set_loop_locked(
        &self,
        id: &SampleId,
        locked: bool,
    ) -> Result<SampleSettings, SamplerError> {
        self.update_sample_settings(id, SettingsUpdate::loop_locked(locked))
    }

    /// Returns a sample's settings, or `None` (with a warning) if it is not loaded.
    pub fn get_sample_settings(&self, id: &SampleId) -> Option<SampleSettings> {
        let state = self.state.lock();
        let settings = state.store.get_sample_settings(id).copied();
        if settings.is_none() {
            warn!(sample = %id, "No settings for sample that is not loaded");
        }
        settings
    }

    pub fn zero_crossings(&self, id: &SampleId) -> Option<Arc<ZeroCrossings>> {
        self.state.lock().store.get_zero_crossings(id)
    }

    /// Loaded sample ids, sorted.
    pub fn loaded_sample_ids(&self) -> Vec<SampleId> {
        let state = self.state.lock();
        let mut ids: Vec<SampleId> = state.samples.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_loaded(&self, id: &SampleId) -> bool {
        self.state.lock().samples.contains_key(id)
    }

    /// Returns the number of live voices.
    pub fn active_voice_count(&self) -> usize {
        let mut state = self.state.lock();
        self.drain_events(&mut state);
        state.voices.len()
    }

    /// Snapshots of every live voice, in slot order.
    pub fn voices(&self) -> Vec<VoiceInfo> {
        let mut state = self.state.lock();
        self.drain_events(&mut state);
        state.voices.iter().map(Voice::info).collect()
    }

    pub fn voice(&self, id: VoiceId) -> Option<VoiceInfo> {
        let mut state = self.state.lock();
        self.drain_events(&mut state);
        state.voices.get(id).map(Voice::info)
    }

    /// Sets the samples a note plays, in layering order.
    pub fn set_selected_sample_ids(&self, ids: Vec<SampleId>) {
        debug!(selected = ?ids, "Playback selection changed");
        self.state.lock().selected = ids;
    }

    pub fn selected_sample_ids(&self) -> Vec<SampleId> {
        self.state.lock().selected.clone()
    }

    /// Sets the samples the settings editor targets. Settings edits are accepted only
    /// while exactly one sample is selected here.
    pub fn set_settings_selection(&self, ids: Vec<SampleId>) {
        debug!(selected = ?ids, "Settings selection changed");
        self.state.lock().settings_selection = ids;
    }

    pub fn settings_selection(&self) -> Vec<SampleId> {
        self.state.lock().settings_selection.clone()
    }

    /// Returns a receiver for copies of every rendered master block. Blocks are
    /// dropped while the receiver is full.
    pub fn tap_output(&self) -> Result<Receiver<Vec<f32>>, SamplerError> {
        let (tx, rx) = crossbeam_channel::bounded(TAP_CAPACITY);
        self.render.send(RenderCommand::AddTap(tx))?;
        Ok(rx)
    }

    /// Stops every voice at once, unloads every sample, and clears loop and hold.
    pub fn teardown(&self) {
        let mut guard = self.state.lock();
        self.drain_events(&mut guard);
        let state = &mut *guard;

        for id in state.voices.ids_where(|_| true) {
            if let Some(mut voice) = state.voices.remove(id) {
                if let Err(e) = voice.force_stop() {
                    debug!(voice = %id, err = %e, "Voice stop not delivered");
                }
            }
        }
        for (id, _) in state.samples.drain() {
            if let Err(e) = self.render.send(RenderCommand::RemoveBus { sample: id }) {
                debug!(err = %e, "Bus removal not delivered");
            }
        }
        state.store.clear();
        state.loop_hold.reset();
        state.selected.clear();
        state.settings_selection.clear();
        info!("Sampler engine torn down");
    }
}

/// Makes an edit safe to apply: snaps play points to zero crossings, drops
/// degenerate regions and filter bands, and clamps levels and times into range.
fn normalize_update(
    id: &SampleId,
    mut update: SettingsUpdate,
    current: &SampleSettings,
    crossings: &ZeroCrossings,
    duration: f64,
) -> SettingsUpdate {
    if let Some(mut time) = update.time {
        time.start_point = time.start_point.map(|t| crossings.snap(t));
        time.end_point = time.end_point.map(|t| crossings.snap(t));

        let mut merged = current.time;
        if let Some(start) = time.start_point {
            merged.start_point = start;
        }
        if let Some(end) = time.end_point {
            merged.end_point = end;
        }
        if let Some(start) = time.loop_start {
            merged.loop_start = start;
        }
        if let Some(end) = time.loop_end {
            merged.loop_end = end;
        }

        if let Err(e) = check_region(merged.start_point, merged.end_point, duration) {
            debug!(sample = %id, err = %e, "Dropping play region edit");
            time.start_point = None;
            time.end_point = None;
        }
        if let Err(e) = check_region(merged.loop_start, merged.loop_end, duration) {
            debug!(sample = %id, err = %e, "Dropping loop region edit");
            time.loop_start = None;
            time.loop_end = None;
        }
        update.time = (time != TimeUpdate::default()).then_some(time);
    }

    if let Some(mut envelope) = update.envelope {
        if has_non_finite(&[envelope.attack_time, envelope.release_time]) {
            debug!(sample = %id, ?envelope, "Dropping non-finite envelope times");
        }
        envelope.attack_time = finite(envelope.attack_time).map(|t| t.max(0.0));
        envelope.release_time = finite(envelope.release_time).map(|t| t.max(0.0));
        update.envelope = (envelope != EnvelopeUpdate::default()).then_some(envelope);
    }

    if let Some(mut volume) = update.volume {
        let levels = [volume.sample_volume, volume.loop_volume].map(|v| v.map(f64::from));
        if has_non_finite(&levels) {
            debug!(sample = %id, ?volume, "Dropping non-finite volume");
        }
        volume.sample_volume = volume
            .sample_volume
            .filter(|v| v.is_finite())
            .map(|v| v.clamp(0.0, 1.0));
        volume.loop_volume = volume
            .loop_volume
            .filter(|v| v.is_finite())
            .map(|v| v.clamp(0.0, 1.0));
        update.volume = (volume != VolumeUpdate::default()).then_some(volume);
    }

    if let Some(mut pitch) = update.pitch {
        if has_non_finite(&[pitch.detune_cents]) {
            debug!(sample = %id, ?pitch, "Dropping non-finite detune");
        }
        pitch.detune_cents = finite(pitch.detune_cents);
        update.pitch = (pitch != PitchUpdate::default()).then_some(pitch);
    }

    if let Some(filters) = update.filters {
        let low = filters.low_cutoff.unwrap_or(current.filters.low_cutoff);
        let high = filters.high_cutoff.unwrap_or(current.filters.high_cutoff);
        if !(low > 0.0 && low < high && high.is_finite()) {
            debug!(sample = %id, low, high, "Dropping inverted filter band");
            update.filters = None;
        }
    }

    update
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn has_non_finite(values: &[Option<f64>]) -> bool {
    values.iter().flatten().any(|v| !v.is_finite())
}

impl std::fmt::Debug for SamplerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SamplerEngine")
            .field("samples", &state.samples.len())
            .field("active_voices", &state.voices.len())
            .field("loop_hold", &state.loop_hold)
            .field("master_volume", &state.master_volume)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> (SamplerEngine, Mixer) {
        SamplerEngine::new(&EngineConfig::new().with_sample_rate(1000).with_channels(1)).unwrap()
    }

    fn buffer(seconds: f64) -> DecodedBuffer {
        DecodedBuffer::mono(vec![0.25; (seconds * 1000.0) as usize], 1000).unwrap()
    }

    #[test]
    fn test_engine_creation() {
        let (engine, mixer) = engine();
        assert_eq!(engine.active_voice_count(), 0);
        assert!(engine.loaded_sample_ids().is_empty());
        assert_eq!(engine.master_volume(), 1.0);
        assert_eq!(mixer.sample_rate(), 1000);
        assert_eq!(mixer.num_channels(), 1);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = EngineConfig::new().with_channels(0);
        assert!(SamplerEngine::new(&config).is_err());
    }

    #[test]
    fn test_invalid_note() {
        let (engine, _mixer) = engine();
        assert_eq!(engine.play_note(128), Err(SamplerError::InvalidNote(128)));
    }

    #[test]
    fn test_unknown_sample_reads_and_writes() {
        let (engine, _mixer) = engine();
        let id = SampleId::from("ghost");
        assert!(engine.get_sample_settings(&id).is_none());
        assert!(engine.zero_crossings(&id).is_none());
        assert_eq!(
            engine.set_loop_locked(&id, true),
            Err(SamplerError::NotLoaded(id.clone()))
        );
        assert_eq!(
            engine.unload_sample(&id),
            Err(SamplerError::NotLoaded(id.clone()))
        );
    }

    #[test]
    fn test_record_settings_are_merged_over_defaults() {
        let (engine, _mixer) = engine();
        let record = SampleRecord::new("a").with_settings(SettingsUpdate::time(
            TimeUpdate::play_points(0.25, 0.75),
        ));
        assert!(engine.load_sample(record, buffer(1.0)).unwrap());

        let settings = engine.get_sample_settings(&SampleId::from("a")).unwrap();
        assert_eq!(settings.time.start_point, 0.25);
        assert_eq!(settings.time.end_point, 0.75);
        assert_eq!(settings.time.loop_end, 1.0);
        assert_eq!(settings.filters, FilterSettings::default());
    }

    #[test]
    fn test_master_volume_is_clamped() {
        let (engine, _mixer) = engine();
        engine.set_master_volume(1.5);
        assert_eq!(engine.master_volume(), 1.0);
        engine.set_master_volume(0.25);
        assert_eq!(engine.master_volume(), 0.25);
    }

    #[test]
    fn test_render_side_gone() {
        let (engine, mixer) = engine();
        drop(mixer);
        assert_eq!(
            engine.load_sample(SampleRecord::new("a"), buffer(1.0)),
            Err(SamplerError::ResourceUnavailable("render side disconnected"))
        );
        assert!(!engine.is_loaded(&SampleId::from("a")));
        assert!(engine.tap_output().is_err());
    }
}
