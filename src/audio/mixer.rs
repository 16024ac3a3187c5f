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

//! Render side of the sampler: applies scheduled instructions and mixes voices.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use super::buffer::DecodedBuffer;
use super::clock::AudioClock;
use super::command::{FinishReason, RenderCommand, RenderEvent, VoiceOp, VoicePlayback};
use super::filter::SampleBus;
use super::param::GainAutomation;
use crate::samples::{SampleId, VoiceId};

/// A voice as the renderer sees it.
struct PlayingVoice {
    id: VoiceId,
    sample: SampleId,
    buffer: Arc<DecodedBuffer>,
    playback_rate: f64,
    start_time: f64,
    end_point: f64,
    looping: bool,
    loop_start: f64,
    loop_end: f64,
    gain: GainAutomation,
    /// Current read position in buffer seconds.
    position: f64,
    stop_at: Option<f64>,
    finished: Option<FinishReason>,
}

impl PlayingVoice {
    fn new(playback: VoicePlayback) -> Self {
        Self {
            id: playback.voice,
            sample: playback.sample,
            buffer: playback.buffer,
            playback_rate: playback.playback_rate,
            start_time: playback.start_time,
            end_point: playback.end_point,
            looping: playback.looping,
            loop_start: playback.loop_start,
            loop_end: playback.loop_end,
            gain: playback.gain,
            position: playback.offset,
            stop_at: None,
            finished: None,
        }
    }

    fn apply(&mut self, op: VoiceOp) {
        match op {
            VoiceOp::Gain(op) => self.gain.apply(op),
            VoiceOp::SetLoop(looping) => self.looping = looping,
            VoiceOp::LoopPoints { start, end } => {
                self.loop_start = start;
                self.loop_end = end;
            }
            VoiceOp::StopAt(time) => self.stop_at = Some(time),
            VoiceOp::StopNow => self.finished = Some(FinishReason::Stopped),
        }
    }

    /// Renders one output frame at render time `time` into `out`.
    #[inline]
    fn render_frame(&mut self, time: f64, frame_period: f64, out: &mut [f32]) {
        if self.stop_at.is_some_and(|stop| time >= stop) {
            self.finished = Some(FinishReason::Stopped);
            return;
        }
        if time < self.start_time {
            return;
        }

        let gain = self.gain.value_at(time);
        let channels = self.buffer.channel_count();
        for (ch, sample) in out.iter_mut().enumerate() {
            *sample += self.buffer.sample_at(ch % channels, self.position) * gain;
        }

        self.position += self.playback_rate * frame_period;
        let loop_len = self.loop_end - self.loop_start;
        if self.looping && loop_len > 0.0 {
            if self.position >= self.loop_end {
                self.position = self.loop_start + (self.position - self.loop_end) % loop_len;
            }
        } else if self.position >= self.end_point || self.position >= self.buffer.duration() {
            self.finished = Some(FinishReason::Ended);
        }
    }
}

/// Mixes every playing voice through its sample bus into the master output.
pub struct Mixer {
    num_channels: u16,
    sample_rate: u32,
    clock: AudioClock,
    commands: Receiver<RenderCommand>,
    events: Sender<RenderEvent>,
    buses: HashMap<SampleId, SampleBus>,
    voices: Vec<PlayingVoice>,
    master_gain: f32,
    taps: Vec<Sender<Vec<f32>>>,
}

impl Mixer {
    /// Creates a mixer fed by `commands` that reports to `events`.
    pub fn new(
        num_channels: u16,
        clock: AudioClock,
        commands: Receiver<RenderCommand>,
        events: Sender<RenderEvent>,
        master_gain: f32,
    ) -> Self {
        Self {
            num_channels,
            sample_rate: clock.sample_rate(),
            clock,
            commands,
            events,
            buses: HashMap::new(),
            voices: Vec::new(),
            master_gain,
            taps: Vec::new(),
        }
    }

    /// Gets the number of output channels
    pub fn num_channels(&self) -> u16 {
        self.num_channels
    }

    /// Gets the sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Gets the render clock this mixer advances.
    pub fn clock(&self) -> &AudioClock {
        &self.clock
    }

    /// Returns the number of voices the renderer is currently holding.
    pub fn active_voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Returns the number of per-sample buses.
    pub fn bus_count(&self) -> usize {
        self.buses.len()
    }

    /// Applies every pending instruction from the control plane.
    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                RenderCommand::AddBus { sample, filters } => {
                    match self.buses.get_mut(&sample) {
                        Some(bus) => bus.set_filters(filters),
                        None => {
                            let bus = SampleBus::new(self.sample_rate, self.num_channels, filters);
                            self.buses.insert(sample, bus);
                        }
                    }
                }
                RenderCommand::RemoveBus { sample } => {
                    self.buses.remove(&sample);
                }
                RenderCommand::BusFilters { sample, filters } => {
                    if let Some(bus) = self.buses.get_mut(&sample) {
                        bus.set_filters(filters);
                    }
                }
                RenderCommand::StartVoice(playback) => {
                    self.voices.push(PlayingVoice::new(*playback));
                }
                RenderCommand::Voice { voice, op } => {
                    if let Some(v) = self.voices.iter_mut().find(|v| v.id == voice) {
                        v.apply(op);
                    }
                }
                RenderCommand::MasterGain(gain) => self.master_gain = gain,
                RenderCommand::AddTap(tap) => self.taps.push(tap),
            }
        }
    }

    /// Renders interleaved frames into `output`, whose length must be a multiple of the
    /// channel count. Advances the clock by the number of frames written.
    pub fn process_into_output(&mut self, output: &mut [f32]) {
        self.drain_commands();

        let num_channels = self.num_channels as usize;
        let frame_period = 1.0 / self.sample_rate as f64;
        let base_frame = self.clock.current_frame();
        let mut frames = 0u64;

        for (i, out_frame) in output.chunks_exact_mut(num_channels).enumerate() {
            let time = self.clock.frame_to_time(base_frame + i as u64);
            out_frame.fill(0.0);
            for bus in self.buses.values_mut() {
                bus.clear();
            }

            for voice in self.voices.iter_mut() {
                if voice.finished.is_some() {
                    continue;
                }
                match self.buses.get_mut(&voice.sample) {
                    Some(bus) => voice.render_frame(time, frame_period, bus.input_mut()),
                    None => voice.finished = Some(FinishReason::Stopped),
                }
            }

            for bus in self.buses.values_mut() {
                bus.process_into(out_frame);
            }
            for sample in out_frame.iter_mut() {
                *sample *= self.master_gain;
            }
            frames += 1;
        }

        self.clock.advance(frames);
        let now = self.clock.now();

        let events = &self.events;
        self.voices.retain_mut(|voice| match voice.finished {
            Some(reason) => {
                // The engine may already be gone during shutdown.
                let _ = events.send(RenderEvent::VoiceFinished {
                    voice: voice.id,
                    reason,
                });
                false
            }
            None => {
                voice.gain.prune_before(now);
                true
            }
        });

        if !self.taps.is_empty() {
            // A full tap drops the block; a disconnected one is removed.
            self.taps.retain(|tap| {
                !matches!(
                    tap.try_send(output.to_vec()),
                    Err(TrySendError::Disconnected(_))
                )
            });
        }
    }

    /// Processes multiple frames of audio mixing
    pub fn process_frames(&mut self, num_frames: usize) -> Vec<f32> {
        let mut frames = vec![0.0f32; num_frames * self.num_channels as usize];
        self.process_into_output(&mut frames);
        frames
    }
}

impl std::fmt::Debug for Mixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mixer")
            .field("num_channels", &self.num_channels)
            .field("sample_rate", &self.sample_rate)
            .field("buses", &self.buses.len())
            .field("voices", &self.voices.len())
            .finish()
    }
}
