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

//! Messages between the control plane and the render side.
//!
//! Control → render is fire-and-forget: once sent, an instruction can only be
//! superseded by a later one. Render → control carries finish notifications that the
//! engine drains on its own schedule.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use super::buffer::DecodedBuffer;
use super::param::{GainAutomation, GainOp};
use crate::samples::{FilterSettings, SampleId, SamplerError, VoiceId};

/// Everything the renderer needs to play one voice.
#[derive(Debug, Clone)]
pub struct VoicePlayback {
    pub voice: VoiceId,
    pub sample: SampleId,
    /// Shared with every other voice of the sample.
    pub buffer: Arc<DecodedBuffer>,
    pub playback_rate: f64,
    /// Render time at which playback begins.
    pub start_time: f64,
    /// Buffer offset (seconds) playback begins from.
    pub offset: f64,
    /// Buffer position (seconds) at which non-looping playback ends.
    pub end_point: f64,
    pub looping: bool,
    pub loop_start: f64,
    pub loop_end: f64,
    pub gain: GainAutomation,
}

/// An instruction for a single playing voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VoiceOp {
    Gain(GainOp),
    SetLoop(bool),
    LoopPoints { start: f64, end: f64 },
    /// Halt the source at a render time.
    StopAt(f64),
    /// Halt the source at the start of the next block.
    StopNow,
}

/// An instruction for the render side.
#[derive(Debug, Clone)]
pub enum RenderCommand {
    AddBus {
        sample: SampleId,
        filters: FilterSettings,
    },
    RemoveBus {
        sample: SampleId,
    },
    BusFilters {
        sample: SampleId,
        filters: FilterSettings,
    },
    StartVoice(Box<VoicePlayback>),
    Voice {
        voice: VoiceId,
        op: VoiceOp,
    },
    MasterGain(f32),
    /// Receives a copy of every rendered master block.
    AddTap(Sender<Vec<f32>>),
}

/// Why a voice left the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// Non-looping playback ran past its end point.
    Ended,
    /// A scheduled or immediate stop fired.
    Stopped,
}

/// A notification from the render side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderEvent {
    VoiceFinished { voice: VoiceId, reason: FinishReason },
}

/// The control plane's handle for sending render instructions.
#[derive(Clone, Debug)]
pub struct RenderSender {
    tx: Sender<RenderCommand>,
}

impl RenderSender {
    pub fn new(tx: Sender<RenderCommand>) -> Self {
        Self { tx }
    }

    /// Sends an instruction. Fails only when the render side has gone away.
    pub fn send(&self, command: RenderCommand) -> Result<(), SamplerError> {
        self.tx
            .send(command)
            .map_err(|_| SamplerError::ResourceUnavailable("render side disconnected"))
    }

    /// Sends a voice instruction.
    pub fn voice(&self, voice: VoiceId, op: VoiceOp) -> Result<(), SamplerError> {
        self.send(RenderCommand::Voice { voice, op })
    }
}

/// Creates the command channel between a control plane and a renderer.
pub fn command_channel() -> (RenderSender, Receiver<RenderCommand>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (RenderSender::new(tx), rx)
}
