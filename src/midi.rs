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

//! Routes raw MIDI input to a sampler engine.

use std::sync::Arc;

use midly::live::LiveEvent;
use midly::MidiMessage;
use tracing::{debug, warn};

use crate::samples::{SamplerError, SamplerEngine, VoiceId};

/// Sustain pedal.
const CC_SUSTAIN: u8 = 64;
/// All Sound Off.
const CC_ALL_SOUND_OFF: u8 = 120;
/// All Notes Off.
const CC_ALL_NOTES_OFF: u8 = 123;

/// What a MIDI message means to the sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiAction {
    NoteOn(u8),
    NoteOff(u8),
    Hold(bool),
    Panic,
}

/// Result of routing one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    Started(Vec<VoiceId>),
    Released(usize),
    Hold(bool),
    Stopped(usize),
    Ignored,
}

/// Turns raw MIDI bytes into engine calls.
///
/// Note on plays a note and note off (or note on with velocity zero) releases it.
/// CC64 drives hold, and CC120/CC123 stop every voice.
pub struct MidiRouter {
    engine: Arc<SamplerEngine>,
    /// Only messages on this channel are routed; `None` listens to all of them.
    channel: Option<u8>,
}

impl MidiRouter {
    pub fn new(engine: Arc<SamplerEngine>) -> Self {
        Self {
            engine,
            channel: None,
        }
    }

    /// Listens to a single zero-based channel.
    pub fn with_channel(mut self, channel: u8) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn engine(&self) -> &Arc<SamplerEngine> {
        &self.engine
    }

    /// Interprets a message without acting on it. Unparseable bytes, other
    /// channels and unrelated messages give `None`.
    pub fn translate(&self, raw: &[u8]) -> Option<MidiAction> {
        let event = match LiveEvent::parse(raw) {
            Ok(event) => event,
            Err(e) => {
                warn!(err = %e, bytes = ?raw, "Unparseable MIDI message");
                return None;
            }
        };
        let LiveEvent::Midi { channel, message } = event else {
            return None;
        };
        if self.channel.is_some_and(|c| c != channel.as_int()) {
            return None;
        }

        match message {
            MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                Some(MidiAction::NoteOn(key.as_int()))
            }
            MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                Some(MidiAction::NoteOff(key.as_int()))
            }
            MidiMessage::Controller { controller, value } => match controller.as_int() {
                CC_SUSTAIN => Some(MidiAction::Hold(value.as_int() >= 64)),
                CC_ALL_SOUND_OFF | CC_ALL_NOTES_OFF => Some(MidiAction::Panic),
                _ => None,
            },
            _ => None,
        }
    }

    /// Interprets a message and applies it to the engine.
    pub fn handle(&self, raw: &[u8]) -> Result<Routed, SamplerError> {
        let Some(action) = self.translate(raw) else {
            return Ok(Routed::Ignored);
        };
        debug!(?action, "MIDI action");

        Ok(match action {
            MidiAction::NoteOn(note) => Routed::Started(self.engine.play_note(note)?),
            MidiAction::NoteOff(note) => Routed::Released(self.engine.release_note(note)),
            MidiAction::Hold(hold) => {
                if self.engine.is_holding() != hold {
                    self.engine.set_hold(hold);
                }
                Routed::Hold(hold)
            }
            MidiAction::Panic => Routed::Stopped(self.engine.stop_all_voices()),
        })
    }
}

impl std::fmt::Debug for MidiRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiRouter")
            .field("channel", &self.channel)
            .finish()
    }
}
