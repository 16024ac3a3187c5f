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

//! Keyboard-driven sample playback.
//!
//! This module provides:
//! - Zero-crossing indexing and note-period tables for click-free loops
//! - Per-sample settings and the global loop/hold state
//! - Voices with scheduled attack/release envelopes
//! - The engine tying them to the render side

mod engine;
mod error;
mod loop_hold;
pub mod note_table;
mod settings;
mod settings_store;
mod voice;
mod zero_crossing;


pub use engine::SamplerEngine;
pub use error::SamplerError;
pub use loop_hold::LoopHoldState;
pub use settings::{
    EnvelopeSettings, EnvelopeUpdate, FilterSettings, FilterUpdate, PitchSettings, PitchUpdate,
    SampleId, SampleRecord, SampleSettings, SettingsUpdate, TimeSettings, TimeUpdate,
    VolumeSettings, VolumeUpdate,
};
pub use settings_store::SettingsStore;
pub use voice::{
    calculate_loop_points, playback_rate, Voice, VoiceArena, VoiceId, VoiceInfo, VoiceState,
    VoiceTiming, REFERENCE_NOTE,
};
pub use zero_crossing::{snap_to_nearest, ZeroCrossings, DEFAULT_ZERO_THRESHOLD};
