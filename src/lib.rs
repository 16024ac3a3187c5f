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

//! A polyphonic, loop-aware sample playback engine.
//!
//! [`samples::SamplerEngine`] is the control plane: it loads samples, turns notes
//! into scheduled voices and pushes settings edits to them. The [`audio::Mixer`]
//! it hands back renders those voices, either into a cpal output stream or
//! directly when driven by hand.

pub mod audio;
pub mod config;
pub mod midi;
pub mod samples;

#[cfg(test)]
mod testutil;
