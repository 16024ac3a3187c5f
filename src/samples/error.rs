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
use super::settings::SampleId;

/// Typed errors for engine operations so callers can tell an ordering bug from a
/// rejected edit without string matching.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SamplerError {
    #[error("sample {0} is not loaded")]
    NotLoaded(SampleId),

    #[error("settings edit for {target} rejected, settings selection is {selected:?}")]
    InvalidSelection {
        target: SampleId,
        selected: Vec<SampleId>,
    },

    #[error("degenerate region {start}..{end}")]
    DegenerateRegion { start: f64, end: f64 },

    #[error("resource unavailable: {0}")]
    ResourceUnavailable(&'static str),

    #[error("MIDI note {0} is out of range")]
    InvalidNote(u8),
}
