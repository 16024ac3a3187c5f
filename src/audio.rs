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

//! The render side: decoded buffers, the render clock, gain automation, per-sample
//! filter buses, and the mixer that plays voices through them.

pub mod buffer;
pub mod clock;
pub mod command;
pub mod cpal;
pub mod filter;
pub mod mixer;
pub mod param;
pub mod wav;

pub use buffer::{BufferError, DecodedBuffer};
pub use clock::AudioClock;
pub use command::{FinishReason, RenderEvent};
pub use mixer::Mixer;
pub use param::{AutomationEvent, GainAutomation, GainOp};
