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

/// The global loop and hold flags.
///
/// Two independent switches. What they mean for voices lives in the engine; this
/// type only records them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopHoldState {
    global_loop: bool,
    hold: bool,
}

impl LoopHoldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips the loop flag and returns the new value.
    pub fn toggle_loop(&mut self) -> bool {
        self.global_loop = !self.global_loop;
        self.global_loop
    }

    pub fn set_loop(&mut self, looping: bool) {
        self.global_loop = looping;
    }

    pub fn is_looping(&self) -> bool {
        self.global_loop
    }

    /// Flips the hold flag and returns the new value.
    pub fn toggle_hold(&mut self) -> bool {
        self.hold = !self.hold;
        self.hold
    }

    pub fn set_hold(&mut self, hold: bool) {
        self.hold = hold;
    }

    pub fn is_holding(&self) -> bool {
        self.hold
    }

    /// Clears both flags.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
