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

//! Period lengths of equal-tempered notes (A4 = 440 Hz), used to quantize very
//! short loops to in-tune audio-rate lengths.

use std::fmt;
use std::str::FromStr;

const A4_FREQUENCY: f64 = 440.0;
const A4_MIDI: i32 = 69;

/// Lowest tabulated octave.
pub const MIN_OCTAVE: i32 = 0;
/// Highest tabulated octave.
pub const MAX_OCTAVE: i32 = 8;

/// Notes of the chromatic scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NoteName {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl NoteName {
    pub const ALL: [NoteName; 12] = [
        NoteName::C,
        NoteName::CSharp,
        NoteName::D,
        NoteName::DSharp,
        NoteName::E,
        NoteName::F,
        NoteName::FSharp,
        NoteName::G,
        NoteName::GSharp,
        NoteName::A,
        NoteName::ASharp,
        NoteName::B,
    ];

    /// Semitones above C.
    pub fn semitone(self) -> i32 {
        self as i32
    }

    /// MIDI note number of this note in `octave` (C4 = 60).
    pub fn midi_note(self, octave: i32) -> i32 {
        (octave + 1) * 12 + self.semitone()
    }

    /// Equal-tempered frequency in Hz.
    pub fn frequency(self, octave: i32) -> f64 {
        A4_FREQUENCY * 2f64.powf((self.midi_note(octave) - A4_MIDI) as f64 / 12.0)
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NoteName::C => "C",
            NoteName::CSharp => "C#",
            NoteName::D => "D",
            NoteName::DSharp => "D#",
            NoteName::E => "E",
            NoteName::F => "F",
            NoteName::FSharp => "F#",
            NoteName::G => "G",
            NoteName::GSharp => "G#",
            NoteName::A => "A",
            NoteName::ASharp => "A#",
            NoteName::B => "B",
        };
        f.write_str(name)
    }
}

impl FromStr for NoteName {
    type Err = String;

    /// Parses sharps ("C#") and flats ("Db"); enharmonic spellings map to one note.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        let base = match chars.next().map(|c| c.to_ascii_uppercase()) {
            Some('C') => 0,
            Some('D') => 2,
            Some('E') => 4,
            Some('F') => 5,
            Some('G') => 7,
            Some('A') => 9,
            Some('B') => 11,
            _ => return Err(format!("invalid note name: {s:?}")),
        };
        let offset = match chars.as_str() {
            "" => 0,
            "#" | "♯" => 1,
            "b" | "♭" => -1,
            _ => return Err(format!("invalid note name: {s:?}")),
        };
        let index = (base + offset + 12) % 12;
        Ok(NoteName::ALL[index as usize])
    }
}

/// Unit for durations going in and out of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurationUnit {
    #[default]
    Seconds,
    Milliseconds,
}

impl DurationUnit {
    fn from_seconds(self, seconds: f64) -> f64 {
        match self {
            DurationUnit::Seconds => seconds,
            DurationUnit::Milliseconds => seconds * 1000.0,
        }
    }
}

/// Period of `note` in `octave`.
pub fn duration_of(note: NoteName, octave: i32, unit: DurationUnit) -> f64 {
    unit.from_seconds(1.0 / note.frequency(octave))
}

/// Inclusive pitch range for quantization, lowest pitch (longest period) first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteRange {
    pub low_note: NoteName,
    pub low_octave: i32,
    pub high_note: NoteName,
    pub high_octave: i32,
}

impl NoteRange {
    pub fn new(low_note: NoteName, low_octave: i32, high_note: NoteName, high_octave: i32) -> Self {
        Self {
            low_note,
            low_octave,
            high_note,
            high_octave,
        }
    }

    fn contains(&self, note: NoteName, octave: i32) -> bool {
        let midi = note.midi_note(octave);
        midi >= self.low_note.midi_note(self.low_octave)
            && midi <= self.high_note.midi_note(self.high_octave)
    }

    /// Period of the lowest note, the longest duration in the range.
    pub fn longest(&self, unit: DurationUnit) -> f64 {
        duration_of(self.low_note, self.low_octave, unit)
    }

    /// Period of the highest note, the shortest duration in the range.
    pub fn shortest(&self, unit: DurationUnit) -> f64 {
        duration_of(self.high_note, self.high_octave, unit)
    }

    /// Every `(note, octave)` of `scale` inside the range, ascending by octave and
    /// then in scale order.
    pub fn candidates<'a>(
        &'a self,
        scale: &'a [NoteName],
    ) -> impl Iterator<Item = (NoteName, i32)> + 'a {
        let octaves = self.low_octave.max(MIN_OCTAVE)..=self.high_octave.min(MAX_OCTAVE);
        octaves.flat_map(move |octave| {
            scale
                .iter()
                .copied()
                .filter(move |&note| self.contains(note, octave))
                .map(move |note| (note, octave))
        })
    }
}

/// Scale used for loop-length quantization.
pub const LOOP_SCALE: [NoteName; 1] = [NoteName::C];

/// Range used for loop-length quantization, C2 through C5.
pub const LOOP_RANGE: NoteRange = NoteRange {
    low_note: NoteName::C,
    low_octave: 2,
    high_note: NoteName::C,
    high_octave: 5,
};

/// Loops shorter than this (seconds) are quantized to a note period.
pub const QUANTIZE_BELOW: f64 = 0.015;

/// Shortest loop (seconds) the engine will recompute, the period of C5.
pub const MIN_LOOP_LENGTH: f64 = 1.0 / 523.251_130_601_197_3;

/// Quantizes `length` to the nearest period of a `scale` note within `range`.
///
/// Lengths at or above the longest period come back unchanged, lengths at or below
/// the shortest are clamped to it. In between, the first closest candidate wins.
pub fn snap_to_nearest_note_duration(
    length: f64,
    scale: &[NoteName],
    range: NoteRange,
    unit: DurationUnit,
) -> f64 {
    let longest = range.longest(unit);
    let shortest = range.shortest(unit);
    if length >= longest {
        return length;
    }
    if length <= shortest {
        return shortest;
    }

    let mut best = length;
    let mut best_diff = f64::INFINITY;
    for (note, octave) in range.candidates(scale) {
        let candidate = duration_of(note, octave, unit);
        let diff = (candidate - length).abs();
        if diff < best_diff {
            best = candidate;
            best_diff = diff;
        }
    }
    best
}

/// Quantizes a loop length in seconds with the loop scale and range.
pub fn quantize_loop_length(length: f64) -> f64 {
    snap_to_nearest_note_duration(length, &LOOP_SCALE, LOOP_RANGE, DurationUnit::Seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_reference_periods() {
        assert!((duration_of(NoteName::A, 4, DurationUnit::Seconds) - 1.0 / 440.0).abs() < 1e-12);
        assert!((duration_of(NoteName::A, 4, DurationUnit::Milliseconds) - 2.272_727).abs() < 1e-5);
        assert!((duration_of(NoteName::C, 5, DurationUnit::Seconds) - MIN_LOOP_LENGTH).abs() < 1e-12);
        assert!((duration_of(NoteName::C, 2, DurationUnit::Milliseconds) - 15.289).abs() < 1e-3);
    }

    #[test]
    fn test_parse_note_names() {
        assert_eq!("C".parse::<NoteName>().unwrap(), NoteName::C);
        assert_eq!("c#".parse::<NoteName>().unwrap(), NoteName::CSharp);
        assert_eq!("Db".parse::<NoteName>().unwrap(), NoteName::CSharp);
        assert_eq!("Cb".parse::<NoteName>().unwrap(), NoteName::B);
        assert_eq!("B#".parse::<NoteName>().unwrap(), NoteName::C);
        assert!("H".parse::<NoteName>().is_err());
        assert!("C##".parse::<NoteName>().is_err());
        assert_eq!(NoteName::FSharp.to_string(), "F#");
    }

    #[test]
    fn test_bounds() {
        let longest = LOOP_RANGE.longest(DurationUnit::Seconds);
        assert_eq!(quantize_loop_length(0.5), 0.5);
        assert_eq!(quantize_loop_length(longest), longest);
        assert!((quantize_loop_length(0.0005) - MIN_LOOP_LENGTH).abs() < 1e-12);
        assert!((quantize_loop_length(MIN_LOOP_LENGTH) - MIN_LOOP_LENGTH).abs() < 1e-12);
    }

    #[test]
    fn test_three_milliseconds_goes_to_c4() {
        let c4 = duration_of(NoteName::C, 4, DurationUnit::Seconds);
        assert_eq!(quantize_loop_length(0.003), c4);
    }

    #[test]
    fn test_candidates_respect_range() {
        let range = NoteRange::new(NoteName::A, 2, NoteName::D, 3);
        let candidates: Vec<_> = range.candidates(&NoteName::ALL).collect();
        assert_eq!(candidates.first(), Some(&(NoteName::A, 2)));
        assert_eq!(candidates.last(), Some(&(NoteName::D, 3)));
        assert_eq!(candidates.len(), 6);
    }

    #[test]
    fn test_snap_is_closest_in_table() {
        let mut rng = rand::thread_rng();
        let scales: [&[NoteName]; 2] = [&LOOP_SCALE, &NoteName::ALL];
        let range = NoteRange::new(NoteName::C, 1, NoteName::B, 6);

        for scale in scales {
            for unit in [DurationUnit::Seconds, DurationUnit::Milliseconds] {
                let shortest = range.shortest(unit);
                let longest = range.longest(unit);
                for _ in 0..500 {
                    let length = rng.gen_range(shortest..longest);
                    let snapped = snap_to_nearest_note_duration(length, scale, range, unit);

                    let best = (MIN_OCTAVE..=MAX_OCTAVE)
                        .flat_map(|octave| scale.iter().map(move |&note| (note, octave)))
                        .filter(|&(note, octave)| range.contains(note, octave))
                        .map(|(note, octave)| (duration_of(note, octave, unit) - length).abs())
                        .fold(f64::INFINITY, f64::min);

                    assert!(
                        ((snapped - length).abs() - best).abs() < 1e-12,
                        "{length} snapped to {snapped}, best distance {best}"
                    );
                }
            }
        }
    }
}
