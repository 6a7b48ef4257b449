//! Note naming and equal-temperament conversions
//!
//! All conversions are relative to A4 = 440 Hz (MIDI 69).

use crate::scale::PitchClassSet;
use crate::{PitchError, PitchResult};
use serde::Serialize;

/// Reference pitch (A4)
pub const A4_FREQUENCY: f32 = 440.0;

/// MIDI number of A4
pub const A4_MIDI: i32 = 69;

/// Note names, sharps only
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Search window of [`nearest_scale_note`], in semitones either side
pub const DISPLAY_SEARCH_SEMITONES: i32 = 12;

/// Convert frequency to (fractional) MIDI note number
pub fn freq_to_midi(freq: f32) -> f32 {
    A4_MIDI as f32 + 12.0 * (freq / A4_FREQUENCY).log2()
}

/// Convert (fractional) MIDI note number to frequency
pub fn midi_to_freq(midi: f32) -> f32 {
    A4_FREQUENCY * 2.0f32.powf((midi - A4_MIDI as f32) / 12.0)
}

/// Interval from `from` to `to` in cents
pub fn freq_to_cents(from: f32, to: f32) -> f32 {
    1200.0 * (to / from).log2()
}

/// Pitch class (0 = C) of a MIDI note number
#[inline]
pub fn pitch_class_of(midi: i32) -> u8 {
    midi.rem_euclid(12) as u8
}

/// Parse a note letter with optional accidental (`"C"`, `"F#"`, `"Bb"`)
pub fn parse_pitch_class(name: &str) -> Option<u8> {
    let mut chars = name.trim().chars();
    let base: i32 = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let accidental = match chars.as_str() {
        "" => 0,
        "#" | "♯" => 1,
        "b" | "♭" => -1,
        _ => return None,
    };
    Some((base + accidental).rem_euclid(12) as u8)
}

/// Frequency of a named note in a given octave (`("A", 4)` is 440 Hz)
pub fn note_to_frequency(name: &str, octave: i32) -> PitchResult<f32> {
    let pitch_class =
        parse_pitch_class(name).ok_or_else(|| PitchError::InvalidNoteName(name.to_string()))?;
    let midi = (octave + 1) * 12 + pitch_class as i32;
    Ok(midi_to_freq(midi as f32))
}

/// Nearest equal-tempered note to a frequency
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NoteInfo {
    /// Note name without octave (`"A#"`)
    pub note_name: &'static str,
    /// Scientific pitch octave (A4 is octave 4)
    pub octave: i32,
    /// Deviation of the input from the note, in [-50, 50] cents
    pub cents_offset: f32,
    /// Exact frequency of the note
    pub exact_frequency: f32,
    /// Pitch class (0 = C)
    pub pitch_class: u8,
    /// MIDI note number
    pub midi_number: i32,
}

impl NoteInfo {
    /// Quantize a frequency to the nearest semitone. `None` for non-positive input.
    pub fn from_frequency(freq: f32) -> Option<Self> {
        if freq <= 0.0 || !freq.is_finite() {
            return None;
        }
        let midi = freq_to_midi(freq);
        let nearest = midi.round();
        let mut info = Self::from_midi(nearest as i32);
        info.cents_offset = ((midi - nearest) * 100.0).clamp(-50.0, 50.0);
        Some(info)
    }

    /// Note info for an exact MIDI note number
    pub fn from_midi(midi: i32) -> Self {
        let pitch_class = pitch_class_of(midi);
        Self {
            note_name: NOTE_NAMES[pitch_class as usize],
            octave: midi.div_euclid(12) - 1,
            cents_offset: 0.0,
            exact_frequency: midi_to_freq(midi as f32),
            pitch_class,
            midi_number: midi,
        }
    }

    /// Display label (`"A4"`)
    pub fn label(&self) -> String {
        format!("{}{}", self.note_name, self.octave)
    }
}

/// Nearest note whose pitch class is in `set`
///
/// Candidates span ±12 semitones around the rounded input and are scored by
/// absolute distance in cents; ties go to the lower MIDI number. This is the
/// display-side helper. The correction path uses its own ±6 window
/// (see [`crate::correction::TARGET_SEARCH_SEMITONES`]).
pub fn nearest_scale_note(freq: f32, set: PitchClassSet) -> Option<NoteInfo> {
    if freq <= 0.0 || !freq.is_finite() || set.is_empty() {
        return None;
    }
    let midi = freq_to_midi(freq);
    let center = midi.round() as i32;

    let mut best: Option<(i32, f32)> = None;
    for candidate in center - DISPLAY_SEARCH_SEMITONES..=center + DISPLAY_SEARCH_SEMITONES {
        if !set.contains(pitch_class_of(candidate)) {
            continue;
        }
        let distance = ((candidate as f32 - midi) * 100.0).abs();
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((candidate, distance));
        }
    }

    best.map(|(candidate, _)| NoteInfo::from_midi(candidate))
}
