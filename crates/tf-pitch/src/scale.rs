//! Musical scales and pitch-class sets
//!
//! Provides the scale tables used for correction targets and the compact
//! [`PitchClassSet`] that parameter snapshots carry around.

use crate::note::{NOTE_NAMES, parse_pitch_class, pitch_class_of};
use crate::{PitchError, PitchResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Set of pitch classes (0 = C .. 11 = B), one bit each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PitchClassSet(u16);

impl PitchClassSet {
    const MASK: u16 = 0x0fff;

    /// No pitch classes
    pub const EMPTY: Self = Self(0);

    /// All twelve pitch classes
    pub const CHROMATIC: Self = Self(Self::MASK);

    /// Build from pitch classes. Values are taken modulo 12.
    pub fn from_pitch_classes(pitch_classes: &[u8]) -> Self {
        pitch_classes
            .iter()
            .fold(Self::EMPTY, |set, &pc| set.with(pc))
    }

    /// Copy of the set with `pitch_class` added
    #[inline]
    pub const fn with(self, pitch_class: u8) -> Self {
        Self(self.0 | (1 << (pitch_class % 12)))
    }

    #[inline]
    pub const fn contains(self, pitch_class: u8) -> bool {
        pitch_class < 12 && self.0 & (1 << pitch_class) != 0
    }

    /// Membership test for a MIDI note number
    #[inline]
    pub fn contains_midi(self, midi: i32) -> bool {
        self.contains(pitch_class_of(midi))
    }

    #[inline]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Rotate every member up by `semitones` (mod 12)
    pub const fn transpose(self, semitones: u8) -> Self {
        let shift = (semitones % 12) as u32;
        let bits = self.0 as u32;
        let rotated = (bits << shift) | (bits >> (12 - shift));
        Self(rotated as u16 & Self::MASK)
    }

    /// Members in ascending order
    pub fn iter(self) -> impl Iterator<Item = u8> {
        (0..12u8).filter(move |&pc| self.contains(pc))
    }
}

impl FromIterator<u8> for PitchClassSet {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, |set, pc| set.with(pc))
    }
}

/// Scale types exposed on the control surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleType {
    /// Major (Ionian)
    #[default]
    Major,
    /// Natural minor (Aeolian)
    Minor,
    /// Major pentatonic
    Pentatonic,
    /// Blues scale
    Blues,
    /// Dorian mode
    Dorian,
    /// Mixolydian mode
    Mixolydian,
    /// All 12 notes
    Chromatic,
}

impl ScaleType {
    /// Every scale type, in control-surface order
    pub const ALL: [ScaleType; 7] = [
        ScaleType::Major,
        ScaleType::Minor,
        ScaleType::Pentatonic,
        ScaleType::Blues,
        ScaleType::Dorian,
        ScaleType::Mixolydian,
        ScaleType::Chromatic,
    ];

    /// Semitone offsets from the root
    pub fn intervals(self) -> &'static [u8] {
        match self {
            ScaleType::Major => &[0, 2, 4, 5, 7, 9, 11],
            ScaleType::Minor => &[0, 2, 3, 5, 7, 8, 10],
            ScaleType::Pentatonic => &[0, 2, 4, 7, 9],
            ScaleType::Blues => &[0, 3, 5, 6, 7, 10],
            ScaleType::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            ScaleType::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            ScaleType::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
        }
    }

    /// Control-surface identifier (`"major"`)
    pub fn as_str(self) -> &'static str {
        match self {
            ScaleType::Major => "major",
            ScaleType::Minor => "minor",
            ScaleType::Pentatonic => "pentatonic",
            ScaleType::Blues => "blues",
            ScaleType::Dorian => "dorian",
            ScaleType::Mixolydian => "mixolydian",
            ScaleType::Chromatic => "chromatic",
        }
    }

    fn display_name(self) -> &'static str {
        match self {
            ScaleType::Major => "Major",
            ScaleType::Minor => "Minor",
            ScaleType::Pentatonic => "Pentatonic",
            ScaleType::Blues => "Blues",
            ScaleType::Dorian => "Dorian",
            ScaleType::Mixolydian => "Mixolydian",
            ScaleType::Chromatic => "Chromatic",
        }
    }
}

impl fmt::Display for ScaleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScaleType {
    type Err = PitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        ScaleType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| PitchError::InvalidScale(s.to_string()))
    }
}

/// Parse a key name into its pitch class (`"F#"` / `"Gb"` -> 6)
pub fn parse_key(name: &str) -> PitchResult<u8> {
    parse_pitch_class(name).ok_or_else(|| PitchError::InvalidKey(name.to_string()))
}

/// Display name of a key (sharps)
pub fn key_name(root: u8) -> &'static str {
    NOTE_NAMES[(root % 12) as usize]
}

/// Musical scale with root note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scale {
    /// Root pitch class (0 = C)
    pub root: u8,
    /// Offsets from the root
    pub intervals: PitchClassSet,
    /// Named type, `None` for custom interval sets
    pub scale_type: Option<ScaleType>,
}

impl Scale {
    /// Create a named scale
    pub fn new(root: u8, scale_type: ScaleType) -> Self {
        Self {
            root: root % 12,
            intervals: PitchClassSet::from_pitch_classes(scale_type.intervals()),
            scale_type: Some(scale_type),
        }
    }

    /// Create a scale from explicit offsets. Duplicate offsets collapse.
    pub fn custom(root: u8, intervals: &[u8]) -> PitchResult<Self> {
        if let Some(&bad) = intervals.iter().find(|&&i| i > 11) {
            return Err(PitchError::InvalidInterval(bad));
        }
        if intervals.is_empty() {
            return Err(PitchError::InvalidScale("empty interval set".to_string()));
        }
        Ok(Self {
            root: root % 12,
            intervals: PitchClassSet::from_pitch_classes(intervals),
            scale_type: None,
        })
    }

    /// Absolute pitch classes: `{(root + offset) mod 12}`
    pub fn pitch_classes(&self) -> PitchClassSet {
        self.intervals.transpose(self.root)
    }

    /// Check if a MIDI note is in the scale
    pub fn contains_midi(&self, midi: i32) -> bool {
        self.pitch_classes().contains_midi(midi)
    }

    /// Get scale name (`"C Major"`)
    pub fn name(&self) -> String {
        let kind = self.scale_type.map_or("Custom", ScaleType::display_name);
        format!("{} {}", key_name(self.root), kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_creation() {
        let scale = Scale::new(0, ScaleType::Major); // C major
        assert!(scale.contains_midi(60)); // C
        assert!(scale.contains_midi(62)); // D
        assert!(scale.contains_midi(64)); // E
        assert!(!scale.contains_midi(61)); // C# not in C major
        assert!(!scale.contains_midi(63)); // D# not in C major
    }

    #[test]
    fn test_minor_scale() {
        let scale = Scale::new(9, ScaleType::Minor); // A minor

        // A minor: A B C D E F G
        assert!(scale.contains_midi(69)); // A
        assert!(scale.contains_midi(71)); // B
        assert!(scale.contains_midi(72)); // C
        assert!(!scale.contains_midi(70)); // A# not in A minor
    }

    #[test]
    fn test_pentatonic() {
        let scale = Scale::new(0, ScaleType::Pentatonic);
        let pcs: Vec<u8> = scale.pitch_classes().iter().collect();
        assert_eq!(pcs, vec![0, 2, 4, 7, 9]);
    }

    #[test]
    fn test_transposed_pitch_classes() {
        // D major: D E F# G A B C#
        let pcs: Vec<u8> = Scale::new(2, ScaleType::Major).pitch_classes().iter().collect();
        assert_eq!(pcs, vec![1, 2, 4, 6, 7, 9, 11]);

        // B blues wraps around the octave
        let pcs: Vec<u8> = Scale::new(11, ScaleType::Blues).pitch_classes().iter().collect();
        assert_eq!(pcs, vec![2, 4, 5, 6, 9, 11]);
    }

    #[test]
    fn test_pitch_class_count_for_every_key() {
        for scale_type in ScaleType::ALL {
            for root in 0..12 {
                let set = Scale::new(root, scale_type).pitch_classes();
                assert_eq!(
                    set.len(),
                    scale_type.intervals().len(),
                    "{} rooted at {}",
                    scale_type,
                    root
                );
                assert!(set.iter().all(|pc| pc < 12));
            }
        }
    }

    #[test]
    fn test_chromatic_scale() {
        let scale = Scale::new(5, ScaleType::Chromatic);
        assert_eq!(scale.pitch_classes(), PitchClassSet::CHROMATIC);
        for i in 0..12 {
            assert!(scale.contains_midi(60 + i));
        }
    }

    #[test]
    fn test_custom_scale() {
        let scale = Scale::custom(0, &[0, 4, 7, 7]).unwrap();
        assert_eq!(scale.pitch_classes().len(), 3);
        assert_eq!(scale.name(), "C Custom");

        assert!(matches!(
            Scale::custom(0, &[0, 12]),
            Err(PitchError::InvalidInterval(12))
        ));
        assert!(matches!(
            Scale::custom(0, &[]),
            Err(PitchError::InvalidScale(_))
        ));
    }

    #[test]
    fn test_scale_name() {
        assert_eq!(Scale::new(0, ScaleType::Major).name(), "C Major");
        assert_eq!(Scale::new(9, ScaleType::Minor).name(), "A Minor");
        assert_eq!(Scale::new(7, ScaleType::Blues).name(), "G Blues");
    }

    #[test]
    fn test_scale_type_parsing() {
        assert_eq!("major".parse::<ScaleType>().unwrap(), ScaleType::Major);
        assert_eq!(" Dorian ".parse::<ScaleType>().unwrap(), ScaleType::Dorian);
        assert!("lydian".parse::<ScaleType>().is_err());

        let json = serde_json::to_string(&ScaleType::Mixolydian).unwrap();
        assert_eq!(json, "\"mixolydian\"");
    }

    #[test]
    fn test_parse_key() {
        assert_eq!(parse_key("C").unwrap(), 0);
        assert_eq!(parse_key("A#").unwrap(), 10);
        assert_eq!(parse_key("Bb").unwrap(), 10);
        assert!(matches!(parse_key("X"), Err(PitchError::InvalidKey(_))));
        assert_eq!(key_name(10), "A#");
    }

    #[test]
    fn test_pitch_class_set_ops() {
        let set: PitchClassSet = [0u8, 4, 7].into_iter().collect();
        assert!(set.contains(4));
        assert!(!set.contains(5));
        assert!(!set.contains(12));
        assert!(set.contains_midi(-8)); // E-2
        assert_eq!(set.transpose(0), set);
        assert_eq!(set.transpose(12), set);
        assert!(PitchClassSet::EMPTY.is_empty());
    }
}
