use serde::{Deserialize, Serialize};

use crate::DomainError;

/// MIDI numbers of every pitch the trainer can sound: the C4..C5 chromatic
/// octave plus the cadence voicing notes G3 and B3 and the top neighbour D5.
pub const SUPPORTED_MIDI: [u8; 16] = [
    55, 59, 60, 61, 62, 63, 64, 65, 66, 67, 68, 69, 70, 71, 72, 74,
];

const SOLFEGE: [&str; 12] = [
    "do", "do#", "re", "re#", "mi", "fa", "fa#", "sol", "sol#", "la", "la#", "si",
];

const LETTER: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Notation {
    Solfege,
    Letter,
}

/// A discrete playable pitch, identified by its MIDI number.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Note(u8);

pub const G3: Note = Note(55);
pub const B3: Note = Note(59);
pub const C4: Note = Note(60);
pub const D4: Note = Note(62);
pub const E4: Note = Note(64);
pub const F4: Note = Note(65);
pub const G4: Note = Note(67);
pub const A4: Note = Note(69);
pub const B4: Note = Note(71);
pub const C5: Note = Note(72);
pub const D5: Note = Note(74);

impl Note {
    pub fn from_midi(midi: u8) -> Result<Self, DomainError> {
        if SUPPORTED_MIDI.contains(&midi) {
            Ok(Self(midi))
        } else {
            Err(DomainError::validation(format!(
                "midi {midi} is outside the supported range"
            )))
        }
    }

    pub fn midi(&self) -> u8 {
        self.0
    }

    pub fn pitch_class(&self) -> u8 {
        self.0 % 12
    }

    /// Rendering name, e.g. "C4" or "F#4".
    pub fn name(&self) -> String {
        let octave = (self.0 / 12) as i8 - 1;
        format!("{}{}", LETTER[self.pitch_class() as usize], octave)
    }

    pub fn label(&self, notation: Notation) -> &'static str {
        let pc = self.pitch_class() as usize;
        match notation {
            Notation::Solfege => SOLFEGE[pc],
            Notation::Letter => LETTER[pc],
        }
    }

    /// Whether a black key sits immediately above this pitch on a keyboard.
    pub fn has_sharp_after(&self) -> bool {
        matches!(self.pitch_class(), 0 | 2 | 5 | 7 | 9)
    }
}

/// The white keys from C4 to C5, in keyboard order.
pub fn white_keys() -> [Note; 8] {
    [C4, D4, E4, F4, G4, A4, B4, C5]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_midi_validates_range() {
        assert!(Note::from_midi(60).is_ok());
        assert!(Note::from_midi(55).is_ok());
        assert!(Note::from_midi(30).is_err());
        assert!(Note::from_midi(73).is_err());
    }

    #[test]
    fn names_and_labels() {
        assert_eq!(C4.name(), "C4");
        assert_eq!(Note::from_midi(66).unwrap().name(), "F#4");
        assert_eq!(G3.name(), "G3");
        assert_eq!(C4.label(Notation::Solfege), "do");
        assert_eq!(C4.label(Notation::Letter), "C");
        assert_eq!(G4.label(Notation::Solfege), "sol");
        assert_eq!(B4.label(Notation::Letter), "B");
    }

    #[test]
    fn pitch_class_wraps_octaves() {
        assert_eq!(C4.pitch_class(), C5.pitch_class());
        assert_eq!(D5.pitch_class(), D4.pitch_class());
    }

    #[test]
    fn sharp_layout_matches_keyboard() {
        assert!(C4.has_sharp_after());
        assert!(D4.has_sharp_after());
        assert!(!E4.has_sharp_after());
        assert!(F4.has_sharp_after());
        assert!(!B4.has_sharp_after());
    }

    #[test]
    fn notation_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&Notation::Solfege).unwrap(), "\"solfege\"");
        let back: Notation = serde_json::from_str("\"letter\"").unwrap();
        assert_eq!(back, Notation::Letter);
    }
}
