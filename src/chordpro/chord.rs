use lazy_static::lazy_static;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

lazy_static! {
    static ref CHORD_RE: Regex = Regex::new(
        r"^([A-G])([#b]?)((?:maj|min|dim|aug|sus|add|alt|no|m|M|\+|-|°|ø|Δ|\^|[0-9]|#|b|\(|\)|,)*)(?:/([A-G])([#b]?))?$"
    )
    .unwrap();
    static ref KEY_RE: Regex = Regex::new(r"^([A-G])([#b]?)(m|min|minor)?$").unwrap();
}

const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];
const FLAT_NAMES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Pitch classes of F, Bb, Eb, Ab, Db and Gb major.
const FLAT_MAJOR_KEYS: [u8; 6] = [5, 10, 3, 8, 1, 6];
/// Pitch classes of Dm, Gm, Cm, Fm, Bbm and Ebm.
const FLAT_MINOR_KEYS: [u8; 6] = [2, 7, 0, 5, 10, 3];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid chord '{0}'")]
pub struct InvalidChord(pub String);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid key '{0}'")]
pub struct InvalidKey(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accidental {
    Natural,
    Sharp,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Note {
    pub letter: char,
    pub accidental: Accidental,
}

impl Note {
    fn parse(letter: &str, accidental: &str) -> Option<Note> {
        let letter = letter.chars().next()?;
        let accidental = match accidental {
            "" => Accidental::Natural,
            "#" => Accidental::Sharp,
            "b" => Accidental::Flat,
            _ => return None,
        };
        Some(Note { letter, accidental })
    }

    pub fn pitch_class(&self) -> u8 {
        let natural: i32 = match self.letter {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            _ => 11,
        };
        let offset = match self.accidental {
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
            Accidental::Flat => -1,
        };
        (natural + offset).rem_euclid(12) as u8
    }

    pub fn from_pitch_class(pitch_class: u8, prefer_flats: bool) -> Note {
        let names = if prefer_flats { FLAT_NAMES } else { SHARP_NAMES };
        let name = names[(pitch_class % 12) as usize];
        let mut chars = name.chars();
        let letter = chars.next().unwrap_or('C');
        let accidental = match chars.next() {
            Some('#') => Accidental::Sharp,
            Some('b') => Accidental::Flat,
            _ => Accidental::Natural,
        };
        Note { letter, accidental }
    }

    pub fn transpose(&self, semitones: i32, prefer_flats: bool) -> Note {
        let pc = (self.pitch_class() as i32 + semitones).rem_euclid(12) as u8;
        Note::from_pitch_class(pc, prefer_flats)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter)?;
        match self.accidental {
            Accidental::Natural => Ok(()),
            Accidental::Sharp => write!(f, "#"),
            Accidental::Flat => write!(f, "b"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Chord {
    pub root: Note,
    pub suffix: String,
    pub bass: Option<Note>,
}

impl Chord {
    pub fn transpose(&self, semitones: i32, prefer_flats: bool) -> Chord {
        Chord {
            root: self.root.transpose(semitones, prefer_flats),
            suffix: self.suffix.clone(),
            bass: self.bass.map(|b| b.transpose(semitones, prefer_flats)),
        }
    }

    /// A chord whose quality starts with a minor marker, used to guess the key
    /// of a chart that has no key directive.
    pub fn is_minor(&self) -> bool {
        (self.suffix.starts_with('m') && !self.suffix.starts_with("maj"))
            || self.suffix.starts_with("min")
            || self.suffix.starts_with('-')
    }
}

impl FromStr for Chord {
    type Err = InvalidChord;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = CHORD_RE
            .captures(s.trim())
            .ok_or_else(|| InvalidChord(s.to_string()))?;
        let root = Note::parse(&caps[1], &caps[2]).ok_or_else(|| InvalidChord(s.to_string()))?;
        let bass = match caps.get(4) {
            Some(letter) => Some(
                Note::parse(letter.as_str(), caps.get(5).map_or("", |m| m.as_str()))
                    .ok_or_else(|| InvalidChord(s.to_string()))?,
            ),
            None => None,
        };
        Ok(Chord {
            root,
            suffix: caps[3].to_string(),
            bass,
        })
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.root, self.suffix)?;
        if let Some(bass) = &self.bass {
            write!(f, "/{}", bass)?;
        }
        Ok(())
    }
}

impl Serialize for Chord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Key {
    pub root: Note,
    pub minor: bool,
}

impl Key {
    pub fn pitch_class(&self) -> u8 {
        self.root.pitch_class()
    }

    /// Whether chords in this key are spelled with flats.
    pub fn prefers_flats(&self) -> bool {
        let pc = self.pitch_class();
        if self.minor {
            FLAT_MINOR_KEYS.contains(&pc)
        } else {
            FLAT_MAJOR_KEYS.contains(&pc)
        }
    }

    /// Key of the same mode at the given pitch class, spelled the way that
    /// key is conventionally written.
    pub fn at_pitch_class(pitch_class: u8, minor: bool) -> Key {
        let flat = Key {
            root: Note::from_pitch_class(pitch_class, true),
            minor,
        };
        if flat.prefers_flats() {
            flat
        } else {
            Key {
                root: Note::from_pitch_class(pitch_class, false),
                minor,
            }
        }
    }

    pub fn transpose(&self, semitones: i32) -> Key {
        let pc = (self.pitch_class() as i32 + semitones).rem_euclid(12) as u8;
        Key::at_pitch_class(pc, self.minor)
    }
}

impl FromStr for Key {
    type Err = InvalidKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = KEY_RE
            .captures(s.trim())
            .ok_or_else(|| InvalidKey(s.to_string()))?;
        let root = Note::parse(&caps[1], &caps[2]).ok_or_else(|| InvalidKey(s.to_string()))?;
        Ok(Key {
            root,
            minor: caps.get(3).is_some(),
        })
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.root, if self.minor { "m" } else { "" })
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Distance going up from one key to another, in 0..12. Only the root pitch
/// class counts, so `Am` to `C` is 3.
pub fn semitones_between(from_key: &str, to_key: &str) -> Result<u8, InvalidKey> {
    let from = Key::from_str(from_key)?;
    let to = Key::from_str(to_key)?;
    Ok((to.pitch_class() as i32 - from.pitch_class() as i32).rem_euclid(12) as u8)
}
