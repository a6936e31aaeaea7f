//! ChordPro chord charts: parsing, rendering and transposition.

mod chord;
mod parser;
mod transpose;

pub use chord::{semitones_between, Accidental, Chord, InvalidChord, InvalidKey, Key, Note};
pub use parser::{parse, ChordChart, ChordProError, Line, Metadata, Section, SectionKind, Segment};
pub use transpose::{transpose, transpose_to_key};
