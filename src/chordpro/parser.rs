use super::chord::{Chord, InvalidChord, InvalidKey, Key};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChordProError {
    #[error("line {line}: unterminated chord bracket")]
    UnterminatedChord { line: usize },

    #[error("line {line}: unterminated directive")]
    UnterminatedDirective { line: usize },

    #[error("line {line}: {source}")]
    InvalidChord { line: usize, source: InvalidChord },

    #[error("line {line}: {source}")]
    InvalidKey { line: usize, source: InvalidKey },

    #[error("line {line}: {section} section started inside an open {open} section")]
    NestedSection {
        line: usize,
        section: SectionKind,
        open: SectionKind,
    },

    #[error("line {line}: end of {section} without a matching start")]
    UnmatchedSectionEnd { line: usize, section: SectionKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Chorus,
    Verse,
    Bridge,
    Tab,
}

impl SectionKind {
    fn name(&self) -> &'static str {
        match self {
            SectionKind::Chorus => "chorus",
            SectionKind::Verse => "verse",
            SectionKind::Bridge => "bridge",
            SectionKind::Tab => "tab",
        }
    }

    fn from_abbreviation(c: &str) -> Option<Self> {
        match c {
            "c" | "chorus" => Some(SectionKind::Chorus),
            "v" | "verse" => Some(SectionKind::Verse),
            "b" | "bridge" => Some(SectionKind::Bridge),
            "t" | "tab" => Some(SectionKind::Tab),
            _ => None,
        }
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub artist: Option<String>,
    pub key: Option<Key>,
    pub tempo: Option<String>,
    pub time: Option<String>,
    pub capo: Option<String>,
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chord: Option<Chord>,
    /// `[N.C.]`, `[x]` and `[*...]` markers, kept verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Line {
    Lyrics { segments: Vec<Segment> },
    Comment { text: String },
    Blank,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    /// None for lines outside any start_of/end_of pair.
    pub kind: Option<SectionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub lines: Vec<Line>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChordChart {
    pub metadata: Metadata,
    pub sections: Vec<Section>,
}

enum Directive<'a> {
    Meta(&'a str, &'a str),
    Comment(&'a str),
    Start(SectionKind, Option<&'a str>),
    End(SectionKind),
}

fn classify_directive<'a>(name: &'a str, value: &'a str) -> Directive<'a> {
    let lower = name.to_ascii_lowercase();
    match lower.as_str() {
        "comment" | "c" | "ci" | "comment_italic" => return Directive::Comment(value),
        _ => {}
    }
    let start = lower
        .strip_prefix("start_of_")
        .or_else(|| lower.strip_prefix("so"))
        .and_then(SectionKind::from_abbreviation);
    if let Some(kind) = start {
        let label = Some(value).filter(|v| !v.is_empty());
        return Directive::Start(kind, label);
    }
    let end = lower
        .strip_prefix("end_of_")
        .or_else(|| lower.strip_prefix("eo"))
        .and_then(SectionKind::from_abbreviation);
    if let Some(kind) = end {
        return Directive::End(kind);
    }
    Directive::Meta(name, value)
}

fn is_annotation(content: &str) -> bool {
    content == "N.C." || content.eq_ignore_ascii_case("x") || content.starts_with('*')
}

fn parse_lyrics(line: &str, line_number: usize) -> Result<Line, ChordProError> {
    let mut segments = vec![];
    let mut current = Segment {
        chord: None,
        annotation: None,
        text: String::new(),
    };
    let mut rest = line;
    while let Some(open) = rest.find('[') {
        current.text.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find(']').ok_or(ChordProError::UnterminatedChord {
            line: line_number,
        })?;
        let content = after[..close].trim();

        if current.chord.is_some() || current.annotation.is_some() || !current.text.is_empty()
        {
            segments.push(current);
        }
        current = Segment {
            chord: None,
            annotation: None,
            text: String::new(),
        };
        if is_annotation(content) {
            current.annotation = Some(content.to_string());
        } else {
            let chord = Chord::from_str(content).map_err(|source| ChordProError::InvalidChord {
                line: line_number,
                source,
            })?;
            current.chord = Some(chord);
        }
        rest = &after[close + 1..];
    }
    current.text.push_str(rest);
    if current.chord.is_some() || current.annotation.is_some() || !current.text.is_empty() {
        segments.push(current);
    }
    Ok(Line::Lyrics { segments })
}

struct ParseState {
    chart: ChordChart,
    /// Kind of the explicitly opened section at the end of `chart.sections`.
    open: Option<SectionKind>,
}

impl ParseState {
    fn push_line(&mut self, line: Line) {
        let needs_anonymous = self.open.is_none()
            && self
                .chart
                .sections
                .last()
                .map_or(true, |s| s.kind.is_some());
        if needs_anonymous {
            self.chart.sections.push(Section {
                kind: None,
                label: None,
                lines: vec![],
            });
        }
        if let Some(section) = self.chart.sections.last_mut() {
            section.lines.push(line);
        }
    }

    fn set_meta(&mut self, name: &str, value: &str, line: usize) -> Result<(), ChordProError> {
        let value = value.to_string();
        let metadata = &mut self.chart.metadata;
        match name.to_ascii_lowercase().as_str() {
            "title" | "t" => metadata.title = Some(value),
            "subtitle" | "st" => metadata.subtitle = Some(value),
            "artist" => metadata.artist = Some(value),
            "key" => {
                let key = Key::from_str(&value)
                    .map_err(|source| ChordProError::InvalidKey { line, source })?;
                metadata.key = Some(key);
            }
            "tempo" => metadata.tempo = Some(value),
            "time" => metadata.time = Some(value),
            "capo" => metadata.capo = Some(value),
            other => {
                metadata.extra.insert(other.to_string(), value);
            }
        }
        Ok(())
    }
}

/// Parses ChordPro text. Lines starting with `#` are dropped; a section still
/// open at the end of the text is closed implicitly.
pub fn parse(text: &str) -> Result<ChordChart, ChordProError> {
    let mut state = ParseState {
        chart: ChordChart::default(),
        open: None,
    };

    for (index, raw_line) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = raw_line.trim_end();
        let trimmed = line.trim_start();

        if trimmed.starts_with('#') {
            continue;
        }
        if trimmed.is_empty() {
            state.push_line(Line::Blank);
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix('{') {
            let close = rest
                .find('}')
                .ok_or(ChordProError::UnterminatedDirective { line: line_number })?;
            let inner = &rest[..close];
            let trailing = rest[close + 1..].trim();
            let (name, value) = match inner.split_once(':') {
                Some((name, value)) => (name.trim(), value.trim()),
                None => (inner.trim(), ""),
            };
            match classify_directive(name, value) {
                Directive::Comment(text) => state.push_line(Line::Comment {
                    text: text.to_string(),
                }),
                Directive::Start(kind, label) => {
                    if let Some(open) = state.open {
                        return Err(ChordProError::NestedSection {
                            line: line_number,
                            section: kind,
                            open,
                        });
                    }
                    state.open = Some(kind);
                    state.chart.sections.push(Section {
                        kind: Some(kind),
                        label: label.map(str::to_string),
                        lines: vec![],
                    });
                }
                Directive::End(kind) => {
                    if state.open != Some(kind) {
                        return Err(ChordProError::UnmatchedSectionEnd {
                            line: line_number,
                            section: kind,
                        });
                    }
                    state.open = None;
                }
                Directive::Meta(name, value) => state.set_meta(name, value, line_number)?,
            }
            // Text after the closing brace is a lyrics line of its own
            if !trailing.is_empty() {
                state.push_line(parse_lyrics(trailing, line_number)?);
            }
            continue;
        }
        state.push_line(parse_lyrics(line, line_number)?);
    }

    Ok(state.chart)
}

impl ChordChart {
    /// Distinct chords in order of first use.
    pub fn chords(&self) -> Vec<Chord> {
        let mut chords: Vec<Chord> = vec![];
        for section in &self.sections {
            for line in &section.lines {
                if let Line::Lyrics { segments } = line {
                    for chord in segments.iter().filter_map(|s| s.chord.as_ref()) {
                        if !chords.contains(chord) {
                            chords.push(chord.clone());
                        }
                    }
                }
            }
        }
        chords
    }

    /// The declared key, or a guess from the first chord.
    pub fn effective_key(&self) -> Option<Key> {
        self.metadata.key.or_else(|| {
            self.chords().first().map(|c| Key {
                root: c.root,
                minor: c.is_minor(),
            })
        })
    }

    /// Renders normalized ChordPro text. Parsing the output yields the same chart.
    pub fn to_chordpro(&self) -> String {
        let mut out = String::new();
        let meta = &self.metadata;
        let fields: [(&str, Option<String>); 7] = [
            ("title", meta.title.clone()),
            ("subtitle", meta.subtitle.clone()),
            ("artist", meta.artist.clone()),
            ("key", meta.key.map(|k| k.to_string())),
            ("tempo", meta.tempo.clone()),
            ("time", meta.time.clone()),
            ("capo", meta.capo.clone()),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                let _ = writeln!(out, "{{{}: {}}}", name, value);
            }
        }
        for (name, value) in &meta.extra {
            if value.is_empty() {
                let _ = writeln!(out, "{{{}}}", name);
            } else {
                let _ = writeln!(out, "{{{}: {}}}", name, value);
            }
        }

        for section in &self.sections {
            if let Some(kind) = section.kind {
                match &section.label {
                    Some(label) => {
                        let _ = writeln!(out, "{{start_of_{}: {}}}", kind, label);
                    }
                    None => {
                        let _ = writeln!(out, "{{start_of_{}}}", kind);
                    }
                }
            }
            for line in &section.lines {
                match line {
                    Line::Blank => out.push('\n'),
                    Line::Comment { text } => {
                        let _ = writeln!(out, "{{comment: {}}}", text);
                    }
                    Line::Lyrics { segments } => {
                        for segment in segments {
                            if let Some(chord) = &segment.chord {
                                let _ = write!(out, "[{}]", chord);
                            } else if let Some(annotation) = &segment.annotation {
                                let _ = write!(out, "[{}]", annotation);
                            }
                            out.push_str(&segment.text);
                        }
                        out.push('\n');
                    }
                }
            }
            if let Some(kind) = section.kind {
                let _ = writeln!(out, "{{end_of_{}}}", kind);
            }
        }
        out
    }
}
