use super::chord::{semitones_between, InvalidKey, Key};
use super::parser::{ChordChart, Line};

/// Shifts every chord and the key directive by `semitones` (taken mod 12).
///
/// Spelling follows the resulting key: flats for flat keys, sharps
/// otherwise. A chart without a key directive uses its first chord as the
/// reference key; a chart without chords is spelled with sharps.
pub fn transpose(chart: &ChordChart, semitones: i32) -> ChordChart {
    let shift = semitones.rem_euclid(12);
    if shift == 0 {
        return chart.clone();
    }
    let target_key = chart.effective_key().map(|k| k.transpose(shift));
    transpose_spelled(chart, shift, target_key)
}

/// Transposes the chart so that it sounds in `to_key`, spelling every chord
/// the way `to_key` is written.
pub fn transpose_to_key(chart: &ChordChart, to_key: &str) -> Result<ChordChart, InvalidKey> {
    let target: Key = to_key.parse()?;
    let Some(from) = chart.effective_key() else {
        return Ok(chart.clone());
    };
    let shift = semitones_between(&from.to_string(), &target.to_string())? as i32;
    let target = Key {
        root: target.root,
        minor: from.minor,
    };
    if shift == 0 && chart.metadata.key.map_or(true, |k| k.root == target.root) {
        return Ok(chart.clone());
    }
    Ok(transpose_spelled(chart, shift, Some(target)))
}

fn transpose_spelled(chart: &ChordChart, shift: i32, target_key: Option<Key>) -> ChordChart {
    let prefer_flats = target_key.map_or(false, |k| k.prefers_flats());
    let mut out = chart.clone();
    if out.metadata.key.is_some() {
        out.metadata.key = target_key;
    }
    for section in out.sections.iter_mut() {
        for line in section.lines.iter_mut() {
            if let Line::Lyrics { segments } = line {
                for segment in segments.iter_mut() {
                    if let Some(chord) = segment.chord.as_mut() {
                        *chord = chord.transpose(shift, prefer_flats);
                    }
                }
            }
        }
    }
    out
}
