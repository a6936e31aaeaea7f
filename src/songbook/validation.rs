//! Field rules shared by the store, the sync processor and user registration.

use super::error::{SongbookError, SongbookResult};
use super::models::{NewArrangement, NewSetlist, NewSong, SetlistEntry, MAX_SETLIST_ENTRIES};
use crate::chordpro::{self, Key};
use chrono::NaiveDate;
use std::str::FromStr;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_THEMES: usize = 20;
pub const MAX_THEME_LEN: usize = 50;
pub const MAX_LYRICS_LEN: usize = 20_000;
pub const MAX_CHORD_DATA_LEN: usize = 50_000;
pub const MAX_LONG_TEXT_LEN: usize = 2_000;
pub const MAX_NOTES_LEN: usize = 500;
pub const MAX_REFERENCE_LEN: usize = 100;
pub const MIN_TEMPO: u32 = 20;
pub const MAX_TEMPO: u32 = 300;
pub const MAX_CAPO: u8 = 12;

pub fn text(field: &'static str, value: &str, min: usize, max: usize) -> SongbookResult<String> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len < min {
        return Err(if min == 1 {
            SongbookError::invalid(field, "is required")
        } else {
            SongbookError::invalid(field, format!("must be at least {} characters", min))
        });
    }
    if len > max {
        return Err(SongbookError::invalid(
            field,
            format!("must be at most {} characters", max),
        ));
    }
    Ok(trimmed.to_string())
}

/// Trims an optional field, turning blank strings into None.
pub fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> SongbookResult<Option<String>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => text(field, v, 0, max).map(Some),
        None => Ok(None),
    }
}

pub fn key(field: &'static str, value: Option<&str>) -> SongbookResult<Option<String>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => Key::from_str(v)
            .map(|k| Some(k.to_string()))
            .map_err(|e| SongbookError::invalid(field, e.to_string())),
        None => Ok(None),
    }
}

pub fn tempo(value: Option<u32>) -> SongbookResult<Option<u32>> {
    match value {
        Some(t) if !(MIN_TEMPO..=MAX_TEMPO).contains(&t) => Err(SongbookError::invalid(
            "tempo",
            format!("must be between {} and {}", MIN_TEMPO, MAX_TEMPO),
        )),
        other => Ok(other),
    }
}

pub fn ccli_number(value: Option<&str>) -> SongbookResult<Option<String>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) if v.len() <= 16 && v.chars().all(|c| c.is_ascii_digit()) => {
            Ok(Some(v.to_string()))
        }
        Some(_) => Err(SongbookError::invalid("ccli_number", "must contain only digits")),
        None => Ok(None),
    }
}

pub fn release_year(value: Option<i32>) -> SongbookResult<Option<i32>> {
    match value {
        Some(y) if !(1000..=2100).contains(&y) => Err(SongbookError::invalid(
            "release_year",
            "must be between 1000 and 2100",
        )),
        other => Ok(other),
    }
}

/// Lowercases, trims and deduplicates themes, keeping first-seen order.
pub fn themes(values: &[String]) -> SongbookResult<Vec<String>> {
    let mut out: Vec<String> = vec![];
    for value in values {
        let theme = value.trim().to_lowercase();
        if theme.is_empty() {
            continue;
        }
        if theme.chars().count() > MAX_THEME_LEN {
            return Err(SongbookError::invalid(
                "themes",
                format!("each theme must be at most {} characters", MAX_THEME_LEN),
            ));
        }
        if !out.contains(&theme) {
            out.push(theme);
        }
    }
    if out.len() > MAX_THEMES {
        return Err(SongbookError::invalid(
            "themes",
            format!("at most {} themes are allowed", MAX_THEMES),
        ));
    }
    Ok(out)
}

pub fn time_signature(value: Option<&str>) -> SongbookResult<Option<String>> {
    let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    let invalid = || SongbookError::invalid("time_signature", "must look like 4/4 or 6/8");
    let (beats, unit) = v.split_once('/').ok_or_else(invalid)?;
    let beats: u32 = beats.trim().parse().map_err(|_| invalid())?;
    let unit: u32 = unit.trim().parse().map_err(|_| invalid())?;
    if !(1..=32).contains(&beats) || ![1, 2, 4, 8, 16, 32].contains(&unit) {
        return Err(invalid());
    }
    Ok(Some(format!("{}/{}", beats, unit)))
}

pub fn capo(value: Option<u8>) -> SongbookResult<Option<u8>> {
    match value {
        Some(c) if c > MAX_CAPO => Err(SongbookError::invalid(
            "capo",
            format!("must be between 0 and {}", MAX_CAPO),
        )),
        other => Ok(other),
    }
}

pub fn chord_data(value: &str) -> SongbookResult<String> {
    if value.chars().count() > MAX_CHORD_DATA_LEN {
        return Err(SongbookError::invalid(
            "chord_data",
            format!("must be at most {} characters", MAX_CHORD_DATA_LEN),
        ));
    }
    chordpro::parse(value).map_err(|e| SongbookError::invalid("chord_data", e.to_string()))?;
    Ok(value.to_string())
}

pub fn rating(value: u8) -> SongbookResult<u8> {
    if (1..=5).contains(&value) {
        Ok(value)
    } else {
        Err(SongbookError::invalid("rating", "must be between 1 and 5"))
    }
}

pub fn service_date(value: Option<&str>) -> SongbookResult<Option<String>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .map(|d| Some(d.format("%Y-%m-%d").to_string()))
            .map_err(|_| SongbookError::invalid("service_date", "must be a YYYY-MM-DD date")),
        None => Ok(None),
    }
}

/// Arrangement song ids: at least one, no duplicates, order kept.
pub fn song_ids(values: &[String]) -> SongbookResult<Vec<String>> {
    if values.is_empty() {
        return Err(SongbookError::invalid("song_ids", "at least one song is required"));
    }
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for id in values {
        let id = id.trim().to_string();
        if out.contains(&id) {
            return Err(SongbookError::invalid(
                "song_ids",
                format!("song {} is listed twice", id),
            ));
        }
        out.push(id);
    }
    Ok(out)
}

pub fn user_handle(value: &str) -> SongbookResult<String> {
    let len = value.chars().count();
    if !(3..=32).contains(&len) {
        return Err(SongbookError::invalid(
            "user_handle",
            "must be between 3 and 32 characters",
        ));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(SongbookError::invalid(
            "user_handle",
            "may only contain letters, digits, '_' and '-'",
        ));
    }
    Ok(value.to_string())
}

pub fn password(value: &str) -> SongbookResult<()> {
    let len = value.chars().count();
    if len < 8 {
        return Err(SongbookError::invalid(
            "password",
            "must be at least 8 characters",
        ));
    }
    if len > 128 {
        return Err(SongbookError::invalid(
            "password",
            "must be at most 128 characters",
        ));
    }
    Ok(())
}

pub fn new_song(song: NewSong) -> SongbookResult<NewSong> {
    Ok(NewSong {
        title: text("title", &song.title, 1, MAX_TITLE_LEN)?,
        artist: optional_text("artist", song.artist.as_deref(), MAX_TITLE_LEN)?,
        source: optional_text("source", song.source.as_deref(), MAX_TITLE_LEN)?,
        themes: themes(&song.themes)?,
        lyrics: text("lyrics", &song.lyrics, 0, MAX_LYRICS_LEN)?,
        original_key: key("original_key", song.original_key.as_deref())?,
        tempo: tempo(song.tempo)?,
        ccli_number: ccli_number(song.ccli_number.as_deref())?,
        release_year: release_year(song.release_year)?,
    })
}

/// Validates everything except song existence, which needs the store.
pub fn new_arrangement(arrangement: NewArrangement) -> SongbookResult<NewArrangement> {
    Ok(NewArrangement {
        name: text("name", &arrangement.name, 1, MAX_TITLE_LEN)?,
        song_ids: song_ids(&arrangement.song_ids)?,
        key: key("key", arrangement.key.as_deref())?,
        tempo: tempo(arrangement.tempo)?,
        time_signature: time_signature(arrangement.time_signature.as_deref())?,
        capo: capo(arrangement.capo)?,
        chord_data: chord_data(&arrangement.chord_data)?,
        description: optional_text(
            "description",
            arrangement.description.as_deref(),
            MAX_LONG_TEXT_LEN,
        )?,
    })
}

pub fn setlist_entries(entries: Vec<SetlistEntry>) -> SongbookResult<Vec<SetlistEntry>> {
    if entries.len() > MAX_SETLIST_ENTRIES {
        return Err(SongbookError::invalid(
            "entries",
            format!("a setlist holds at most {} entries", MAX_SETLIST_ENTRIES),
        ));
    }
    entries
        .into_iter()
        .map(|e| {
            Ok(SetlistEntry {
                song_id: text("song_id", &e.song_id, 1, 64)?,
                arrangement_id: e
                    .arrangement_id
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty()),
                key: key("key", e.key.as_deref())?,
                notes: optional_text("notes", e.notes.as_deref(), MAX_NOTES_LEN)?,
            })
        })
        .collect()
}

pub fn new_setlist(setlist: NewSetlist) -> SongbookResult<NewSetlist> {
    Ok(NewSetlist {
        name: text("name", &setlist.name, 1, MAX_TITLE_LEN)?,
        description: optional_text(
            "description",
            setlist.description.as_deref(),
            MAX_LONG_TEXT_LEN,
        )?,
        service_date: service_date(setlist.service_date.as_deref())?,
        is_public: setlist.is_public,
        entries: setlist_entries(setlist.entries)?,
    })
}
