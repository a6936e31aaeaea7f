//! SQLite-backed songbook store.

use super::error::{SongbookError, SongbookResult};
use super::models::*;
use super::schema::*;
use super::trait_def::SongbookStore;
use super::validation;
use crate::sqlite_persistence::open_versioned;
use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

const SONG_COLUMNS: &str = "id, title, artist, source, lyrics, original_key, tempo, ccli_number, release_year, created_by, created, updated, views, rating_average, rating_count, setlist_usage_count";
const ARRANGEMENT_COLUMNS: &str = "id, name, key, tempo, time_signature, capo, chord_data, description, created_by, created, updated, views, rating_average, rating_count";
const REVIEW_COLUMNS: &str =
    "id, user_id, target_type, target_id, rating, comment, created, updated";
const SETLIST_COLUMNS: &str =
    "id, user_id, name, description, service_date, is_public, created, updated";

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn round_rating(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn parse_song_row(row: &rusqlite::Row) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get(0)?,
        title: row.get(1)?,
        artist: row.get(2)?,
        source: row.get(3)?,
        themes: vec![],
        lyrics: row.get(4)?,
        original_key: row.get(5)?,
        tempo: row.get(6)?,
        ccli_number: row.get(7)?,
        release_year: row.get(8)?,
        created_by: row.get(9)?,
        created: row.get(10)?,
        updated: row.get(11)?,
        views: row.get::<usize, i64>(12)? as u64,
        rating_average: row.get(13)?,
        rating_count: row.get(14)?,
        setlist_usage_count: row.get(15)?,
    })
}

fn parse_arrangement_row(row: &rusqlite::Row) -> rusqlite::Result<Arrangement> {
    Ok(Arrangement {
        id: row.get(0)?,
        name: row.get(1)?,
        song_ids: vec![],
        key: row.get(2)?,
        tempo: row.get(3)?,
        time_signature: row.get(4)?,
        capo: row.get(5)?,
        chord_data: row.get(6)?,
        description: row.get(7)?,
        created_by: row.get(8)?,
        created: row.get(9)?,
        updated: row.get(10)?,
        views: row.get::<usize, i64>(11)? as u64,
        rating_average: row.get(12)?,
        rating_count: row.get(13)?,
        is_mashup: false,
    })
}

fn parse_review_row(row: &rusqlite::Row) -> rusqlite::Result<Review> {
    let target_type: i32 = row.get(2)?;
    Ok(Review {
        id: row.get(0)?,
        user_id: row.get(1)?,
        target_type: ReviewTargetType::from_int(target_type)
            .ok_or(rusqlite::Error::IntegralValueOutOfRange(2, target_type as i64))?,
        target_id: row.get(3)?,
        rating: row.get(4)?,
        comment: row.get(5)?,
        created: row.get(6)?,
        updated: row.get(7)?,
    })
}

fn parse_setlist_row(row: &rusqlite::Row) -> rusqlite::Result<Setlist> {
    Ok(Setlist {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        service_date: row.get(4)?,
        is_public: row.get(5)?,
        entries: vec![],
        created: row.get(6)?,
        updated: row.get(7)?,
    })
}

fn count(conn: &Connection, sql: &str, params: &[&dyn ToSql]) -> SongbookResult<usize> {
    let n: i64 = conn.query_row(sql, params, |row| row.get(0))?;
    Ok(n as usize)
}

fn exists(conn: &Connection, table: &str, id: &str) -> SongbookResult<bool> {
    Ok(conn
        .query_row(
            &format!("SELECT 1 FROM {} WHERE id = ?1", table),
            params![id],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

// =============================================================================
// Songs
// =============================================================================

fn load_themes(conn: &Connection, song_id: &str) -> SongbookResult<Vec<String>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT theme FROM {} WHERE song_id = ?1 ORDER BY position",
        SONG_THEME_TABLE_V_0.name
    ))?;
    let themes = stmt
        .query_map(params![song_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(themes)
}

fn write_themes(conn: &Connection, song_id: &str, themes: &[String]) -> SongbookResult<()> {
    conn.execute(
        &format!("DELETE FROM {} WHERE song_id = ?1", SONG_THEME_TABLE_V_0.name),
        params![song_id],
    )?;
    for (position, theme) in themes.iter().enumerate() {
        conn.execute(
            &format!(
                "INSERT INTO {} (song_id, position, theme) VALUES (?1, ?2, ?3)",
                SONG_THEME_TABLE_V_0.name
            ),
            params![song_id, position, theme],
        )?;
    }
    Ok(())
}

fn get_song_inner(conn: &Connection, id: &str) -> SongbookResult<Song> {
    let song = conn
        .query_row(
            &format!(
                "SELECT {} FROM {} WHERE id = ?1",
                SONG_COLUMNS, SONG_TABLE_V_0.name
            ),
            params![id],
            parse_song_row,
        )
        .optional()?;
    let mut song = song.ok_or_else(|| SongbookError::not_found("song", id))?;
    song.themes = load_themes(conn, id)?;
    Ok(song)
}

fn index_song(conn: &Connection, song: &Song) -> SongbookResult<()> {
    conn.execute(
        &format!("DELETE FROM {} WHERE song_id = ?1", SONG_SEARCH_TABLE),
        params![song.id],
    )?;
    conn.execute(
        &format!(
            "INSERT INTO {} (song_id, title, artist, lyrics, themes) VALUES (?1, ?2, ?3, ?4, ?5)",
            SONG_SEARCH_TABLE
        ),
        params![
            song.id,
            song.title,
            song.artist.as_deref().unwrap_or(""),
            song.lyrics,
            song.themes.join(" ")
        ],
    )?;
    Ok(())
}

/// Turns free text into an FTS5 query: every word becomes a quoted prefix
/// term, so user input can never be read as FTS5 syntax.
fn build_fts_query(query: &str) -> Option<String> {
    let cleaned: String = query
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let terms: Vec<String> = cleaned
        .split_whitespace()
        .map(|t| format!("\"{}\"*", t))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

// =============================================================================
// Arrangements
// =============================================================================

fn load_arrangement_song_ids(conn: &Connection, id: &str) -> SongbookResult<Vec<String>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT song_id FROM {} WHERE arrangement_id = ?1 ORDER BY position",
        ARRANGEMENT_SONG_TABLE_V_0.name
    ))?;
    let ids = stmt
        .query_map(params![id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

fn get_arrangement_inner(conn: &Connection, id: &str) -> SongbookResult<Arrangement> {
    let arrangement = conn
        .query_row(
            &format!(
                "SELECT {} FROM {} WHERE id = ?1",
                ARRANGEMENT_COLUMNS, ARRANGEMENT_TABLE_V_0.name
            ),
            params![id],
            parse_arrangement_row,
        )
        .optional()?;
    let mut arrangement = arrangement.ok_or_else(|| SongbookError::not_found("arrangement", id))?;
    arrangement.song_ids = load_arrangement_song_ids(conn, id)?;
    arrangement.is_mashup = arrangement.song_ids.len() > 1;
    Ok(arrangement)
}

fn ensure_songs_exist(conn: &Connection, song_ids: &[String]) -> SongbookResult<()> {
    for song_id in song_ids {
        if !exists(conn, SONG_TABLE_V_0.name, song_id)? {
            return Err(SongbookError::invalid(
                "song_ids",
                format!("song {} does not exist", song_id),
            ));
        }
    }
    Ok(())
}

fn write_arrangement_songs(conn: &Connection, id: &str, song_ids: &[String]) -> SongbookResult<()> {
    conn.execute(
        &format!(
            "DELETE FROM {} WHERE arrangement_id = ?1",
            ARRANGEMENT_SONG_TABLE_V_0.name
        ),
        params![id],
    )?;
    for (position, song_id) in song_ids.iter().enumerate() {
        conn.execute(
            &format!(
                "INSERT INTO {} (arrangement_id, song_id, position) VALUES (?1, ?2, ?3)",
                ARRANGEMENT_SONG_TABLE_V_0.name
            ),
            params![id, song_id, position],
        )?;
    }
    Ok(())
}

fn delete_arrangement_inner(conn: &Connection, id: &str) -> SongbookResult<()> {
    conn.execute(
        &format!(
            "DELETE FROM {} WHERE target_type = ?1 AND target_id = ?2",
            REVIEW_TABLE_V_0.name
        ),
        params![ReviewTargetType::Arrangement.to_int(), id],
    )?;
    conn.execute(
        &format!("DELETE FROM {} WHERE id = ?1", ARRANGEMENT_TABLE_V_0.name),
        params![id],
    )?;
    Ok(())
}

// =============================================================================
// Reviews
// =============================================================================

fn target_table(target_type: ReviewTargetType) -> &'static str {
    match target_type {
        ReviewTargetType::Song => SONG_TABLE_V_0.name,
        ReviewTargetType::Arrangement => ARRANGEMENT_TABLE_V_0.name,
    }
}

fn ensure_target_exists(conn: &Connection, target: &ReviewTarget) -> SongbookResult<()> {
    let table = target_table(target.target_type);
    if exists(conn, table, &target.target_id)? {
        Ok(())
    } else {
        Err(SongbookError::not_found(table, &target.target_id))
    }
}

fn recompute_rating(conn: &Connection, target: &ReviewTarget) -> SongbookResult<RatingAggregate> {
    let (average, count): (f64, u32) = conn.query_row(
        &format!(
            "SELECT COALESCE(AVG(rating), 0.0), COUNT(*) FROM {} WHERE target_type = ?1 AND target_id = ?2",
            REVIEW_TABLE_V_0.name
        ),
        params![target.target_type.to_int(), target.target_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    let aggregate = RatingAggregate {
        rating_average: round_rating(average),
        rating_count: count,
    };
    conn.execute(
        &format!(
            "UPDATE {} SET rating_average = ?1, rating_count = ?2 WHERE id = ?3",
            target_table(target.target_type)
        ),
        params![
            aggregate.rating_average,
            aggregate.rating_count,
            target.target_id
        ],
    )?;
    Ok(aggregate)
}

fn get_user_review_inner(
    conn: &Connection,
    user_id: usize,
    target: &ReviewTarget,
) -> SongbookResult<Option<Review>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {} FROM {} WHERE user_id = ?1 AND target_type = ?2 AND target_id = ?3",
                REVIEW_COLUMNS, REVIEW_TABLE_V_0.name
            ),
            params![user_id, target.target_type.to_int(), target.target_id],
            parse_review_row,
        )
        .optional()?)
}

// =============================================================================
// Setlists
// =============================================================================

fn load_entries(conn: &Connection, setlist_id: &str) -> SongbookResult<Vec<SetlistEntry>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT song_id, arrangement_id, key, notes FROM {} WHERE setlist_id = ?1 ORDER BY position",
        SETLIST_ENTRY_TABLE_V_0.name
    ))?;
    let entries = stmt
        .query_map(params![setlist_id], |row| {
            Ok(SetlistEntry {
                song_id: row.get(0)?,
                arrangement_id: row.get(1)?,
                key: row.get(2)?,
                notes: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

fn get_setlist_inner(conn: &Connection, id: &str) -> SongbookResult<Setlist> {
    let setlist = conn
        .query_row(
            &format!(
                "SELECT {} FROM {} WHERE id = ?1",
                SETLIST_COLUMNS, SETLIST_TABLE_V_0.name
            ),
            params![id],
            parse_setlist_row,
        )
        .optional()?;
    let mut setlist = setlist.ok_or_else(|| SongbookError::not_found("setlist", id))?;
    setlist.entries = load_entries(conn, id)?;
    Ok(setlist)
}

fn owned_setlist(conn: &Connection, id: &str, user_id: usize) -> SongbookResult<Setlist> {
    let setlist = get_setlist_inner(conn, id)?;
    if setlist.user_id != user_id {
        return Err(SongbookError::Forbidden);
    }
    Ok(setlist)
}

/// Every entry must point to an existing song, and its arrangement, if any,
/// must include that song.
fn check_entries(conn: &Connection, entries: &[SetlistEntry]) -> SongbookResult<()> {
    for entry in entries {
        if !exists(conn, SONG_TABLE_V_0.name, &entry.song_id)? {
            return Err(SongbookError::invalid(
                "entries",
                format!("song {} does not exist", entry.song_id),
            ));
        }
        if let Some(arrangement_id) = &entry.arrangement_id {
            let includes = count(
                conn,
                &format!(
                    "SELECT COUNT(*) FROM {} WHERE arrangement_id = ?1 AND song_id = ?2",
                    ARRANGEMENT_SONG_TABLE_V_0.name
                ),
                params![arrangement_id, entry.song_id],
            )? > 0;
            if includes {
                continue;
            }
            let reason = if exists(conn, ARRANGEMENT_TABLE_V_0.name, arrangement_id)? {
                format!(
                    "arrangement {} does not include song {}",
                    arrangement_id, entry.song_id
                )
            } else {
                format!("arrangement {} does not exist", arrangement_id)
            };
            return Err(SongbookError::invalid("entries", reason));
        }
    }
    Ok(())
}

fn write_entries(conn: &Connection, setlist_id: &str, entries: &[SetlistEntry]) -> SongbookResult<()> {
    conn.execute(
        &format!(
            "DELETE FROM {} WHERE setlist_id = ?1",
            SETLIST_ENTRY_TABLE_V_0.name
        ),
        params![setlist_id],
    )?;
    for (position, entry) in entries.iter().enumerate() {
        conn.execute(
            &format!(
                "INSERT INTO {} (setlist_id, position, song_id, arrangement_id, key, notes) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                SETLIST_ENTRY_TABLE_V_0.name
            ),
            params![
                setlist_id,
                position,
                entry.song_id,
                entry.arrangement_id,
                entry.key,
                entry.notes
            ],
        )?;
    }
    Ok(())
}

/// Sets each song's usage count to the number of distinct setlists holding it.
fn recompute_usage<'a, I>(conn: &Connection, song_ids: I) -> SongbookResult<()>
where
    I: IntoIterator<Item = &'a String>,
{
    let song_ids: BTreeSet<&String> = song_ids.into_iter().collect();
    for song_id in song_ids {
        conn.execute(
            &format!(
                "UPDATE {} SET setlist_usage_count = (SELECT COUNT(DISTINCT setlist_id) FROM {} WHERE song_id = ?1) WHERE id = ?1",
                SONG_TABLE_V_0.name, SETLIST_ENTRY_TABLE_V_0.name
            ),
            params![song_id],
        )?;
    }
    Ok(())
}

#[derive(Clone)]
pub struct SqliteSongbookStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSongbookStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> anyhow::Result<Self> {
        let conn = open_versioned(db_path, VERSIONED_SCHEMAS)
            .context("Failed to open songbook db")?;
        conn.execute_batch(CREATE_SONG_SEARCH_SQL)
            .context("Failed to create song search index")?;
        let store = SqliteSongbookStore {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.ensure_search_index()?;
        Ok(store)
    }

    /// Rebuilds the search index when it is out of step with the song table.
    fn ensure_search_index(&self) -> anyhow::Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let songs: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", SONG_TABLE_V_0.name),
            [],
            |r| r.get(0),
        )?;
        let indexed: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", SONG_SEARCH_TABLE),
            [],
            |r| r.get(0),
        )?;
        if songs == indexed {
            return Ok(());
        }

        info!(
            "Rebuilding song search index ({} songs, {} indexed)",
            songs, indexed
        );
        let tx = conn.transaction()?;
        tx.execute(&format!("DELETE FROM {}", SONG_SEARCH_TABLE), [])?;
        let ids: Vec<String> = {
            let mut stmt = tx.prepare(&format!("SELECT id FROM {}", SONG_TABLE_V_0.name))?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            ids
        };
        for id in ids {
            let song = get_song_inner(&tx, &id).map_err(anyhow::Error::from)?;
            index_song(&tx, &song).map_err(anyhow::Error::from)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Applies `edit` to the entries of a setlist owned by `user_id`, then
    /// validates, stores and recounts usage.
    fn mutate_entries<F>(&self, id: &str, user_id: usize, edit: F) -> SongbookResult<Setlist>
    where
        F: FnOnce(&mut Vec<SetlistEntry>) -> SongbookResult<()>,
    {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let setlist = owned_setlist(&tx, id, user_id)?;
        let old_entries = setlist.entries.clone();
        let mut entries = setlist.entries;
        edit(&mut entries)?;
        let entries = validation::setlist_entries(entries)?;
        check_entries(&tx, &entries)?;
        write_entries(&tx, id, &entries)?;
        tx.execute(
            &format!("UPDATE {} SET updated = ?1 WHERE id = ?2", SETLIST_TABLE_V_0.name),
            params![now().max(setlist.updated), id],
        )?;
        recompute_usage(
            &tx,
            old_entries
                .iter()
                .chain(entries.iter())
                .map(|e| &e.song_id),
        )?;
        let updated = get_setlist_inner(&tx, id)?;
        tx.commit()?;
        Ok(updated)
    }
}

impl SongbookStore for SqliteSongbookStore {
    fn create_song(&self, user_id: usize, song: NewSong) -> SongbookResult<Song> {
        let song = validation::new_song(song)?;
        let id = new_id();
        let ts = now();

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO {} (id, title, artist, source, lyrics, original_key, tempo, ccli_number, release_year, created_by, created, updated) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
                SONG_TABLE_V_0.name
            ),
            params![
                id,
                song.title,
                song.artist,
                song.source,
                song.lyrics,
                song.original_key,
                song.tempo,
                song.ccli_number,
                song.release_year,
                user_id,
                ts
            ],
        )?;
        write_themes(&tx, &id, &song.themes)?;
        let created = get_song_inner(&tx, &id)?;
        index_song(&tx, &created)?;
        tx.commit()?;
        debug!("Created song {} '{}'", created.id, created.title);
        Ok(created)
    }

    fn get_song(&self, id: &str) -> SongbookResult<Song> {
        let conn = self.conn.lock().unwrap();
        get_song_inner(&conn, id)
    }

    fn update_song(
        &self,
        id: &str,
        ctx: &UserContext,
        update: SongUpdate,
    ) -> SongbookResult<Song> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let existing = get_song_inner(&tx, id)?;
        if !ctx.can_edit(existing.created_by) {
            return Err(SongbookError::Forbidden);
        }

        let merged = validation::new_song(NewSong {
            title: update.title.unwrap_or(existing.title),
            artist: update.artist.unwrap_or(existing.artist),
            source: update.source.unwrap_or(existing.source),
            themes: update.themes.unwrap_or(existing.themes),
            lyrics: update.lyrics.unwrap_or(existing.lyrics),
            original_key: update.original_key.unwrap_or(existing.original_key),
            tempo: update.tempo.unwrap_or(existing.tempo),
            ccli_number: update.ccli_number.unwrap_or(existing.ccli_number),
            release_year: update.release_year.unwrap_or(existing.release_year),
        })?;

        tx.execute(
            &format!(
                "UPDATE {} SET title = ?1, artist = ?2, source = ?3, lyrics = ?4, original_key = ?5, tempo = ?6, ccli_number = ?7, release_year = ?8, updated = ?9 WHERE id = ?10",
                SONG_TABLE_V_0.name
            ),
            params![
                merged.title,
                merged.artist,
                merged.source,
                merged.lyrics,
                merged.original_key,
                merged.tempo,
                merged.ccli_number,
                merged.release_year,
                now().max(existing.updated),
                id
            ],
        )?;
        write_themes(&tx, id, &merged.themes)?;
        let updated = get_song_inner(&tx, id)?;
        index_song(&tx, &updated)?;
        tx.commit()?;
        debug!("Updated song {}", id);
        Ok(updated)
    }

    fn delete_song(&self, id: &str, ctx: &UserContext) -> SongbookResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let existing = get_song_inner(&tx, id)?;
        if !ctx.can_edit(existing.created_by) {
            return Err(SongbookError::Forbidden);
        }

        tx.execute(
            &format!(
                "UPDATE {} SET updated = ?1 WHERE id IN (SELECT setlist_id FROM {} WHERE song_id = ?2)",
                SETLIST_TABLE_V_0.name, SETLIST_ENTRY_TABLE_V_0.name
            ),
            params![now(), id],
        )?;
        tx.execute(
            &format!(
                "DELETE FROM {} WHERE target_type = ?1 AND target_id = ?2",
                REVIEW_TABLE_V_0.name
            ),
            params![ReviewTargetType::Song.to_int(), id],
        )?;
        // themes, verses, comments, arrangement links and setlist entries cascade
        tx.execute(
            &format!("DELETE FROM {} WHERE id = ?1", SONG_TABLE_V_0.name),
            params![id],
        )?;
        tx.execute(
            &format!("DELETE FROM {} WHERE song_id = ?1", SONG_SEARCH_TABLE),
            params![id],
        )?;

        let orphans: Vec<String> = {
            let mut stmt = tx.prepare(&format!(
                "SELECT id FROM {} WHERE id NOT IN (SELECT arrangement_id FROM {})",
                ARRANGEMENT_TABLE_V_0.name, ARRANGEMENT_SONG_TABLE_V_0.name
            ))?;
            let orphans = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            orphans
        };
        for arrangement_id in &orphans {
            delete_arrangement_inner(&tx, arrangement_id)?;
        }

        tx.commit()?;
        info!(
            "Deleted song {} and {} arrangements left without songs",
            id,
            orphans.len()
        );
        Ok(())
    }

    fn list_songs(&self, query: &SongQuery) -> SongbookResult<Page<Song>> {
        let page = PageRequest::new(query.page, query.limit);

        let mut clauses: Vec<String> = vec![];
        let mut filter_params: Vec<Box<dyn ToSql>> = vec![];
        if let Some(theme) = query
            .theme
            .as_deref()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
        {
            clauses.push(format!(
                "id IN (SELECT song_id FROM {} WHERE theme = ?)",
                SONG_THEME_TABLE_V_0.name
            ));
            filter_params.push(Box::new(theme));
        }
        if let Some(artist) = query
            .artist
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
        {
            clauses.push("artist LIKE ?".to_string());
            filter_params.push(Box::new(format!("%{}%", artist)));
        }
        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let order_sql = match query.sort {
            SongSort::Title => "title COLLATE NOCASE ASC, id ASC",
            SongSort::Newest => "created DESC, rowid DESC",
            SongSort::Views => "views DESC, title COLLATE NOCASE ASC",
            SongSort::Rating => "rating_average DESC, rating_count DESC, title COLLATE NOCASE ASC",
        };

        let conn = self.conn.lock().unwrap();
        let param_refs: Vec<&dyn ToSql> = filter_params.iter().map(|p| p.as_ref()).collect();
        let total = count(
            &conn,
            &format!("SELECT COUNT(*) FROM {}{}", SONG_TABLE_V_0.name, where_sql),
            &param_refs,
        )?;

        let limit = page.limit as i64;
        let offset = page.sql_offset();
        let mut page_params = param_refs.clone();
        page_params.push(&limit);
        page_params.push(&offset);
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {}{} ORDER BY {} LIMIT ? OFFSET ?",
            SONG_COLUMNS, SONG_TABLE_V_0.name, where_sql, order_sql
        ))?;
        let mut songs = stmt
            .query_map(page_params.as_slice(), parse_song_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for song in songs.iter_mut() {
            song.themes = load_themes(&conn, &song.id)?;
        }

        Ok(Page {
            items: songs,
            page: page.page,
            limit: page.limit,
            total,
        })
    }

    fn search_songs(&self, query: &str, limit: usize) -> SongbookResult<Vec<Song>> {
        let fts_query = build_fts_query(query)
            .ok_or_else(|| SongbookError::invalid("q", "search query must not be empty"))?;
        let limit = limit.clamp(1, MAX_PAGE_LIMIT);

        let conn = self.conn.lock().unwrap();
        let ids: Vec<String> = {
            let mut stmt = conn.prepare(&format!(
                "SELECT song_id FROM {0} WHERE {0} MATCH ?1 ORDER BY bm25({0}) LIMIT ?2",
                SONG_SEARCH_TABLE
            ))?;
            let ids = stmt
                .query_map(params![fts_query, limit], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            ids
        };
        debug!("Search '{}' matched {} songs", query, ids.len());
        ids.iter().map(|id| get_song_inner(&conn, id)).collect()
    }

    fn increment_song_views(&self, id: &str) -> SongbookResult<u64> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            &format!(
                "UPDATE {} SET views = views + 1 WHERE id = ?1",
                SONG_TABLE_V_0.name
            ),
            params![id],
        )?;
        if updated == 0 {
            return Err(SongbookError::not_found("song", id));
        }
        let views: i64 = conn.query_row(
            &format!("SELECT views FROM {} WHERE id = ?1", SONG_TABLE_V_0.name),
            params![id],
            |row| row.get(0),
        )?;
        Ok(views as u64)
    }

    fn get_song_summaries(&self) -> SongbookResult<Vec<SongSummary>> {
        let conn = self.conn.lock().unwrap();

        let mut themes: HashMap<String, Vec<String>> = HashMap::new();
        {
            let mut stmt = conn.prepare(&format!(
                "SELECT song_id, theme FROM {} ORDER BY song_id, position",
                SONG_THEME_TABLE_V_0.name
            ))?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<usize, String>(0)?, row.get::<usize, String>(1)?))
            })?;
            for row in rows {
                let (song_id, theme) = row?;
                themes.entry(song_id).or_default().push(theme);
            }
        }

        let mut stmt = conn.prepare(&format!(
            "SELECT id, title, artist, source, views, rating_average, rating_count, created FROM {}",
            SONG_TABLE_V_0.name
        ))?;
        let summaries = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                Ok(SongSummary {
                    themes: themes.get(&id).cloned().unwrap_or_default(),
                    id,
                    title: row.get(1)?,
                    artist: row.get(2)?,
                    source: row.get(3)?,
                    views: row.get::<usize, i64>(4)? as u64,
                    rating_average: row.get(5)?,
                    rating_count: row.get(6)?,
                    created: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(summaries)
    }

    fn count_songs(&self) -> SongbookResult<usize> {
        let conn = self.conn.lock().unwrap();
        count(
            &conn,
            &format!("SELECT COUNT(*) FROM {}", SONG_TABLE_V_0.name),
            params![],
        )
    }

    fn create_arrangement(
        &self,
        user_id: usize,
        arrangement: NewArrangement,
    ) -> SongbookResult<Arrangement> {
        let arrangement = validation::new_arrangement(arrangement)?;
        let id = new_id();
        let ts = now();

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        ensure_songs_exist(&tx, &arrangement.song_ids)?;
        tx.execute(
            &format!(
                "INSERT INTO {} (id, name, key, tempo, time_signature, capo, chord_data, description, created_by, created, updated) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
                ARRANGEMENT_TABLE_V_0.name
            ),
            params![
                id,
                arrangement.name,
                arrangement.key,
                arrangement.tempo,
                arrangement.time_signature,
                arrangement.capo,
                arrangement.chord_data,
                arrangement.description,
                user_id,
                ts
            ],
        )?;
        write_arrangement_songs(&tx, &id, &arrangement.song_ids)?;
        let created = get_arrangement_inner(&tx, &id)?;
        tx.commit()?;
        debug!(
            "Created arrangement {} for songs {:?}",
            created.id, created.song_ids
        );
        Ok(created)
    }

    fn get_arrangement(&self, id: &str) -> SongbookResult<Arrangement> {
        let conn = self.conn.lock().unwrap();
        get_arrangement_inner(&conn, id)
    }

    fn list_song_arrangements(&self, song_id: &str) -> SongbookResult<Vec<Arrangement>> {
        let conn = self.conn.lock().unwrap();
        if !exists(&conn, SONG_TABLE_V_0.name, song_id)? {
            return Err(SongbookError::not_found("song", song_id));
        }
        let ids: Vec<String> = {
            let mut stmt = conn.prepare(&format!(
                "SELECT a.id FROM {} a JOIN {} s ON s.arrangement_id = a.id WHERE s.song_id = ?1 ORDER BY a.created, a.rowid",
                ARRANGEMENT_TABLE_V_0.name, ARRANGEMENT_SONG_TABLE_V_0.name
            ))?;
            let ids = stmt
                .query_map(params![song_id], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            ids
        };
        ids.iter().map(|id| get_arrangement_inner(&conn, id)).collect()
    }

    fn update_arrangement(
        &self,
        id: &str,
        ctx: &UserContext,
        update: ArrangementUpdate,
    ) -> SongbookResult<Arrangement> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let existing = get_arrangement_inner(&tx, id)?;
        if !ctx.can_edit(existing.created_by) {
            return Err(SongbookError::Forbidden);
        }

        let songs_changed = update.song_ids.is_some();
        let merged = validation::new_arrangement(NewArrangement {
            name: update.name.unwrap_or(existing.name),
            song_ids: update.song_ids.unwrap_or(existing.song_ids),
            key: update.key.unwrap_or(existing.key),
            tempo: update.tempo.unwrap_or(existing.tempo),
            time_signature: update.time_signature.unwrap_or(existing.time_signature),
            capo: update.capo.unwrap_or(existing.capo),
            chord_data: update.chord_data.unwrap_or(existing.chord_data),
            description: update.description.unwrap_or(existing.description),
        })?;

        tx.execute(
            &format!(
                "UPDATE {} SET name = ?1, key = ?2, tempo = ?3, time_signature = ?4, capo = ?5, chord_data = ?6, description = ?7, updated = ?8 WHERE id = ?9",
                ARRANGEMENT_TABLE_V_0.name
            ),
            params![
                merged.name,
                merged.key,
                merged.tempo,
                merged.time_signature,
                merged.capo,
                merged.chord_data,
                merged.description,
                now().max(existing.updated),
                id
            ],
        )?;
        if songs_changed {
            ensure_songs_exist(&tx, &merged.song_ids)?;
            write_arrangement_songs(&tx, id, &merged.song_ids)?;
            // setlist entries must keep pointing at arrangements of their song
            tx.execute(
                &format!(
                    "UPDATE {0} SET arrangement_id = NULL WHERE arrangement_id = ?1 AND song_id NOT IN (SELECT song_id FROM {1} WHERE arrangement_id = ?1)",
                    SETLIST_ENTRY_TABLE_V_0.name, ARRANGEMENT_SONG_TABLE_V_0.name
                ),
                params![id],
            )?;
        }
        let updated = get_arrangement_inner(&tx, id)?;
        tx.commit()?;
        debug!("Updated arrangement {}", id);
        Ok(updated)
    }

    fn delete_arrangement(&self, id: &str, ctx: &UserContext) -> SongbookResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let existing = get_arrangement_inner(&tx, id)?;
        if !ctx.can_edit(existing.created_by) {
            return Err(SongbookError::Forbidden);
        }
        delete_arrangement_inner(&tx, id)?;
        tx.commit()?;
        info!("Deleted arrangement {}", id);
        Ok(())
    }

    fn increment_arrangement_views(&self, id: &str) -> SongbookResult<u64> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            &format!(
                "UPDATE {} SET views = views + 1 WHERE id = ?1",
                ARRANGEMENT_TABLE_V_0.name
            ),
            params![id],
        )?;
        if updated == 0 {
            return Err(SongbookError::not_found("arrangement", id));
        }
        let views: i64 = conn.query_row(
            &format!(
                "SELECT views FROM {} WHERE id = ?1",
                ARRANGEMENT_TABLE_V_0.name
            ),
            params![id],
            |row| row.get(0),
        )?;
        Ok(views as u64)
    }

    fn count_arrangements(&self) -> SongbookResult<usize> {
        let conn = self.conn.lock().unwrap();
        count(
            &conn,
            &format!("SELECT COUNT(*) FROM {}", ARRANGEMENT_TABLE_V_0.name),
            params![],
        )
    }

    fn upsert_review(
        &self,
        user_id: usize,
        target: &ReviewTarget,
        review: NewReview,
    ) -> SongbookResult<Review> {
        let rating = validation::rating(review.rating)?;
        let comment = validation::optional_text(
            "comment",
            review.comment.as_deref(),
            validation::MAX_LONG_TEXT_LEN,
        )?;
        let ts = now();

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        ensure_target_exists(&tx, target)?;
        match get_user_review_inner(&tx, user_id, target)? {
            Some(existing) => {
                tx.execute(
                    &format!(
                        "UPDATE {} SET rating = ?1, comment = ?2, updated = ?3 WHERE id = ?4",
                        REVIEW_TABLE_V_0.name
                    ),
                    params![rating, comment, ts.max(existing.updated), existing.id],
                )?;
            }
            None => {
                tx.execute(
                    &format!(
                        "INSERT INTO {} (id, user_id, target_type, target_id, rating, comment, created, updated) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                        REVIEW_TABLE_V_0.name
                    ),
                    params![
                        new_id(),
                        user_id,
                        target.target_type.to_int(),
                        target.target_id,
                        rating,
                        comment,
                        ts
                    ],
                )?;
            }
        }
        let aggregate = recompute_rating(&tx, target)?;
        let stored = get_user_review_inner(&tx, user_id, target)?
            .ok_or_else(|| SongbookError::not_found("review", &target.target_id))?;
        tx.commit()?;
        debug!(
            "User {} rated {} {}, now {:.2} over {} reviews",
            user_id, target.target_id, rating, aggregate.rating_average, aggregate.rating_count
        );
        Ok(stored)
    }

    fn delete_review(&self, user_id: usize, target: &ReviewTarget) -> SongbookResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let deleted = tx.execute(
            &format!(
                "DELETE FROM {} WHERE user_id = ?1 AND target_type = ?2 AND target_id = ?3",
                REVIEW_TABLE_V_0.name
            ),
            params![user_id, target.target_type.to_int(), target.target_id],
        )?;
        if deleted == 0 {
            return Err(SongbookError::not_found("review of", &target.target_id));
        }
        recompute_rating(&tx, target)?;
        tx.commit()?;
        Ok(())
    }

    fn list_reviews(&self, target: &ReviewTarget) -> SongbookResult<Vec<Review>> {
        let conn = self.conn.lock().unwrap();
        ensure_target_exists(&conn, target)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} WHERE target_type = ?1 AND target_id = ?2 ORDER BY updated DESC, rowid DESC",
            REVIEW_COLUMNS, REVIEW_TABLE_V_0.name
        ))?;
        let reviews = stmt
            .query_map(
                params![target.target_type.to_int(), target.target_id],
                parse_review_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reviews)
    }

    fn get_user_review(
        &self,
        user_id: usize,
        target: &ReviewTarget,
    ) -> SongbookResult<Option<Review>> {
        let conn = self.conn.lock().unwrap();
        get_user_review_inner(&conn, user_id, target)
    }

    fn add_verse(&self, song_id: &str, user_id: usize, verse: NewVerse) -> SongbookResult<Verse> {
        let reference = validation::text(
            "reference",
            &verse.reference,
            1,
            validation::MAX_REFERENCE_LEN,
        )?;
        let text = validation::text("text", &verse.text, 0, validation::MAX_LONG_TEXT_LEN)?;

        let conn = self.conn.lock().unwrap();
        if !exists(&conn, SONG_TABLE_V_0.name, song_id)? {
            return Err(SongbookError::not_found("song", song_id));
        }
        let verse = Verse {
            id: new_id(),
            song_id: song_id.to_string(),
            user_id,
            reference,
            text,
            created: now(),
        };
        conn.execute(
            &format!(
                "INSERT INTO {} (id, song_id, user_id, reference, text, created) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                VERSE_TABLE_V_0.name
            ),
            params![
                verse.id,
                verse.song_id,
                verse.user_id,
                verse.reference,
                verse.text,
                verse.created
            ],
        )?;
        Ok(verse)
    }

    fn list_verses(&self, song_id: &str) -> SongbookResult<Vec<Verse>> {
        let conn = self.conn.lock().unwrap();
        if !exists(&conn, SONG_TABLE_V_0.name, song_id)? {
            return Err(SongbookError::not_found("song", song_id));
        }
        let mut stmt = conn.prepare(&format!(
            "SELECT id, song_id, user_id, reference, text, created FROM {} WHERE song_id = ?1 ORDER BY created DESC, rowid DESC",
            VERSE_TABLE_V_0.name
        ))?;
        let verses = stmt
            .query_map(params![song_id], |row| {
                Ok(Verse {
                    id: row.get(0)?,
                    song_id: row.get(1)?,
                    user_id: row.get(2)?,
                    reference: row.get(3)?,
                    text: row.get(4)?,
                    created: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(verses)
    }

    fn delete_verse(
        &self,
        song_id: &str,
        verse_id: &str,
        ctx: &UserContext,
    ) -> SongbookResult<()> {
        let conn = self.conn.lock().unwrap();
        let owner: Option<usize> = conn
            .query_row(
                &format!(
                    "SELECT user_id FROM {} WHERE id = ?1 AND song_id = ?2",
                    VERSE_TABLE_V_0.name
                ),
                params![verse_id, song_id],
                |row| row.get(0),
            )
            .optional()?;
        let owner = owner.ok_or_else(|| SongbookError::not_found("verse", verse_id))?;
        if !ctx.can_edit(owner) {
            return Err(SongbookError::Forbidden);
        }
        conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", VERSE_TABLE_V_0.name),
            params![verse_id],
        )?;
        Ok(())
    }

    fn add_comment(
        &self,
        song_id: &str,
        user_id: usize,
        comment: NewComment,
    ) -> SongbookResult<Comment> {
        let body = validation::text("body", &comment.body, 1, validation::MAX_LONG_TEXT_LEN)?;

        let conn = self.conn.lock().unwrap();
        if !exists(&conn, SONG_TABLE_V_0.name, song_id)? {
            return Err(SongbookError::not_found("song", song_id));
        }
        let comment = Comment {
            id: new_id(),
            song_id: song_id.to_string(),
            user_id,
            user_handle: None,
            body,
            created: now(),
        };
        conn.execute(
            &format!(
                "INSERT INTO {} (id, song_id, user_id, body, created) VALUES (?1, ?2, ?3, ?4, ?5)",
                COMMENT_TABLE_V_0.name
            ),
            params![
                comment.id,
                comment.song_id,
                comment.user_id,
                comment.body,
                comment.created
            ],
        )?;
        Ok(comment)
    }

    fn list_comments(&self, song_id: &str) -> SongbookResult<Vec<Comment>> {
        let conn = self.conn.lock().unwrap();
        if !exists(&conn, SONG_TABLE_V_0.name, song_id)? {
            return Err(SongbookError::not_found("song", song_id));
        }
        let mut stmt = conn.prepare(&format!(
            "SELECT id, song_id, user_id, body, created FROM {} WHERE song_id = ?1 ORDER BY created ASC, rowid ASC",
            COMMENT_TABLE_V_0.name
        ))?;
        let comments = stmt
            .query_map(params![song_id], |row| {
                Ok(Comment {
                    id: row.get(0)?,
                    song_id: row.get(1)?,
                    user_id: row.get(2)?,
                    user_handle: None,
                    body: row.get(3)?,
                    created: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    fn delete_comment(
        &self,
        song_id: &str,
        comment_id: &str,
        ctx: &UserContext,
    ) -> SongbookResult<()> {
        let conn = self.conn.lock().unwrap();
        let owner: Option<usize> = conn
            .query_row(
                &format!(
                    "SELECT user_id FROM {} WHERE id = ?1 AND song_id = ?2",
                    COMMENT_TABLE_V_0.name
                ),
                params![comment_id, song_id],
                |row| row.get(0),
            )
            .optional()?;
        let owner = owner.ok_or_else(|| SongbookError::not_found("comment", comment_id))?;
        if !ctx.can_edit(owner) {
            return Err(SongbookError::Forbidden);
        }
        conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", COMMENT_TABLE_V_0.name),
            params![comment_id],
        )?;
        Ok(())
    }

    fn create_setlist(&self, user_id: usize, setlist: NewSetlist) -> SongbookResult<Setlist> {
        let setlist = validation::new_setlist(setlist)?;
        let id = new_id();
        let ts = now();

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        check_entries(&tx, &setlist.entries)?;
        tx.execute(
            &format!(
                "INSERT INTO {} (id, user_id, name, description, service_date, is_public, created, updated) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                SETLIST_TABLE_V_0.name
            ),
            params![
                id,
                user_id,
                setlist.name,
                setlist.description,
                setlist.service_date,
                setlist.is_public,
                ts
            ],
        )?;
        write_entries(&tx, &id, &setlist.entries)?;
        recompute_usage(&tx, setlist.entries.iter().map(|e| &e.song_id))?;
        let created = get_setlist_inner(&tx, &id)?;
        tx.commit()?;
        debug!(
            "User {} created setlist {} with {} entries",
            user_id,
            id,
            created.entries.len()
        );
        Ok(created)
    }

    fn get_setlist(&self, id: &str, viewer: Option<usize>) -> SongbookResult<Setlist> {
        let conn = self.conn.lock().unwrap();
        let setlist = get_setlist_inner(&conn, id)?;
        if !setlist.is_public && viewer != Some(setlist.user_id) {
            return Err(SongbookError::not_found("setlist", id));
        }
        Ok(setlist)
    }

    fn list_user_setlists(&self, user_id: usize) -> SongbookResult<Vec<Setlist>> {
        let conn = self.conn.lock().unwrap();
        let ids: Vec<String> = {
            let mut stmt = conn.prepare(&format!(
                "SELECT id FROM {} WHERE user_id = ?1 ORDER BY created DESC, rowid DESC",
                SETLIST_TABLE_V_0.name
            ))?;
            let ids = stmt
                .query_map(params![user_id], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            ids
        };
        ids.iter().map(|id| get_setlist_inner(&conn, id)).collect()
    }

    fn update_setlist(
        &self,
        id: &str,
        user_id: usize,
        update: SetlistUpdate,
    ) -> SongbookResult<Setlist> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let existing = owned_setlist(&tx, id, user_id)?;
        let old_entries = existing.entries.clone();
        let entries_changed = update.entries.is_some();

        let merged = validation::new_setlist(NewSetlist {
            name: update.name.unwrap_or(existing.name),
            description: update.description.unwrap_or(existing.description),
            service_date: update.service_date.unwrap_or(existing.service_date),
            is_public: update.is_public.unwrap_or(existing.is_public),
            entries: update.entries.unwrap_or(existing.entries),
        })?;

        tx.execute(
            &format!(
                "UPDATE {} SET name = ?1, description = ?2, service_date = ?3, is_public = ?4, updated = ?5 WHERE id = ?6",
                SETLIST_TABLE_V_0.name
            ),
            params![
                merged.name,
                merged.description,
                merged.service_date,
                merged.is_public,
                now().max(existing.updated),
                id
            ],
        )?;
        if entries_changed {
            check_entries(&tx, &merged.entries)?;
            write_entries(&tx, id, &merged.entries)?;
            recompute_usage(
                &tx,
                old_entries
                    .iter()
                    .chain(merged.entries.iter())
                    .map(|e| &e.song_id),
            )?;
        }
        let updated = get_setlist_inner(&tx, id)?;
        tx.commit()?;
        Ok(updated)
    }

    fn add_setlist_entries(
        &self,
        id: &str,
        user_id: usize,
        new_entries: Vec<SetlistEntry>,
    ) -> SongbookResult<Setlist> {
        if new_entries.is_empty() {
            return Err(SongbookError::invalid("entries", "nothing to add"));
        }
        self.mutate_entries(id, user_id, |entries| {
            entries.extend(new_entries);
            Ok(())
        })
    }

    fn remove_setlist_entries(
        &self,
        id: &str,
        user_id: usize,
        positions: Vec<usize>,
    ) -> SongbookResult<Setlist> {
        self.mutate_entries(id, user_id, |entries| {
            if let Some(bad) = positions.iter().find(|p| **p >= entries.len()) {
                return Err(SongbookError::invalid(
                    "positions",
                    format!("position {} is out of range", bad),
                ));
            }
            let remove: BTreeSet<usize> = positions.into_iter().collect();
            let mut index = 0;
            entries.retain(|_| {
                let keep = !remove.contains(&index);
                index += 1;
                keep
            });
            Ok(())
        })
    }

    fn move_setlist_entry(
        &self,
        id: &str,
        user_id: usize,
        from: usize,
        to: usize,
    ) -> SongbookResult<Setlist> {
        self.mutate_entries(id, user_id, |entries| {
            if from >= entries.len() || to >= entries.len() {
                return Err(SongbookError::invalid(
                    "positions",
                    format!(
                        "positions must be below {}, got from={} to={}",
                        entries.len(),
                        from,
                        to
                    ),
                ));
            }
            let entry = entries.remove(from);
            entries.insert(to, entry);
            Ok(())
        })
    }

    fn delete_setlist(&self, id: &str, user_id: usize) -> SongbookResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let existing = owned_setlist(&tx, id, user_id)?;
        tx.execute(
            &format!("DELETE FROM {} WHERE id = ?1", SETLIST_TABLE_V_0.name),
            params![id],
        )?;
        recompute_usage(&tx, existing.entries.iter().map(|e| &e.song_id))?;
        tx.commit()?;
        info!("User {} deleted setlist {}", user_id, id);
        Ok(())
    }

    fn count_setlists(&self) -> SongbookResult<usize> {
        let conn = self.conn.lock().unwrap();
        count(
            &conn,
            &format!("SELECT COUNT(*) FROM {}", SETLIST_TABLE_V_0.name),
            params![],
        )
    }

    fn count_user_content(&self, user_id: usize) -> SongbookResult<ContentCounts> {
        let conn = self.conn.lock().unwrap();
        let by_user = |table: &str, column: &str| -> SongbookResult<usize> {
            count(
                &conn,
                &format!("SELECT COUNT(*) FROM {} WHERE {} = ?1", table, column),
                params![user_id],
            )
        };
        Ok(ContentCounts {
            songs: by_user(SONG_TABLE_V_0.name, "created_by")?,
            arrangements: by_user(ARRANGEMENT_TABLE_V_0.name, "created_by")?,
            setlists: by_user(SETLIST_TABLE_V_0.name, "user_id")?,
            public_setlists: count(
                &conn,
                &format!(
                    "SELECT COUNT(*) FROM {} WHERE user_id = ?1 AND is_public = 1",
                    SETLIST_TABLE_V_0.name
                ),
                params![user_id],
            )?,
            reviews: by_user(REVIEW_TABLE_V_0.name, "user_id")?,
            verses: by_user(VERSE_TABLE_V_0.name, "user_id")?,
            comments: by_user(COMMENT_TABLE_V_0.name, "user_id")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const OWNER: UserContext = UserContext {
        user_id: 1,
        can_moderate: false,
    };
    const OTHER: UserContext = UserContext {
        user_id: 2,
        can_moderate: false,
    };
    const MODERATOR: UserContext = UserContext {
        user_id: 3,
        can_moderate: true,
    };

    fn create_tmp_store() -> (SqliteSongbookStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteSongbookStore::new(temp_dir.path().join("songbook.db")).unwrap();
        (store, temp_dir)
    }

    fn song(title: &str, themes: &[&str]) -> NewSong {
        NewSong {
            title: title.to_string(),
            themes: themes.iter().map(|t| t.to_string()).collect(),
            lyrics: format!("{} lyrics", title),
            ..Default::default()
        }
    }

    fn arrangement<S: AsRef<str>>(name: &str, song_ids: &[S]) -> NewArrangement {
        NewArrangement {
            name: name.to_string(),
            song_ids: song_ids.iter().map(|s| s.as_ref().to_string()).collect(),
            chord_data: "{key: G}\n[G]Praise [C]him".to_string(),
            ..Default::default()
        }
    }

    fn entry(song_id: &str) -> SetlistEntry {
        SetlistEntry {
            song_id: song_id.to_string(),
            arrangement_id: None,
            key: None,
            notes: None,
        }
    }

    #[test]
    fn creates_and_reads_song() {
        let (store, _dir) = create_tmp_store();
        let created = store
            .create_song(
                1,
                NewSong {
                    title: "  Be Thou My Vision ".to_string(),
                    artist: Some("Traditional".to_string()),
                    themes: vec!["Devotion".to_string(), "devotion".to_string()],
                    original_key: Some("Eb".to_string()),
                    tempo: Some(76),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(created.title, "Be Thou My Vision");
        assert_eq!(created.themes, vec!["devotion"]);
        assert_eq!(created.rating_average, 0.0);
        assert_eq!(created.created, created.updated);

        let loaded = store.get_song(&created.id).unwrap();
        assert_eq!(loaded, created);
        assert!(matches!(
            store.get_song("missing"),
            Err(SongbookError::NotFound(_))
        ));
    }

    #[test]
    fn invalid_song_is_rejected() {
        let (store, _dir) = create_tmp_store();
        let err = store
            .create_song(
                1,
                NewSong {
                    title: "Ok".to_string(),
                    tempo: Some(5),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, SongbookError::Invalid { field: "tempo", .. }));
        assert_eq!(store.count_songs().unwrap(), 0);
    }

    #[test]
    fn only_owner_or_moderator_can_edit_song() {
        let (store, _dir) = create_tmp_store();
        let s = store.create_song(OWNER.user_id, song("Holy", &[])).unwrap();

        let update = SongUpdate {
            title: Some("Holy Holy".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            store.update_song(&s.id, &OTHER, update.clone()),
            Err(SongbookError::Forbidden)
        ));
        let updated = store.update_song(&s.id, &OWNER, update).unwrap();
        assert_eq!(updated.title, "Holy Holy");
        assert!(updated.updated >= s.updated);

        let cleared = store
            .update_song(
                &s.id,
                &MODERATOR,
                SongUpdate {
                    artist: Some(Some("".to_string())),
                    themes: Some(vec!["Worship".to_string()]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(cleared.artist, None);
        assert_eq!(cleared.themes, vec!["worship"]);

        assert!(matches!(
            store.delete_song(&s.id, &OTHER),
            Err(SongbookError::Forbidden)
        ));
        store.delete_song(&s.id, &MODERATOR).unwrap();
        assert!(store.get_song(&s.id).is_err());
    }

    #[test]
    fn lists_with_filters_sort_and_pages() {
        let (store, _dir) = create_tmp_store();
        let a = store.create_song(1, song("Abide With Me", &["prayer"])).unwrap();
        let b = store
            .create_song(
                1,
                NewSong {
                    artist: Some("Chris Tomlin".to_string()),
                    ..song("Build My Life", &["worship"])
                },
            )
            .unwrap();
        let c = store.create_song(1, song("Come Thou Fount", &["worship", "grace"])).unwrap();
        store.increment_song_views(&c.id).unwrap();
        store.increment_song_views(&c.id).unwrap();
        store.increment_song_views(&a.id).unwrap();

        let all = store.list_songs(&SongQuery::default()).unwrap();
        let titles: Vec<&str> = all.items.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Abide With Me", "Build My Life", "Come Thou Fount"]);
        assert_eq!(all.total, 3);

        let worship = store
            .list_songs(&SongQuery {
                theme: Some("Worship".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(worship.total, 2);

        let tomlin = store
            .list_songs(&SongQuery {
                artist: Some("tomlin".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(tomlin.items.len(), 1);
        assert_eq!(tomlin.items[0].id, b.id);

        let by_views = store
            .list_songs(&SongQuery {
                sort: SongSort::Views,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_views.items[0].id, c.id);
        assert_eq!(by_views.items[0].views, 2);

        let second_page = store
            .list_songs(&SongQuery {
                page: Some(2),
                limit: Some(2),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(second_page.items.len(), 1);
        assert_eq!(second_page.items[0].id, c.id);
        assert_eq!(second_page.total, 3);

        let far_page = store
            .list_songs(&SongQuery {
                page: Some(usize::MAX),
                ..Default::default()
            })
            .unwrap();
        assert!(far_page.items.is_empty());
        assert_eq!(far_page.total, 3);
    }

    #[test]
    fn search_ranks_and_tracks_changes() {
        let (store, _dir) = create_tmp_store();
        let grace = store
            .create_song(
                1,
                NewSong {
                    lyrics: "how sweet the sound".to_string(),
                    ..song("Amazing Grace", &["grace"])
                },
            )
            .unwrap();
        let other = store
            .create_song(
                1,
                NewSong {
                    lyrics: "grace upon grace".to_string(),
                    ..song("Only Jesus", &[])
                },
            )
            .unwrap();

        let results = store.search_songs("amazing", 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, grace.id);

        let results = store.search_songs("grac", 10).unwrap();
        assert_eq!(results.len(), 2);

        assert!(matches!(
            store.search_songs("  \"*  ", 10),
            Err(SongbookError::Invalid { field: "q", .. })
        ));

        store.delete_song(&other.id, &OWNER).unwrap();
        assert_eq!(store.search_songs("grace", 10).unwrap().len(), 1);

        store
            .update_song(
                &grace.id,
                &OWNER,
                SongUpdate {
                    title: Some("Wonderful Grace".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(store.search_songs("amazing", 10).unwrap().is_empty());
        assert_eq!(store.search_songs("wonderful", 10).unwrap().len(), 1);
    }

    #[test]
    fn search_index_is_rebuilt_on_open() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("songbook.db");
        {
            let store = SqliteSongbookStore::new(&path).unwrap();
            store.create_song(1, song("Nearer My God", &[])).unwrap();
            let conn = store.conn.lock().unwrap();
            conn.execute("DELETE FROM song_search", []).unwrap();
        }
        let store = SqliteSongbookStore::new(&path).unwrap();
        assert_eq!(store.search_songs("nearer", 5).unwrap().len(), 1);
    }

    #[test]
    fn views_increment() {
        let (store, _dir) = create_tmp_store();
        let s = store.create_song(1, song("Holy", &[])).unwrap();
        assert_eq!(store.increment_song_views(&s.id).unwrap(), 1);
        assert_eq!(store.increment_song_views(&s.id).unwrap(), 2);
        assert!(store.increment_song_views("nope").is_err());
        // views do not count as an edit
        assert_eq!(store.get_song(&s.id).unwrap().updated, s.updated);
    }

    #[test]
    fn arrangements_and_mashups() {
        let (store, _dir) = create_tmp_store();
        let a = store.create_song(1, song("Song A", &[])).unwrap();
        let b = store.create_song(1, song("Song B", &[])).unwrap();

        let single = store
            .create_arrangement(1, arrangement("Acoustic", &[&a.id]))
            .unwrap();
        assert!(!single.is_mashup);
        let mashup = store
            .create_arrangement(1, arrangement("Medley", &[&b.id, &a.id]))
            .unwrap();
        assert!(mashup.is_mashup);
        assert_eq!(mashup.song_ids, vec![b.id.clone(), a.id.clone()]);

        let for_a = store.list_song_arrangements(&a.id).unwrap();
        assert_eq!(for_a.len(), 2);
        let for_b = store.list_song_arrangements(&b.id).unwrap();
        assert_eq!(for_b.len(), 1);

        assert!(matches!(
            store.create_arrangement(1, arrangement("Ghost", &["missing"])),
            Err(SongbookError::Invalid { field: "song_ids", .. })
        ));
        let mut broken = arrangement("Broken", &[&a.id]);
        broken.chord_data = "[G]ok\n[Q]bad".to_string();
        let err = store.create_arrangement(1, broken).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn arrangement_update_respects_ownership() {
        let (store, _dir) = create_tmp_store();
        let a = store.create_song(1, song("Song A", &[])).unwrap();
        let arr = store
            .create_arrangement(OWNER.user_id, arrangement("Acoustic", &[&a.id]))
            .unwrap();
        let update = ArrangementUpdate {
            capo: Some(Some(2)),
            ..Default::default()
        };
        assert!(matches!(
            store.update_arrangement(&arr.id, &OTHER, update.clone()),
            Err(SongbookError::Forbidden)
        ));
        let updated = store.update_arrangement(&arr.id, &OWNER, update).unwrap();
        assert_eq!(updated.capo, Some(2));
        assert_eq!(updated.chord_data, arr.chord_data);

        assert!(matches!(
            store.update_arrangement(
                &arr.id,
                &OWNER,
                ArrangementUpdate {
                    capo: Some(Some(13)),
                    ..Default::default()
                }
            ),
            Err(SongbookError::Invalid { field: "capo", .. })
        ));

        let cleared = store
            .update_arrangement(
                &arr.id,
                &OWNER,
                ArrangementUpdate {
                    capo: Some(None),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(cleared.capo, None);
        store.delete_arrangement(&arr.id, &MODERATOR).unwrap();
        assert!(store.get_arrangement(&arr.id).is_err());
    }

    #[test]
    fn deleting_song_cleans_up_dependents() {
        let (store, _dir) = create_tmp_store();
        let a = store.create_song(1, song("Song A", &[])).unwrap();
        let b = store.create_song(1, song("Song B", &[])).unwrap();
        let only_a = store
            .create_arrangement(1, arrangement("Solo", &[&a.id]))
            .unwrap();
        let mashup = store
            .create_arrangement(1, arrangement("Medley", &[&a.id, &b.id]))
            .unwrap();
        store
            .add_verse(&a.id, 1, NewVerse {
                reference: "Psalm 23".to_string(),
                text: String::new(),
            })
            .unwrap();
        store
            .upsert_review(2, &ReviewTarget::song(&a.id), NewReview { rating: 5, comment: None })
            .unwrap();
        store
            .upsert_review(
                2,
                &ReviewTarget::arrangement(&only_a.id),
                NewReview { rating: 4, comment: None },
            )
            .unwrap();
        let setlist = store
            .create_setlist(
                1,
                NewSetlist {
                    name: "Sunday".to_string(),
                    entries: vec![entry(&a.id), entry(&b.id)],
                    ..Default::default()
                },
            )
            .unwrap();

        store.delete_song(&a.id, &OWNER).unwrap();

        assert!(store.get_arrangement(&only_a.id).is_err());
        let mashup = store.get_arrangement(&mashup.id).unwrap();
        assert_eq!(mashup.song_ids, vec![b.id.clone()]);
        assert!(!mashup.is_mashup);

        let setlist = store.get_setlist(&setlist.id, Some(1)).unwrap();
        assert_eq!(setlist.entries, vec![entry(&b.id)]);
        assert_eq!(store.count_user_content(2).unwrap().reviews, 0);
        assert_eq!(store.count_user_content(1).unwrap().verses, 0);
    }

    #[test]
    fn rating_aggregate_tracks_reviews() {
        let (store, _dir) = create_tmp_store();
        let s = store.create_song(1, song("Holy", &[])).unwrap();
        let target = ReviewTarget::song(&s.id);
        let review = |rating| NewReview {
            rating,
            comment: None,
        };

        store.upsert_review(1, &target, review(4)).unwrap();
        store.upsert_review(2, &target, review(5)).unwrap();
        let got = store.get_song(&s.id).unwrap();
        assert_eq!((got.rating_average, got.rating_count), (4.5, 2));

        store.upsert_review(2, &target, review(3)).unwrap();
        let got = store.get_song(&s.id).unwrap();
        assert_eq!((got.rating_average, got.rating_count), (3.5, 2));

        store.upsert_review(3, &target, review(3)).unwrap();
        let got = store.get_song(&s.id).unwrap();
        assert_eq!(got.rating_average, 3.33);

        store.delete_review(1, &target).unwrap();
        store.delete_review(2, &target).unwrap();
        store.delete_review(3, &target).unwrap();
        let got = store.get_song(&s.id).unwrap();
        assert_eq!((got.rating_average, got.rating_count), (0.0, 0));

        assert!(matches!(
            store.delete_review(1, &target),
            Err(SongbookError::NotFound(_))
        ));
        assert!(matches!(
            store.upsert_review(1, &target, review(0)),
            Err(SongbookError::Invalid { field: "rating", .. })
        ));
        assert!(matches!(
            store.upsert_review(1, &ReviewTarget::song("nope"), review(3)),
            Err(SongbookError::NotFound(_))
        ));
    }

    #[test]
    fn arrangement_reviews_have_their_own_aggregate() {
        let (store, _dir) = create_tmp_store();
        let s = store.create_song(1, song("Holy", &[])).unwrap();
        let arr = store.create_arrangement(1, arrangement("Live", &[&s.id])).unwrap();
        store
            .upsert_review(
                1,
                &ReviewTarget::arrangement(&arr.id),
                NewReview {
                    rating: 2,
                    comment: Some("too fast".to_string()),
                },
            )
            .unwrap();
        assert_eq!(store.get_arrangement(&arr.id).unwrap().rating_count, 1);
        assert_eq!(store.get_song(&s.id).unwrap().rating_count, 0);
        let reviews = store.list_reviews(&ReviewTarget::arrangement(&arr.id)).unwrap();
        assert_eq!(reviews[0].comment.as_deref(), Some("too fast"));
    }

    #[test]
    fn verses_newest_first_and_comments_oldest_first() {
        let (store, _dir) = create_tmp_store();
        let s = store.create_song(1, song("Holy", &[])).unwrap();
        for reference in ["Isaiah 6:3", "Revelation 4:8"] {
            store
                .add_verse(
                    &s.id,
                    1,
                    NewVerse {
                        reference: reference.to_string(),
                        text: String::new(),
                    },
                )
                .unwrap();
        }
        let verses = store.list_verses(&s.id).unwrap();
        assert_eq!(verses[0].reference, "Revelation 4:8");

        let first = store
            .add_comment(&s.id, 1, NewComment { body: "first".to_string() })
            .unwrap();
        store
            .add_comment(&s.id, 2, NewComment { body: "second".to_string() })
            .unwrap();
        let comments = store.list_comments(&s.id).unwrap();
        assert_eq!(comments[0].body, "first");

        assert!(matches!(
            store.delete_comment(&s.id, &first.id, &OTHER),
            Err(SongbookError::Forbidden)
        ));
        store.delete_comment(&s.id, &first.id, &OWNER).unwrap();
        assert_eq!(store.list_comments(&s.id).unwrap().len(), 1);

        assert!(matches!(
            store.add_comment(&s.id, 1, NewComment { body: "  ".to_string() }),
            Err(SongbookError::Invalid { field: "body", .. })
        ));
        assert!(store.list_verses("nope").is_err());
        assert!(store
            .delete_verse("other-song", &verses[0].id, &MODERATOR)
            .is_err());
    }

    #[test]
    fn setlist_usage_counts_distinct_setlists() {
        let (store, _dir) = create_tmp_store();
        let a = store.create_song(1, song("Song A", &[])).unwrap();
        let b = store.create_song(1, song("Song B", &[])).unwrap();

        let first = store
            .create_setlist(
                1,
                NewSetlist {
                    name: "Morning".to_string(),
                    entries: vec![entry(&a.id), entry(&a.id), entry(&b.id)],
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(store.get_song(&a.id).unwrap().setlist_usage_count, 1);

        let second = store
            .create_setlist(
                1,
                NewSetlist {
                    name: "Evening".to_string(),
                    entries: vec![entry(&a.id)],
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(store.get_song(&a.id).unwrap().setlist_usage_count, 2);
        assert_eq!(store.get_song(&b.id).unwrap().setlist_usage_count, 1);

        store.remove_setlist_entries(&first.id, 1, vec![2]).unwrap();
        assert_eq!(store.get_song(&b.id).unwrap().setlist_usage_count, 0);

        store.delete_setlist(&second.id, 1).unwrap();
        assert_eq!(store.get_song(&a.id).unwrap().setlist_usage_count, 1);

        store
            .update_setlist(
                &first.id,
                1,
                SetlistUpdate {
                    entries: Some(vec![entry(&b.id)]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(store.get_song(&a.id).unwrap().setlist_usage_count, 0);
        assert_eq!(store.get_song(&b.id).unwrap().setlist_usage_count, 1);
    }

    #[test]
    fn setlist_entries_are_validated() {
        let (store, _dir) = create_tmp_store();
        let a = store.create_song(1, song("Song A", &[])).unwrap();
        let b = store.create_song(1, song("Song B", &[])).unwrap();
        let arr_b = store.create_arrangement(1, arrangement("B", &[&b.id])).unwrap();

        let bad = SetlistEntry {
            arrangement_id: Some(arr_b.id.clone()),
            ..entry(&a.id)
        };
        let err = store
            .create_setlist(
                1,
                NewSetlist {
                    name: "Bad".to_string(),
                    entries: vec![bad],
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(err.to_string().contains("does not include"));

        let setlist = store
            .create_setlist(
                1,
                NewSetlist {
                    name: "Good".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        let too_many: Vec<SetlistEntry> = (0..101).map(|_| entry(&a.id)).collect();
        assert!(matches!(
            store.add_setlist_entries(&setlist.id, 1, too_many),
            Err(SongbookError::Invalid { field: "entries", .. })
        ));
        assert!(matches!(
            store.add_setlist_entries(&setlist.id, 2, vec![entry(&a.id)]),
            Err(SongbookError::Forbidden)
        ));
        assert!(store.remove_setlist_entries(&setlist.id, 1, vec![0]).is_err());
    }

    #[test]
    fn arrangement_song_change_detaches_setlist_entries() {
        let (store, _dir) = create_tmp_store();
        let a = store.create_song(1, song("Song A", &[])).unwrap();
        let b = store.create_song(1, song("Song B", &[])).unwrap();
        let arr = store.create_arrangement(1, arrangement("Arr", &[&a.id])).unwrap();
        let setlist = store
            .create_setlist(
                1,
                NewSetlist {
                    name: "S".to_string(),
                    entries: vec![SetlistEntry {
                        arrangement_id: Some(arr.id.clone()),
                        ..entry(&a.id)
                    }],
                    ..Default::default()
                },
            )
            .unwrap();
        store
            .update_arrangement(
                &arr.id,
                &OWNER,
                ArrangementUpdate {
                    song_ids: Some(vec![b.id.clone()]),
                    ..Default::default()
                },
            )
            .unwrap();
        let setlist = store.get_setlist(&setlist.id, Some(1)).unwrap();
        assert_eq!(setlist.entries[0].arrangement_id, None);
    }

    #[test]
    fn move_and_visibility() {
        let (store, _dir) = create_tmp_store();
        let ids: Vec<String> = ["One", "Two", "Three"]
            .iter()
            .map(|t| store.create_song(1, song(t, &[])).unwrap().id)
            .collect();
        let setlist = store
            .create_setlist(
                1,
                NewSetlist {
                    name: "Order".to_string(),
                    service_date: Some("2024-12-24".to_string()),
                    entries: ids.iter().map(|id| entry(id)).collect(),
                    ..Default::default()
                },
            )
            .unwrap();

        let moved = store.move_setlist_entry(&setlist.id, 1, 0, 2).unwrap();
        let order: Vec<&str> = moved.entries.iter().map(|e| e.song_id.as_str()).collect();
        assert_eq!(order, vec![ids[1].as_str(), ids[2].as_str(), ids[0].as_str()]);
        assert!(store.move_setlist_entry(&setlist.id, 1, 0, 3).is_err());

        assert!(matches!(
            store.get_setlist(&setlist.id, Some(2)),
            Err(SongbookError::NotFound(_))
        ));
        assert!(store.get_setlist(&setlist.id, None).is_err());
        store
            .update_setlist(
                &setlist.id,
                1,
                SetlistUpdate {
                    is_public: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(store.get_setlist(&setlist.id, None).is_ok());

        let counts = store.count_user_content(1).unwrap();
        assert_eq!(counts.songs, 3);
        assert_eq!(counts.setlists, 1);
        assert_eq!(counts.public_setlists, 1);
        assert_eq!(store.list_user_setlists(1).unwrap().len(), 1);
        assert!(store.list_user_setlists(2).unwrap().is_empty());
    }
}
