use crate::sqlite_column;
use crate::sqlite_persistence::{ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema};

const SONG_FK: ForeignKey = ForeignKey {
    foreign_table: "song",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};
const ARRANGEMENT_FK: ForeignKey = ForeignKey {
    foreign_table: "arrangement",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};
const ENTRY_ARRANGEMENT_FK: ForeignKey = ForeignKey {
    foreign_table: "arrangement",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::SetNull,
};
const SETLIST_FK: ForeignKey = ForeignKey {
    foreign_table: "setlist",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

/// V 0
pub const SONG_TABLE_V_0: Table = Table {
    name: "song",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("artist", &SqlType::Text),
        sqlite_column!("source", &SqlType::Text),
        sqlite_column!("lyrics", &SqlType::Text, non_null = true),
        sqlite_column!("original_key", &SqlType::Text),
        sqlite_column!("tempo", &SqlType::Integer),
        sqlite_column!("ccli_number", &SqlType::Text),
        sqlite_column!("release_year", &SqlType::Integer),
        sqlite_column!("created_by", &SqlType::Integer, non_null = true),
        sqlite_column!("created", &SqlType::Integer, non_null = true),
        sqlite_column!("updated", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "views",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "rating_average",
            &SqlType::Real,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "rating_count",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "setlist_usage_count",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[
        ("idx_song_title", "title"),
        ("idx_song_created", "created"),
        ("idx_song_created_by", "created_by"),
    ],
    unique_constraints: &[],
};

pub const SONG_THEME_TABLE_V_0: Table = Table {
    name: "song_theme",
    columns: &[
        sqlite_column!(
            "song_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&SONG_FK)
        ),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
        sqlite_column!("theme", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_song_theme_theme", "theme")],
    unique_constraints: &[&["song_id", "theme"]],
};

pub const ARRANGEMENT_TABLE_V_0: Table = Table {
    name: "arrangement",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("key", &SqlType::Text),
        sqlite_column!("tempo", &SqlType::Integer),
        sqlite_column!("time_signature", &SqlType::Text),
        sqlite_column!("capo", &SqlType::Integer),
        sqlite_column!("chord_data", &SqlType::Text, non_null = true),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!("created_by", &SqlType::Integer, non_null = true),
        sqlite_column!("created", &SqlType::Integer, non_null = true),
        sqlite_column!("updated", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "views",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "rating_average",
            &SqlType::Real,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "rating_count",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[("idx_arrangement_created_by", "created_by")],
    unique_constraints: &[],
};

pub const ARRANGEMENT_SONG_TABLE_V_0: Table = Table {
    name: "arrangement_song",
    columns: &[
        sqlite_column!(
            "arrangement_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&ARRANGEMENT_FK)
        ),
        sqlite_column!(
            "song_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&SONG_FK)
        ),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_arrangement_song_song_id", "song_id")],
    unique_constraints: &[&["arrangement_id", "song_id"]],
};

pub const REVIEW_TABLE_V_0: Table = Table {
    name: "review",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("target_type", &SqlType::Integer, non_null = true),
        sqlite_column!("target_id", &SqlType::Text, non_null = true),
        sqlite_column!("rating", &SqlType::Integer, non_null = true),
        sqlite_column!("comment", &SqlType::Text),
        sqlite_column!("created", &SqlType::Integer, non_null = true),
        sqlite_column!("updated", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_review_target_id", "target_id")],
    unique_constraints: &[&["user_id", "target_type", "target_id"]],
};

pub const VERSE_TABLE_V_0: Table = Table {
    name: "verse",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "song_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&SONG_FK)
        ),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("reference", &SqlType::Text, non_null = true),
        sqlite_column!("text", &SqlType::Text, non_null = true),
        sqlite_column!("created", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_verse_song_id", "song_id")],
    unique_constraints: &[],
};

pub const COMMENT_TABLE_V_0: Table = Table {
    name: "comment",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "song_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&SONG_FK)
        ),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("body", &SqlType::Text, non_null = true),
        sqlite_column!("created", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_comment_song_id", "song_id")],
    unique_constraints: &[],
};

pub const SETLIST_TABLE_V_0: Table = Table {
    name: "setlist",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!("service_date", &SqlType::Text),
        sqlite_column!(
            "is_public",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("created", &SqlType::Integer, non_null = true),
        sqlite_column!("updated", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_setlist_user_id", "user_id")],
    unique_constraints: &[],
};

pub const SETLIST_ENTRY_TABLE_V_0: Table = Table {
    name: "setlist_entry",
    columns: &[
        sqlite_column!(
            "setlist_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&SETLIST_FK)
        ),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "song_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&SONG_FK)
        ),
        sqlite_column!(
            "arrangement_id",
            &SqlType::Text,
            foreign_key = Some(&ENTRY_ARRANGEMENT_FK)
        ),
        sqlite_column!("key", &SqlType::Text),
        sqlite_column!("notes", &SqlType::Text),
    ],
    indices: &[("idx_setlist_entry_song_id", "song_id")],
    unique_constraints: &[&["setlist_id", "position"]],
};

pub const SONG_SEARCH_TABLE: &str = "song_search";

/// The FTS5 index lives outside the versioned tables, it can always be
/// rebuilt from `song` and `song_theme`.
pub const CREATE_SONG_SEARCH_SQL: &str = "CREATE VIRTUAL TABLE IF NOT EXISTS song_search USING fts5(
    song_id UNINDEXED,
    title,
    artist,
    lyrics,
    themes
);";

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        SONG_TABLE_V_0,
        SONG_THEME_TABLE_V_0,
        ARRANGEMENT_TABLE_V_0,
        ARRANGEMENT_SONG_TABLE_V_0,
        REVIEW_TABLE_V_0,
        VERSE_TABLE_V_0,
        COMMENT_TABLE_V_0,
        SETLIST_TABLE_V_0,
        SETLIST_ENTRY_TABLE_V_0,
    ],
    migration: None,
}];
