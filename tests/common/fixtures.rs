//! Test fixture creation for the songbook and user databases

use super::constants::*;
use anyhow::Result;
use songbook_server::songbook::{NewArrangement, NewSong, SongbookStore, SqliteSongbookStore};
use songbook_server::user::{SqliteUserStore, UserManager, UserRole};
use std::path::Path;
use std::sync::Arc;

/// Ids of the content created by `seed_songbook`.
#[derive(Debug, Clone)]
pub struct SeededSongbook {
    pub test_user_id: usize,
    pub admin_id: usize,
    pub song_1_id: String,
    pub song_2_id: String,
    pub song_3_id: String,
    pub arrangement_1_id: String,
}

/// Creates a user with the given credentials and role
pub fn create_user_with_password_and_role(
    user_manager: &UserManager,
    username: &str,
    password: &str,
    role: UserRole,
) -> Result<usize> {
    let user_id = user_manager.add_user(username)?;
    user_manager.create_password_credentials(username, password)?;
    user_manager.add_user_role(user_id, role)?;
    Ok(user_id)
}

/// Creates the regular test user and the admin in the user database.
/// Returns (test_user_id, admin_id).
pub fn create_test_users(db_path: &Path) -> Result<(usize, usize)> {
    let user_manager = UserManager::new(Arc::new(SqliteUserStore::new(db_path)?));

    let test_user_id =
        create_user_with_password_and_role(&user_manager, TEST_USER, TEST_PASS, UserRole::Regular)?;
    eprintln!("Created test user {} with id {}", TEST_USER, test_user_id);

    let admin_id =
        create_user_with_password_and_role(&user_manager, ADMIN_USER, ADMIN_PASS, UserRole::Admin)?;
    eprintln!("Created admin user {} with id {}", ADMIN_USER, admin_id);

    Ok((test_user_id, admin_id))
}

/// Seeds 3 songs owned by the admin and one arrangement of song 1.
pub fn seed_songbook(
    store: &SqliteSongbookStore,
    test_user_id: usize,
    admin_id: usize,
) -> Result<SeededSongbook> {
    let song_1 = store.create_song(
        admin_id,
        NewSong {
            title: SONG_1_TITLE.to_string(),
            artist: Some(SONG_1_ARTIST.to_string()),
            themes: vec!["hymn".to_string(), "grace".to_string()],
            lyrics: "Amazing grace how sweet the sound".to_string(),
            original_key: Some("G".to_string()),
            ..Default::default()
        },
    )?;
    let song_2 = store.create_song(
        admin_id,
        NewSong {
            title: SONG_2_TITLE.to_string(),
            artist: Some("Franz Gruber".to_string()),
            themes: vec!["christmas".to_string()],
            lyrics: "Silent night, holy night".to_string(),
            original_key: Some("C".to_string()),
            ..Default::default()
        },
    )?;
    let song_3 = store.create_song(
        admin_id,
        NewSong {
            title: SONG_3_TITLE.to_string(),
            themes: vec!["contemporary".to_string(), "salvation".to_string()],
            lyrics: "My hope is built on nothing less".to_string(),
            ..Default::default()
        },
    )?;

    let arrangement = store.create_arrangement(
        admin_id,
        NewArrangement {
            name: ARRANGEMENT_1_NAME.to_string(),
            song_ids: vec![song_1.id.clone()],
            key: Some("G".to_string()),
            tempo: Some(72),
            chord_data: ARRANGEMENT_1_CHORDS.to_string(),
            ..Default::default()
        },
    )?;

    Ok(SeededSongbook {
        test_user_id,
        admin_id,
        song_1_id: song_1.id,
        song_2_id: song_2.id,
        song_3_id: song_3.id,
        arrangement_1_id: arrangement.id,
    })
}
