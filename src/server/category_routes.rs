use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::error::ApiResult;
use super::session::Session;
use super::state::{GuardedSongbookStore, ServerState};
use crate::categories::{self, CategorySong, CategorySort, CategoryStats};
use crate::songbook::{Page, PageRequest};
use crate::user::Permission;

#[derive(Deserialize)]
struct CategorySongsQuery {
    #[serde(default)]
    sort: CategorySort,
    page: Option<usize>,
    limit: Option<usize>,
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

async fn list_categories(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
) -> ApiResult<Json<Vec<CategoryStats>>> {
    session.require(Permission::AccessSongbook)?;
    let songs = songbook.get_song_summaries()?;
    Ok(Json(categories::category_stats(&songs, now())))
}

async fn get_category_songs(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Path(slug): Path<String>,
    Query(query): Query<CategorySongsQuery>,
) -> ApiResult<Json<Page<CategorySong>>> {
    session.require(Permission::AccessSongbook)?;
    let songs = songbook.get_song_summaries()?;
    Ok(Json(categories::category_songs(
        &slug,
        &songs,
        query.sort,
        PageRequest::new(query.page, query.limit),
        now(),
    )?))
}

pub fn category_routes() -> Router<ServerState> {
    Router::new()
        .route("/v1/categories", get(list_categories))
        .route("/v1/categories/{slug}/songs", get(get_category_songs))
}
