//! Song endpoints under /v1/songs, with verses, comments and reviews.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::ApiResult;
use super::session::Session;
use super::state::{GuardedSongbookStore, GuardedUserManager, ServerState};
use crate::songbook::{
    Comment, NewComment, NewReview, NewSong, NewVerse, Page, Review, ReviewTarget, Song,
    SongQuery, SongUpdate, Arrangement, Verse,
};
use crate::user::Permission;

const DEFAULT_SEARCH_LIMIT: usize = 20;

#[derive(Deserialize)]
struct SearchQuery {
    q: String,
    limit: Option<usize>,
}

#[derive(Serialize)]
pub(super) struct ViewsResponse {
    pub views: u64,
}

#[derive(Serialize)]
pub(super) struct ReviewsResponse {
    pub rating_average: f64,
    pub rating_count: u32,
    pub reviews: Vec<Review>,
}

async fn list_songs(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Query(query): Query<SongQuery>,
) -> ApiResult<Json<Page<Song>>> {
    session.require(Permission::AccessSongbook)?;
    Ok(Json(songbook.list_songs(&query)?))
}

async fn create_song(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Json(body): Json<NewSong>,
) -> ApiResult<impl IntoResponse> {
    session.require(Permission::ContributeContent)?;
    let song = songbook.create_song(session.user_id, body)?;
    debug!("User {} created song {}", session.user_id, song.id);
    Ok((StatusCode::CREATED, Json(song)))
}

async fn search_songs(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<Song>>> {
    session.require(Permission::AccessSongbook)?;
    let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    Ok(Json(songbook.search_songs(&query.q, limit)?))
}

async fn get_song(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Path(id): Path<String>,
) -> ApiResult<Json<Song>> {
    session.require(Permission::AccessSongbook)?;
    Ok(Json(songbook.get_song(&id)?))
}

async fn update_song(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Path(id): Path<String>,
    Json(body): Json<SongUpdate>,
) -> ApiResult<Json<Song>> {
    session.require(Permission::ContributeContent)?;
    Ok(Json(songbook.update_song(&id, &session.user_context(), body)?))
}

async fn delete_song(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    session.require(Permission::ContributeContent)?;
    songbook.delete_song(&id, &session.user_context())?;
    Ok(StatusCode::NO_CONTENT)
}

async fn view_song(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Path(id): Path<String>,
) -> ApiResult<Json<ViewsResponse>> {
    session.require(Permission::AccessSongbook)?;
    let views = songbook.increment_song_views(&id)?;
    Ok(Json(ViewsResponse { views }))
}

async fn get_song_arrangements(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Arrangement>>> {
    session.require(Permission::AccessSongbook)?;
    songbook.get_song(&id)?;
    Ok(Json(songbook.list_song_arrangements(&id)?))
}

// =============================================================================
// Verses
// =============================================================================

async fn list_verses(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Verse>>> {
    session.require(Permission::AccessSongbook)?;
    Ok(Json(songbook.list_verses(&id)?))
}

async fn add_verse(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Path(id): Path<String>,
    Json(body): Json<NewVerse>,
) -> ApiResult<impl IntoResponse> {
    session.require(Permission::ContributeContent)?;
    let verse = songbook.add_verse(&id, session.user_id, body)?;
    Ok((StatusCode::CREATED, Json(verse)))
}

async fn delete_verse(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Path((id, verse_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    session.require(Permission::ContributeContent)?;
    songbook.delete_verse(&id, &verse_id, &session.user_context())?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Comments
// =============================================================================

/// Resolves author handles, looking each user up once.
fn with_handles(
    user_manager: &GuardedUserManager,
    comments: Vec<Comment>,
) -> anyhow::Result<Vec<Comment>> {
    let mut handles: HashMap<usize, Option<String>> = HashMap::new();
    comments
        .into_iter()
        .map(|mut comment| {
            let handle = match handles.get(&comment.user_id) {
                Some(handle) => handle.clone(),
                None => {
                    let handle = user_manager.get_user_handle(comment.user_id)?;
                    handles.insert(comment.user_id, handle.clone());
                    handle
                }
            };
            comment.user_handle = handle;
            Ok(comment)
        })
        .collect()
}

async fn list_comments(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    State(user_manager): State<GuardedUserManager>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Comment>>> {
    session.require(Permission::AccessSongbook)?;
    let comments = songbook.list_comments(&id)?;
    Ok(Json(with_handles(&user_manager, comments)?))
}

async fn add_comment(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    State(user_manager): State<GuardedUserManager>,
    Path(id): Path<String>,
    Json(body): Json<NewComment>,
) -> ApiResult<impl IntoResponse> {
    session.require(Permission::ContributeContent)?;
    let mut comment = songbook.add_comment(&id, session.user_id, body)?;
    comment.user_handle = user_manager.get_user_handle(session.user_id)?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn delete_comment(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Path((id, comment_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    session.require(Permission::ContributeContent)?;
    songbook.delete_comment(&id, &comment_id, &session.user_context())?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Reviews, shared with arrangement routes
// =============================================================================

pub(super) fn reviews_of(
    songbook: &GuardedSongbookStore,
    target: &ReviewTarget,
    aggregate: (f64, u32),
) -> ApiResult<Json<ReviewsResponse>> {
    Ok(Json(ReviewsResponse {
        rating_average: aggregate.0,
        rating_count: aggregate.1,
        reviews: songbook.list_reviews(target)?,
    }))
}

async fn list_song_reviews(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Path(id): Path<String>,
) -> ApiResult<Json<ReviewsResponse>> {
    session.require(Permission::AccessSongbook)?;
    let song = songbook.get_song(&id)?;
    reviews_of(
        &songbook,
        &ReviewTarget::song(id),
        (song.rating_average, song.rating_count),
    )
}

async fn put_song_review(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Path(id): Path<String>,
    Json(body): Json<NewReview>,
) -> ApiResult<Json<Review>> {
    session.require(Permission::ContributeContent)?;
    Ok(Json(songbook.upsert_review(
        session.user_id,
        &ReviewTarget::song(id),
        body,
    )?))
}

async fn delete_song_review(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    session.require(Permission::ContributeContent)?;
    songbook.delete_review(session.user_id, &ReviewTarget::song(id))?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn song_routes() -> Router<ServerState> {
    Router::new()
        .route("/v1/songs", get(list_songs).post(create_song))
        .route("/v1/songs/search", get(search_songs))
        .route(
            "/v1/songs/{id}",
            get(get_song).put(update_song).delete(delete_song),
        )
        .route("/v1/songs/{id}/view", post(view_song))
        .route("/v1/songs/{id}/arrangements", get(get_song_arrangements))
        .route("/v1/songs/{id}/verses", get(list_verses).post(add_verse))
        .route("/v1/songs/{id}/verses/{verse_id}", delete(delete_verse))
        .route(
            "/v1/songs/{id}/comments",
            get(list_comments).post(add_comment),
        )
        .route(
            "/v1/songs/{id}/comments/{comment_id}",
            delete(delete_comment),
        )
        .route(
            "/v1/songs/{id}/reviews",
            get(list_song_reviews)
                .put(put_song_review)
                .delete(delete_song_review),
        )
}
