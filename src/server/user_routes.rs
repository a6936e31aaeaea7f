//! Per-user endpoints: favorites, own profile and public profiles.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::debug;

use super::error::ApiResult;
use super::session::Session;
use super::state::{GuardedSongbookStore, GuardedUserManager, ServerState};
use crate::songbook::{ContentCounts, SongbookError, SongbookResult, SongbookStore};
use crate::user::{FavoriteContentType, Permission, UserFavorite, UserProfile, UserProfileUpdate};

#[derive(Serialize)]
struct PublicProfileResponse {
    id: usize,
    handle: String,
    created: i64,
    profile: UserProfile,
    content: ContentCounts,
}

fn content_type_from_path(segment: &str) -> ApiResult<FavoriteContentType> {
    FavoriteContentType::from_path_segment(segment).ok_or_else(|| {
        SongbookError::invalid("content_type", format!("unknown content type {}", segment))
    })
}

/// Whether the favorited item still exists.
fn content_exists(
    songbook: &dyn SongbookStore,
    content_type: FavoriteContentType,
    content_id: &str,
) -> SongbookResult<bool> {
    let lookup = match content_type {
        FavoriteContentType::Song => songbook.get_song(content_id).map(|_| ()),
        FavoriteContentType::Arrangement => songbook.get_arrangement(content_id).map(|_| ()),
    };
    match lookup {
        Ok(()) => Ok(true),
        Err(SongbookError::NotFound(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

async fn get_favorites(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    State(user_manager): State<GuardedUserManager>,
    Path(content_type): Path<String>,
) -> ApiResult<Json<Vec<UserFavorite>>> {
    session.require(Permission::FavoriteContent)?;
    let content_type = content_type_from_path(&content_type)?;
    let mut favorites = vec![];
    for favorite in user_manager.get_user_favorites(session.user_id, content_type)? {
        if content_exists(songbook.as_ref(), content_type, &favorite.content_id)? {
            favorites.push(favorite);
        }
    }
    Ok(Json(favorites))
}

async fn add_favorite(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    State(user_manager): State<GuardedUserManager>,
    Path((content_type, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    session.require(Permission::FavoriteContent)?;
    let content_type = content_type_from_path(&content_type)?;
    if !content_exists(songbook.as_ref(), content_type, &id)? {
        return Err(SongbookError::not_found("content", id));
    }
    user_manager.set_user_favorite(session.user_id, content_type, &id, true)?;
    debug!("User {} favorited {:?} {}", session.user_id, content_type, id);
    Ok(StatusCode::OK)
}

async fn remove_favorite(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Path((content_type, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    session.require(Permission::FavoriteContent)?;
    let content_type = content_type_from_path(&content_type)?;
    user_manager.set_user_favorite(session.user_id, content_type, &id, false)?;
    Ok(StatusCode::OK)
}

async fn get_profile(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
) -> ApiResult<Json<UserProfile>> {
    session.require(Permission::AccessSongbook)?;
    Ok(Json(user_manager.get_user_profile(session.user_id)?))
}

async fn update_profile(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<UserProfileUpdate>,
) -> ApiResult<Json<UserProfile>> {
    session.require(Permission::AccessSongbook)?;
    Ok(Json(
        user_manager.update_user_profile(session.user_id, body)?,
    ))
}

async fn get_public_profile(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    State(user_manager): State<GuardedUserManager>,
    Path(handle): Path<String>,
) -> ApiResult<Json<PublicProfileResponse>> {
    session.require(Permission::AccessSongbook)?;
    let summary = user_manager
        .get_user_summary(&handle)?
        .ok_or_else(|| SongbookError::not_found("user", &handle))?;
    let profile = user_manager.get_user_profile(summary.id)?;
    let content = songbook.count_user_content(summary.id)?;
    Ok(Json(PublicProfileResponse {
        id: summary.id,
        handle: summary.handle,
        created: summary.created,
        profile,
        content,
    }))
}

pub fn user_routes() -> Router<ServerState> {
    Router::new()
        .route("/v1/user/favorites/{content_type}", get(get_favorites))
        .route(
            "/v1/user/favorites/{content_type}/{id}",
            post(add_favorite).delete(remove_favorite),
        )
        .route("/v1/user/profile", get(get_profile).put(update_profile))
        .route("/v1/users/{handle}", get(get_public_profile))
}
