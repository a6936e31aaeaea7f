//! Setlist endpoints. Owners manage their own setlists; public setlists are
//! readable by anyone, signed in or not.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use super::error::ApiResult;
use super::session::Session;
use super::state::{GuardedSongbookStore, ServerState};
use crate::songbook::{NewSetlist, Setlist, SetlistEntry, SetlistUpdate};
use crate::user::Permission;

#[derive(Deserialize)]
struct AddEntriesBody {
    entries: Vec<SetlistEntry>,
}

#[derive(Deserialize)]
struct RemoveEntriesBody {
    positions: Vec<usize>,
}

#[derive(Deserialize)]
struct MoveEntryBody {
    from: usize,
    to: usize,
}

async fn list_user_setlists(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
) -> ApiResult<Json<Vec<Setlist>>> {
    session.require(Permission::OwnSetlists)?;
    Ok(Json(songbook.list_user_setlists(session.user_id)?))
}

async fn create_setlist(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Json(body): Json<NewSetlist>,
) -> ApiResult<impl IntoResponse> {
    session.require(Permission::OwnSetlists)?;
    let setlist = songbook.create_setlist(session.user_id, body)?;
    Ok((StatusCode::CREATED, Json(setlist)))
}

async fn get_setlist(
    session: Option<Session>,
    State(songbook): State<GuardedSongbookStore>,
    Path(id): Path<String>,
) -> ApiResult<Json<Setlist>> {
    let viewer = session.map(|s| s.user_id);
    Ok(Json(songbook.get_setlist(&id, viewer)?))
}

async fn update_setlist(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Path(id): Path<String>,
    Json(body): Json<SetlistUpdate>,
) -> ApiResult<Json<Setlist>> {
    session.require(Permission::OwnSetlists)?;
    Ok(Json(songbook.update_setlist(&id, session.user_id, body)?))
}

async fn delete_setlist(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    session.require(Permission::OwnSetlists)?;
    songbook.delete_setlist(&id, session.user_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_entries(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Path(id): Path<String>,
    Json(body): Json<AddEntriesBody>,
) -> ApiResult<Json<Setlist>> {
    session.require(Permission::OwnSetlists)?;
    Ok(Json(songbook.add_setlist_entries(
        &id,
        session.user_id,
        body.entries,
    )?))
}

async fn remove_entries(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Path(id): Path<String>,
    Json(body): Json<RemoveEntriesBody>,
) -> ApiResult<Json<Setlist>> {
    session.require(Permission::OwnSetlists)?;
    Ok(Json(songbook.remove_setlist_entries(
        &id,
        session.user_id,
        body.positions,
    )?))
}

async fn move_entry(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Path(id): Path<String>,
    Json(body): Json<MoveEntryBody>,
) -> ApiResult<Json<Setlist>> {
    session.require(Permission::OwnSetlists)?;
    Ok(Json(songbook.move_setlist_entry(
        &id,
        session.user_id,
        body.from,
        body.to,
    )?))
}

pub fn setlist_routes() -> Router<ServerState> {
    Router::new()
        .route(
            "/v1/user/setlists",
            get(list_user_setlists).post(create_setlist),
        )
        .route(
            "/v1/setlists/{id}",
            get(get_setlist).put(update_setlist).delete(delete_setlist),
        )
        .route("/v1/setlists/{id}/entries", post(add_entries))
        .route("/v1/setlists/{id}/entries/remove", put(remove_entries))
        .route("/v1/setlists/{id}/entries/move", put(move_entry))
}
