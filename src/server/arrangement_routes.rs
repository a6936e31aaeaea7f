//! Arrangement endpoints under /v1/arrangements, including on-the-fly
//! transposition of the stored chord chart.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::ApiResult;
use super::session::Session;
use super::song_routes::{reviews_of, ReviewsResponse, ViewsResponse};
use super::state::{GuardedSongbookStore, ServerState};
use crate::chordpro::{self, Chord, ChordChart};
use crate::songbook::{
    Arrangement, ArrangementUpdate, NewArrangement, NewReview, Review, ReviewTarget,
    SongbookError,
};
use crate::user::Permission;

#[derive(Debug, Default, Deserialize)]
struct TransposeQuery {
    transpose: Option<i32>,
    key: Option<String>,
}

#[derive(Serialize)]
struct ChartResponse {
    arrangement_id: String,
    key: Option<String>,
    chart: ChordChart,
    chords: Vec<Chord>,
}

/// Parses the stored chart and applies the requested shift, returning the
/// arrangement with its key and chord data rewritten to match.
fn render(
    mut arrangement: Arrangement,
    query: &TransposeQuery,
) -> ApiResult<(Arrangement, ChordChart)> {
    let chart = chordpro::parse(&arrangement.chord_data)
        .map_err(|e| SongbookError::invalid("chord_data", e.to_string()))?;

    let rendered = match (query.transpose, query.key.as_deref()) {
        (Some(_), Some(_)) => {
            return Err(SongbookError::invalid(
                "transpose",
                "cannot be combined with key",
            ))
        }
        (Some(semitones), None) => {
            let rendered = chordpro::transpose(&chart, semitones);
            arrangement.key = match arrangement.key.as_deref() {
                Some(key) => Some(
                    key.parse::<chordpro::Key>()
                        .map(|k| k.transpose(semitones).to_string())
                        .unwrap_or_else(|_| key.to_string()),
                ),
                None => rendered.effective_key().map(|k| k.to_string()),
            };
            rendered
        }
        (None, Some(key)) => {
            let rendered = chordpro::transpose_to_key(&chart, key)
                .map_err(|e| SongbookError::invalid("key", e.to_string()))?;
            arrangement.key = rendered
                .effective_key()
                .map(|k| k.to_string())
                .or_else(|| Some(key.to_string()));
            rendered
        }
        (None, None) => return Ok((arrangement, chart)),
    };

    arrangement.chord_data = rendered.to_chordpro();
    Ok((arrangement, rendered))
}

async fn create_arrangement(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Json(body): Json<NewArrangement>,
) -> ApiResult<impl IntoResponse> {
    session.require(Permission::ContributeContent)?;
    let arrangement = songbook.create_arrangement(session.user_id, body)?;
    debug!(
        "User {} created arrangement {}",
        session.user_id, arrangement.id
    );
    Ok((StatusCode::CREATED, Json(arrangement)))
}

async fn get_arrangement(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Path(id): Path<String>,
    Query(query): Query<TransposeQuery>,
) -> ApiResult<Json<Arrangement>> {
    session.require(Permission::AccessSongbook)?;
    let arrangement = songbook.get_arrangement(&id)?;
    if query.transpose.is_none() && query.key.is_none() {
        return Ok(Json(arrangement));
    }
    let (arrangement, _) = render(arrangement, &query)?;
    Ok(Json(arrangement))
}

async fn get_arrangement_chart(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Path(id): Path<String>,
    Query(query): Query<TransposeQuery>,
) -> ApiResult<Json<ChartResponse>> {
    session.require(Permission::AccessSongbook)?;
    let (arrangement, chart) = render(songbook.get_arrangement(&id)?, &query)?;
    Ok(Json(ChartResponse {
        arrangement_id: arrangement.id,
        key: arrangement.key,
        chords: chart.chords(),
        chart,
    }))
}

async fn update_arrangement(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Path(id): Path<String>,
    Json(body): Json<ArrangementUpdate>,
) -> ApiResult<Json<Arrangement>> {
    session.require(Permission::ContributeContent)?;
    Ok(Json(songbook.update_arrangement(
        &id,
        &session.user_context(),
        body,
    )?))
}

async fn delete_arrangement(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    session.require(Permission::ContributeContent)?;
    songbook.delete_arrangement(&id, &session.user_context())?;
    Ok(StatusCode::NO_CONTENT)
}

async fn view_arrangement(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Path(id): Path<String>,
) -> ApiResult<Json<ViewsResponse>> {
    session.require(Permission::AccessSongbook)?;
    let views = songbook.increment_arrangement_views(&id)?;
    Ok(Json(ViewsResponse { views }))
}

async fn list_arrangement_reviews(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Path(id): Path<String>,
) -> ApiResult<Json<ReviewsResponse>> {
    session.require(Permission::AccessSongbook)?;
    let arrangement = songbook.get_arrangement(&id)?;
    reviews_of(
        &songbook,
        &ReviewTarget::arrangement(id),
        (arrangement.rating_average, arrangement.rating_count),
    )
}

async fn put_arrangement_review(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Path(id): Path<String>,
    Json(body): Json<NewReview>,
) -> ApiResult<Json<Review>> {
    session.require(Permission::ContributeContent)?;
    Ok(Json(songbook.upsert_review(
        session.user_id,
        &ReviewTarget::arrangement(id),
        body,
    )?))
}

async fn delete_arrangement_review(
    session: Session,
    State(songbook): State<GuardedSongbookStore>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    session.require(Permission::ContributeContent)?;
    songbook.delete_review(session.user_id, &ReviewTarget::arrangement(id))?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn arrangement_routes() -> Router<ServerState> {
    Router::new()
        .route("/v1/arrangements", post(create_arrangement))
        .route(
            "/v1/arrangements/{id}",
            get(get_arrangement)
                .put(update_arrangement)
                .delete(delete_arrangement),
        )
        .route("/v1/arrangements/{id}/chart", get(get_arrangement_chart))
        .route("/v1/arrangements/{id}/view", post(view_arrangement))
        .route(
            "/v1/arrangements/{id}/reviews",
            get(list_arrangement_reviews)
                .put(put_arrangement_review)
                .delete(delete_arrangement_review),
        )
}
