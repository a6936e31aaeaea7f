use axum::{extract::State, routing::post, Json, Router};
use tracing::debug;

use super::error::ApiResult;
use super::metrics::{record_sync_batch, record_sync_operation};
use super::session::Session;
use super::state::{GuardedSyncProcessor, ServerState};
use crate::sync::{SyncBatchRequest, SyncBatchResponse};
use crate::user::Permission;

async fn post_sync_batch(
    session: Session,
    State(processor): State<GuardedSyncProcessor>,
    Json(body): Json<SyncBatchRequest>,
) -> ApiResult<Json<SyncBatchResponse>> {
    session.require(Permission::ContributeContent)?;
    let entity_types: Vec<&'static str> = body
        .operations
        .iter()
        .map(|op| op.entity_type.as_str())
        .collect();

    let response = processor.apply_batch(
        &session.user_context(),
        body,
        chrono::Utc::now().timestamp(),
    )?;

    record_sync_batch(entity_types.len());
    for (entity_type, result) in entity_types.iter().zip(&response.results) {
        record_sync_operation(entity_type, result.status.as_str());
    }
    debug!(
        "User {} synced {} operations",
        session.user_id,
        response.results.len()
    );
    Ok(Json(response))
}

pub fn sync_routes() -> Router<ServerState> {
    Router::new().route("/v1/sync/batch", post(post_sync_batch))
}
