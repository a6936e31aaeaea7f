//! Applies sync batches sent by offline clients.

use super::models::*;
use super::record_store::SyncRecordStore;
use crate::songbook::{
    ArrangementUpdate, NewArrangement, NewReview, NewSetlist, NewSong, ReviewTarget,
    ReviewTargetType, SetlistUpdate, SongUpdate, SongbookError, SongbookResult, SongbookStore,
    UserContext,
};
use crate::user::{FavoriteContentType, UserManager};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, warn};

pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Deserialize)]
struct ReviewData {
    target_type: ReviewTargetType,
    target_id: String,
    #[serde(default)]
    rating: Option<u8>,
    #[serde(default)]
    comment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FavoriteData {
    content_type: FavoriteContentType,
    content_id: String,
}

/// What earlier operations of the batch did to one entity.
#[derive(Default)]
struct GroupState {
    /// The server version won. Later operations conflict with it too.
    conflict: Option<(String, serde_json::Value)>,
    /// An operation was applied. Later ones build on it and skip the
    /// staleness check, which already passed against the server version.
    applied: bool,
}

enum Outcome {
    Applied(Option<String>),
    Conflict {
        entity_id: String,
        server_version: serde_json::Value,
    },
}

fn parse_data<T: DeserializeOwned>(op: &SyncOperation) -> SongbookResult<T> {
    serde_json::from_value(op.data.clone())
        .map_err(|e| SongbookError::invalid("data", e.to_string()))
}

fn require_id(op: &SyncOperation) -> SongbookResult<&str> {
    op.entity_id
        .as_deref()
        .ok_or_else(|| SongbookError::invalid("entity_id", "is required for updates and deletes"))
}

/// The server keeps its version when the client edited an older one.
fn stale<T: Serialize>(
    op: &SyncOperation,
    check: bool,
    entity_id: &str,
    entity: &T,
    updated: i64,
) -> SongbookResult<Option<Outcome>> {
    if !check || op.client_timestamp >= updated {
        return Ok(None);
    }
    let server_version = serde_json::to_value(entity).map_err(anyhow::Error::from)?;
    Ok(Some(Outcome::Conflict {
        entity_id: entity_id.to_string(),
        server_version,
    }))
}

/// Looks an entity up for an update or delete. Ok(None) means it is gone.
fn existing<T>(lookup: SongbookResult<T>) -> SongbookResult<Option<T>> {
    match lookup {
        Ok(entity) => Ok(Some(entity)),
        Err(SongbookError::NotFound(_)) => Ok(None),
        Err(err) => Err(err),
    }
}

pub struct SyncProcessor {
    songbook: Arc<dyn SongbookStore>,
    user_manager: Arc<UserManager>,
    records: Arc<dyn SyncRecordStore>,
    max_batch_size: usize,
    user_locks: Mutex<HashMap<usize, Arc<Mutex<()>>>>,
}

impl SyncProcessor {
    pub fn new(
        songbook: Arc<dyn SongbookStore>,
        user_manager: Arc<UserManager>,
        records: Arc<dyn SyncRecordStore>,
        max_batch_size: usize,
    ) -> Self {
        Self {
            songbook,
            user_manager,
            records,
            max_batch_size,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    fn user_lock(&self, user_id: usize) -> Arc<Mutex<()>> {
        self.user_locks
            .lock()
            .unwrap()
            .entry(user_id)
            .or_default()
            .clone()
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Applies every operation of the batch and returns one result per
    /// operation, in request order. Only an oversized batch fails as a whole.
    ///
    /// Batches of the same user run one at a time, so a resent batch racing
    /// the original still sees each op id once.
    pub fn apply_batch(
        &self,
        ctx: &UserContext,
        request: SyncBatchRequest,
        now: i64,
    ) -> SongbookResult<SyncBatchResponse> {
        let operations = request.operations;
        if operations.len() > self.max_batch_size {
            return Err(SongbookError::invalid(
                "operations",
                format!(
                    "a batch holds at most {} operations, got {}",
                    self.max_batch_size,
                    operations.len()
                ),
            ));
        }

        let lock = self.user_lock(ctx.user_id);
        let _guard = lock.lock().unwrap();

        let mut groups: Vec<Vec<usize>> = vec![];
        let mut group_of: HashMap<(SyncEntityType, String), usize> = HashMap::new();
        for (index, op) in operations.iter().enumerate() {
            let group = *group_of.entry(op.entity_key()).or_insert_with(|| {
                groups.push(vec![]);
                groups.len() - 1
            });
            groups[group].push(index);
        }

        let mut results: Vec<Option<SyncOperationResult>> = vec![None; operations.len()];
        for group in groups {
            let mut state = GroupState::default();
            for index in group {
                let op = &operations[index];
                let result = self.process(ctx, op, &mut state, now);
                results[index] = Some(result);
            }
        }

        debug!(
            "Applied sync batch of {} operations for user {}",
            operations.len(),
            ctx.user_id
        );
        Ok(SyncBatchResponse {
            results: results.into_iter().flatten().collect(),
            server_time: now,
        })
    }

    fn process(
        &self,
        ctx: &UserContext,
        op: &SyncOperation,
        state: &mut GroupState,
        now: i64,
    ) -> SyncOperationResult {
        match self.records.get_record(ctx.user_id, &op.op_id) {
            Ok(Some(recorded)) => {
                match recorded.status {
                    SyncStatus::Applied => state.applied = true,
                    SyncStatus::Conflict if state.conflict.is_none() => {
                        if let (Some(entity_id), Some(server_version)) =
                            (&recorded.entity_id, &recorded.server_version)
                        {
                            state.conflict = Some((entity_id.clone(), server_version.clone()));
                        }
                    }
                    _ => {}
                }
                return SyncOperationResult {
                    status: SyncStatus::Duplicate,
                    ..recorded
                };
            }
            Ok(None) => {}
            Err(err) => {
                error!("Could not read sync record {}: {:?}", op.op_id, err);
                return SyncOperationResult {
                    op_id: op.op_id.clone(),
                    status: SyncStatus::Failed,
                    entity_id: op.entity_id.clone(),
                    server_version: None,
                    error: Some("sync records unavailable".to_string()),
                };
            }
        }

        let mut transient = false;
        let result = match state.conflict.clone() {
            Some((entity_id, server_version)) => SyncOperationResult {
                op_id: op.op_id.clone(),
                status: SyncStatus::Conflict,
                entity_id: Some(entity_id),
                server_version: Some(server_version),
                error: None,
            },
            None => match self.apply(ctx, op, !state.applied) {
                Ok(Outcome::Applied(entity_id)) => {
                    state.applied = true;
                    SyncOperationResult {
                        op_id: op.op_id.clone(),
                        status: SyncStatus::Applied,
                        entity_id: entity_id.or_else(|| op.entity_id.clone()),
                        server_version: None,
                        error: None,
                    }
                }
                Ok(Outcome::Conflict {
                    entity_id,
                    server_version,
                }) => {
                    state.conflict = Some((entity_id.clone(), server_version.clone()));
                    SyncOperationResult {
                        op_id: op.op_id.clone(),
                        status: SyncStatus::Conflict,
                        entity_id: Some(entity_id),
                        server_version: Some(server_version),
                        error: None,
                    }
                }
                Err(err) => {
                    if let SongbookError::Store(inner) = &err {
                        error!("Sync operation {} hit a store error: {:?}", op.op_id, inner);
                        transient = true;
                    } else {
                        debug!("Sync operation {} failed: {}", op.op_id, err);
                    }
                    SyncOperationResult {
                        op_id: op.op_id.clone(),
                        status: SyncStatus::Failed,
                        entity_id: op.entity_id.clone(),
                        server_version: None,
                        error: Some(err.to_string()),
                    }
                }
            },
        };

        // A store failure may pass, so a resend runs the op again
        if transient {
            return result;
        }
        if let Err(err) = self.records.put_record(ctx.user_id, &result, now) {
            warn!("Could not record sync operation {}: {:?}", op.op_id, err);
        }
        result
    }

    fn apply(&self, ctx: &UserContext, op: &SyncOperation, check: bool) -> SongbookResult<Outcome> {
        match op.entity_type {
            SyncEntityType::Song => self.apply_song(ctx, op, check),
            SyncEntityType::Arrangement => self.apply_arrangement(ctx, op, check),
            SyncEntityType::Setlist => self.apply_setlist(ctx, op, check),
            SyncEntityType::Review => self.apply_review(ctx, op, check),
            SyncEntityType::Favorite => self.apply_favorite(ctx, op),
        }
    }

    fn apply_song(
        &self,
        ctx: &UserContext,
        op: &SyncOperation,
        check: bool,
    ) -> SongbookResult<Outcome> {
        if op.action == SyncAction::Create {
            let song = self
                .songbook
                .create_song(ctx.user_id, parse_data::<NewSong>(op)?)?;
            return Ok(Outcome::Applied(Some(song.id)));
        }

        let id = require_id(op)?;
        let Some(current) = existing(self.songbook.get_song(id))? else {
            return match op.action {
                SyncAction::Delete => Ok(Outcome::Applied(None)),
                _ => Err(SongbookError::not_found("song", id)),
            };
        };
        if let Some(conflict) = stale(op, check, id, &current, current.updated)? {
            return Ok(conflict);
        }
        match op.action {
            SyncAction::Update => {
                self.songbook
                    .update_song(id, ctx, parse_data::<SongUpdate>(op)?)?;
            }
            _ => self.songbook.delete_song(id, ctx)?,
        }
        Ok(Outcome::Applied(None))
    }

    fn apply_arrangement(
        &self,
        ctx: &UserContext,
        op: &SyncOperation,
        check: bool,
    ) -> SongbookResult<Outcome> {
        if op.action == SyncAction::Create {
            let arrangement = self
                .songbook
                .create_arrangement(ctx.user_id, parse_data::<NewArrangement>(op)?)?;
            return Ok(Outcome::Applied(Some(arrangement.id)));
        }

        let id = require_id(op)?;
        let Some(current) = existing(self.songbook.get_arrangement(id))? else {
            return match op.action {
                SyncAction::Delete => Ok(Outcome::Applied(None)),
                _ => Err(SongbookError::not_found("arrangement", id)),
            };
        };
        if let Some(conflict) = stale(op, check, id, &current, current.updated)? {
            return Ok(conflict);
        }
        match op.action {
            SyncAction::Update => {
                self.songbook
                    .update_arrangement(id, ctx, parse_data::<ArrangementUpdate>(op)?)?;
            }
            _ => self.songbook.delete_arrangement(id, ctx)?,
        }
        Ok(Outcome::Applied(None))
    }

    fn apply_setlist(
        &self,
        ctx: &UserContext,
        op: &SyncOperation,
        check: bool,
    ) -> SongbookResult<Outcome> {
        if op.action == SyncAction::Create {
            let setlist = self
                .songbook
                .create_setlist(ctx.user_id, parse_data::<NewSetlist>(op)?)?;
            return Ok(Outcome::Applied(Some(setlist.id)));
        }

        let id = require_id(op)?;
        let Some(current) = existing(self.songbook.get_setlist(id, Some(ctx.user_id)))? else {
            return match op.action {
                SyncAction::Delete => Ok(Outcome::Applied(None)),
                _ => Err(SongbookError::not_found("setlist", id)),
            };
        };
        if let Some(conflict) = stale(op, check, id, &current, current.updated)? {
            return Ok(conflict);
        }
        match op.action {
            SyncAction::Update => {
                self.songbook
                    .update_setlist(id, ctx.user_id, parse_data::<SetlistUpdate>(op)?)?;
            }
            _ => self.songbook.delete_setlist(id, ctx.user_id)?,
        }
        Ok(Outcome::Applied(None))
    }

    fn apply_review(
        &self,
        ctx: &UserContext,
        op: &SyncOperation,
        check: bool,
    ) -> SongbookResult<Outcome> {
        let data = parse_data::<ReviewData>(op)?;
        let target = ReviewTarget {
            target_type: data.target_type,
            target_id: data.target_id,
        };
        let current = self.songbook.get_user_review(ctx.user_id, &target)?;

        if op.action != SyncAction::Create {
            if let Some(review) = &current {
                if let Some(conflict) = stale(op, check, &review.id, review, review.updated)? {
                    return Ok(conflict);
                }
            }
        }

        match op.action {
            SyncAction::Delete => {
                if current.is_some() {
                    self.songbook.delete_review(ctx.user_id, &target)?;
                }
                Ok(Outcome::Applied(current.map(|r| r.id)))
            }
            _ => {
                let rating = data
                    .rating
                    .ok_or_else(|| SongbookError::invalid("rating", "is required"))?;
                let review = self.songbook.upsert_review(
                    ctx.user_id,
                    &target,
                    NewReview {
                        rating,
                        comment: data.comment,
                    },
                )?;
                Ok(Outcome::Applied(Some(review.id)))
            }
        }
    }

    fn apply_favorite(&self, ctx: &UserContext, op: &SyncOperation) -> SongbookResult<Outcome> {
        let data = parse_data::<FavoriteData>(op)?;
        let favorite = match op.action {
            SyncAction::Create => true,
            SyncAction::Delete => false,
            SyncAction::Update => {
                return Err(SongbookError::invalid(
                    "action",
                    "favorites can only be created or deleted",
                ))
            }
        };
        if favorite {
            match data.content_type {
                FavoriteContentType::Song => {
                    self.songbook.get_song(&data.content_id)?;
                }
                FavoriteContentType::Arrangement => {
                    self.songbook.get_arrangement(&data.content_id)?;
                }
            }
        }
        self.user_manager.set_user_favorite(
            ctx.user_id,
            data.content_type,
            &data.content_id,
            favorite,
        )?;
        Ok(Outcome::Applied(Some(data.content_id)))
    }

    /// Forgets processed operations older than the retention period.
    pub fn prune_records(&self, retention_days: u64, now: i64) -> anyhow::Result<usize> {
        let cutoff = now - retention_days as i64 * SECONDS_PER_DAY;
        self.records.prune_records(cutoff)
    }
}
