use axum::extract::FromRef;

use crate::songbook::SongbookStore;
use crate::sync::SyncProcessor;
use crate::user::UserManager;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedSongbookStore = Arc<dyn SongbookStore>;
pub type GuardedUserManager = Arc<UserManager>;
pub type GuardedSyncProcessor = Arc<SyncProcessor>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub songbook: GuardedSongbookStore,
    pub user_manager: GuardedUserManager,
    pub sync_processor: GuardedSyncProcessor,
    pub hash: String,
}

impl FromRef<ServerState> for GuardedSongbookStore {
    fn from_ref(input: &ServerState) -> Self {
        input.songbook.clone()
    }
}

impl FromRef<ServerState> for GuardedUserManager {
    fn from_ref(input: &ServerState) -> Self {
        input.user_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedSyncProcessor {
    fn from_ref(input: &ServerState) -> Self {
        input.sync_processor.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
