pub mod client;
mod models;
mod processor;
mod record_store;

pub use models::*;
pub use processor::{SyncProcessor, DEFAULT_MAX_BATCH_SIZE};
pub use record_store::{
    SqliteSyncRecordStore, SyncRecordStore, VERSIONED_SCHEMAS as SYNC_VERSIONED_SCHEMAS,
};
