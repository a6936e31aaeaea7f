//! Offline sync client: a persistent queue of writes flushed to the server.

mod manager;
mod queue;
mod retry_policy;
mod transport;

pub use manager::{FlushReport, ResolvedConflict, SyncManager, DEFAULT_CLIENT_BATCH_SIZE};
pub use queue::{
    PendingOperation, PendingOperationStore, SqliteOperationQueue,
    VERSIONED_SCHEMAS as QUEUE_VERSIONED_SCHEMAS,
};
pub use retry_policy::RetryPolicy;
pub use transport::{HttpSyncTransport, SyncTransport, SyncTransportError, SYNC_BATCH_PATH};
