//! Songbook Server Library
//!
//! Songs, ChordPro arrangements, setlists and the batch sync protocol, with
//! the HTTP server and the offline sync client built on top.

pub mod categories;
pub mod chordpro;
pub mod config;
pub mod server;
pub mod songbook;
pub mod sqlite_persistence;
pub mod sync;
pub mod user;

// Re-export commonly used types for convenience
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
pub use songbook::{SongbookError, SongbookStore, SqliteSongbookStore};
pub use sync::{SqliteSyncRecordStore, SyncProcessor};
pub use user::{SqliteUserStore, UserManager, UserRole, UserStore};
