//! Per-user record of processed sync operations, used to answer replays.

use super::models::{SyncOperationResult, SyncStatus};
use crate::sqlite_column;
use crate::sqlite_persistence::{open_versioned, SqlType, Table, VersionedSchema};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// V 0
const SYNC_RECORD_TABLE_V_0: Table = Table {
    name: "sync_record",
    columns: &[
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("op_id", &SqlType::Text, non_null = true),
        sqlite_column!("status", &SqlType::Text, non_null = true),
        sqlite_column!("entity_id", &SqlType::Text),
        sqlite_column!("server_version", &SqlType::Text),
        sqlite_column!("error", &SqlType::Text),
        sqlite_column!("created", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_sync_record_created", "created")],
    unique_constraints: &[&["user_id", "op_id"]],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[SYNC_RECORD_TABLE_V_0],
    migration: None,
}];

pub trait SyncRecordStore: Send + Sync {
    fn get_record(&self, user_id: usize, op_id: &str) -> Result<Option<SyncOperationResult>>;

    /// Stores the outcome of an operation. A record for the same op is kept
    /// as is.
    fn put_record(&self, user_id: usize, result: &SyncOperationResult, now: i64) -> Result<()>;

    /// Deletes records created before `older_than`. Returns how many went.
    fn prune_records(&self, older_than: i64) -> Result<usize>;
}

#[derive(Clone)]
pub struct SqliteSyncRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSyncRecordStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn =
            open_versioned(db_path, VERSIONED_SCHEMAS).context("Failed to open sync db")?;
        Ok(SqliteSyncRecordStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl SyncRecordStore for SqliteSyncRecordStore {
    fn get_record(&self, user_id: usize, op_id: &str) -> Result<Option<SyncOperationResult>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                &format!(
                    "SELECT status, entity_id, server_version, error FROM {} WHERE user_id = ?1 AND op_id = ?2",
                    SYNC_RECORD_TABLE_V_0.name
                ),
                params![user_id, op_id],
                |row| {
                    Ok((
                        row.get::<usize, String>(0)?,
                        row.get::<usize, Option<String>>(1)?,
                        row.get::<usize, Option<String>>(2)?,
                        row.get::<usize, Option<String>>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((status, entity_id, server_version, error)) = row else {
            return Ok(None);
        };
        let status = SyncStatus::from_str(&status)
            .with_context(|| format!("Unknown sync status {} in record {}", status, op_id))?;
        let server_version = server_version
            .map(|v| serde_json::from_str::<serde_json::Value>(&v))
            .transpose()
            .context("Corrupted server version in sync record")?;
        Ok(Some(SyncOperationResult {
            op_id: op_id.to_string(),
            status,
            entity_id,
            server_version,
            error,
        }))
    }

    fn put_record(&self, user_id: usize, result: &SyncOperationResult, now: i64) -> Result<()> {
        let server_version = result
            .server_version
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {} (user_id, op_id, status, entity_id, server_version, error, created) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                SYNC_RECORD_TABLE_V_0.name
            ),
            params![
                user_id,
                result.op_id,
                result.status.as_str(),
                result.entity_id,
                server_version,
                result.error,
                now
            ],
        )?;
        Ok(())
    }

    fn prune_records(&self, older_than: i64) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            &format!(
                "DELETE FROM {} WHERE created < ?1",
                SYNC_RECORD_TABLE_V_0.name
            ),
            params![older_than],
        )?;
        debug!("Pruned {} sync records older than {}", deleted, older_than);
        Ok(deleted)
    }
}
