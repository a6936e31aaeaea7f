//! Persistent queue of operations waiting to reach the server.

use crate::sqlite_column;
use crate::sqlite_persistence::{open_versioned, SqlType, Table, VersionedSchema};
use crate::sync::models::SyncOperation;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// V 0
const PENDING_OPERATION_TABLE_V_0: Table = Table {
    name: "pending_operation",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("op_id", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("operation", &SqlType::Text, non_null = true),
        sqlite_column!(
            "attempts",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("next_attempt_at", &SqlType::Integer, non_null = true),
        sqlite_column!("last_error", &SqlType::Text),
        sqlite_column!(
            "dead",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("enqueued_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_pending_operation_dead", "dead")],
    unique_constraints: &[],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[PENDING_OPERATION_TABLE_V_0],
    migration: None,
}];

const PENDING_COLUMNS: &str = "operation, attempts, next_attempt_at, last_error, dead, enqueued_at";

#[derive(Debug, Clone, PartialEq)]
pub struct PendingOperation {
    pub op: SyncOperation,
    pub attempts: u32,
    pub next_attempt_at: i64,
    pub last_error: Option<String>,
    /// Set once the operation has used all its attempts.
    pub dead: bool,
    pub enqueued_at: i64,
}

impl PendingOperation {
    pub fn is_due(&self, now: i64) -> bool {
        !self.dead && self.next_attempt_at <= now
    }
}

pub trait PendingOperationStore: Send + Sync {
    /// Appends an operation. Pushing an op id that is already queued is a no-op.
    fn push(&self, op: &SyncOperation, now: i64) -> Result<()>;

    /// Live operations in enqueue order.
    fn list_pending(&self) -> Result<Vec<PendingOperation>>;

    fn remove(&self, op_ids: &[String]) -> Result<usize>;

    /// Counts a failed attempt. `next_attempt_at` of None marks the
    /// operation dead.
    fn record_failure(&self, op_id: &str, error: &str, next_attempt_at: Option<i64>)
        -> Result<()>;

    fn pending_count(&self) -> Result<usize>;

    fn list_dead(&self) -> Result<Vec<PendingOperation>>;

    fn discard_dead(&self) -> Result<usize>;
}

fn parse_pending_row(row: &Row) -> rusqlite::Result<(String, u32, i64, Option<String>, bool, i64)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get::<usize, i32>(4)? != 0,
        row.get(5)?,
    ))
}

#[derive(Clone)]
pub struct SqliteOperationQueue {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteOperationQueue {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn =
            open_versioned(db_path, VERSIONED_SCHEMAS).context("Failed to open sync queue db")?;
        Ok(SqliteOperationQueue {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn query_operations(&self, dead: bool) -> Result<Vec<PendingOperation>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} WHERE dead = ?1 ORDER BY id",
            PENDING_COLUMNS, PENDING_OPERATION_TABLE_V_0.name
        ))?;
        let rows = stmt
            .query_map(params![dead as i32], parse_pending_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(
                |(operation, attempts, next_attempt_at, last_error, dead, enqueued_at)| {
                    let op = serde_json::from_str::<SyncOperation>(&operation)
                        .context("Corrupted operation in sync queue")?;
                    Ok(PendingOperation {
                        op,
                        attempts,
                        next_attempt_at,
                        last_error,
                        dead,
                        enqueued_at,
                    })
                },
            )
            .collect()
    }
}

impl PendingOperationStore for SqliteOperationQueue {
    fn push(&self, op: &SyncOperation, now: i64) -> Result<()> {
        let operation = serde_json::to_string(op)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {} (op_id, operation, next_attempt_at, enqueued_at) VALUES (?1, ?2, ?3, ?3)",
                PENDING_OPERATION_TABLE_V_0.name
            ),
            params![op.op_id, operation, now],
        )?;
        Ok(())
    }

    fn list_pending(&self) -> Result<Vec<PendingOperation>> {
        self.query_operations(false)
    }

    fn remove(&self, op_ids: &[String]) -> Result<usize> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let mut removed = 0;
        for op_id in op_ids {
            removed += tx.execute(
                &format!(
                    "DELETE FROM {} WHERE op_id = ?1",
                    PENDING_OPERATION_TABLE_V_0.name
                ),
                params![op_id],
            )?;
        }
        tx.commit()?;
        Ok(removed)
    }

    fn record_failure(
        &self,
        op_id: &str,
        error: &str,
        next_attempt_at: Option<i64>,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "UPDATE {} SET attempts = attempts + 1, last_error = ?2,
                 next_attempt_at = COALESCE(?3, next_attempt_at), dead = ?4 WHERE op_id = ?1",
                PENDING_OPERATION_TABLE_V_0.name
            ),
            params![op_id, error, next_attempt_at, next_attempt_at.is_none() as i32],
        )?;
        Ok(())
    }

    fn pending_count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: usize = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE dead = 0",
                PENDING_OPERATION_TABLE_V_0.name
            ),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn list_dead(&self) -> Result<Vec<PendingOperation>> {
        self.query_operations(true)
    }

    fn discard_dead(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.execute(
            &format!(
                "DELETE FROM {} WHERE dead = 1",
                PENDING_OPERATION_TABLE_V_0.name
            ),
            [],
        )?)
    }
}
