//! Client side of offline sync: queue writes, flush them when online.

use super::queue::{PendingOperation, PendingOperationStore};
use super::retry_policy::RetryPolicy;
use super::transport::SyncTransport;
use crate::sync::models::*;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_CLIENT_BATCH_SIZE: usize = 50;

/// The server kept its own version of an entity. The client should adopt it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConflict {
    pub op_id: String,
    pub entity_type: SyncEntityType,
    pub entity_id: Option<String>,
    pub server_version: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlushReport {
    /// Applied now or earlier (duplicates), with server assigned entity ids.
    pub applied: Vec<SyncOperationResult>,
    pub conflicts: Vec<ResolvedConflict>,
    /// Op ids scheduled for another attempt.
    pub retried: Vec<String>,
    /// Op ids that ran out of attempts.
    pub dead: Vec<String>,
    pub batches_sent: usize,
    /// Set when a batch could not be delivered. Later batches wait for the
    /// next flush.
    pub transport_error: Option<String>,
}

pub struct SyncManager {
    queue: Arc<dyn PendingOperationStore>,
    transport: Arc<dyn SyncTransport>,
    retry_policy: RetryPolicy,
    batch_size: usize,
}

impl SyncManager {
    pub fn new(
        queue: Arc<dyn PendingOperationStore>,
        transport: Arc<dyn SyncTransport>,
        retry_policy: RetryPolicy,
        batch_size: usize,
    ) -> Self {
        Self {
            queue,
            transport,
            retry_policy,
            batch_size: batch_size.max(1),
        }
    }

    pub fn enqueue(&self, op: &SyncOperation, now: i64) -> Result<()> {
        self.queue.push(op, now)
    }

    /// Queues a new operation under a fresh op id and returns the id.
    pub fn enqueue_new(
        &self,
        entity_type: SyncEntityType,
        entity_id: Option<String>,
        action: SyncAction,
        data: serde_json::Value,
        now: i64,
    ) -> Result<String> {
        let op = SyncOperation {
            op_id: uuid::Uuid::new_v4().to_string(),
            entity_type,
            entity_id,
            action,
            data,
            client_timestamp: now,
        };
        self.queue.push(&op, now)?;
        Ok(op.op_id)
    }

    pub fn pending_count(&self) -> Result<usize> {
        self.queue.pending_count()
    }

    pub fn dead_operations(&self) -> Result<Vec<PendingOperation>> {
        self.queue.list_dead()
    }

    pub fn discard_dead(&self) -> Result<usize> {
        self.queue.discard_dead()
    }

    /// Groups live operations by entity, keeping enqueue order. A group is
    /// sent only when its first operation is due, so an entity's writes never
    /// overtake each other.
    fn due_groups(&self, now: i64) -> Result<Vec<Vec<PendingOperation>>> {
        let mut groups: Vec<Vec<PendingOperation>> = vec![];
        let mut group_of: HashMap<(SyncEntityType, String), usize> = HashMap::new();
        for pending in self.queue.list_pending()? {
            let index = *group_of.entry(pending.op.entity_key()).or_insert_with(|| {
                groups.push(vec![]);
                groups.len() - 1
            });
            groups[index].push(pending);
        }
        groups.retain(|group| group.first().is_some_and(|first| first.is_due(now)));
        Ok(groups)
    }

    /// Packs whole groups into batches. A group larger than a batch is split
    /// over consecutive batches.
    fn into_batches(&self, groups: Vec<Vec<PendingOperation>>) -> Vec<Vec<PendingOperation>> {
        let mut batches: Vec<Vec<PendingOperation>> = vec![];
        let mut current: Vec<PendingOperation> = vec![];
        for group in groups {
            if !current.is_empty() && current.len() + group.len() > self.batch_size {
                batches.push(std::mem::take(&mut current));
            }
            for pending in group {
                if current.len() == self.batch_size {
                    batches.push(std::mem::take(&mut current));
                }
                current.push(pending);
            }
        }
        if !current.is_empty() {
            batches.push(current);
        }
        batches
    }

    fn fail(
        &self,
        pending: &PendingOperation,
        error: &str,
        retryable: bool,
        now: i64,
        report: &mut FlushReport,
    ) -> Result<()> {
        let attempts = pending.attempts + 1;
        let next_attempt_at = if retryable {
            self.retry_policy.next_attempt_at(attempts, now)
        } else {
            None
        };
        self.queue
            .record_failure(&pending.op.op_id, error, next_attempt_at)?;
        match next_attempt_at {
            Some(_) => report.retried.push(pending.op.op_id.clone()),
            None => {
                warn!(
                    "Sync operation {} gave up after {} attempts: {}",
                    pending.op.op_id, attempts, error
                );
                report.dead.push(pending.op.op_id.clone());
            }
        }
        Ok(())
    }

    /// Sends every due operation and settles the queue from the results.
    pub async fn flush(&self, now: i64) -> Result<FlushReport> {
        let mut report = FlushReport::default();
        let batches = self.into_batches(self.due_groups(now)?);

        for batch in batches {
            let request = SyncBatchRequest {
                operations: batch.iter().map(|p| p.op.clone()).collect(),
            };
            let response = match self.transport.send(&request).await {
                Ok(response) => response,
                Err(err) => {
                    let error = err.to_string();
                    warn!("Sync batch not delivered: {}", error);
                    for pending in &batch {
                        self.fail(pending, &error, true, now, &mut report)?;
                    }
                    report.transport_error = Some(error);
                    break;
                }
            };
            report.batches_sent += 1;

            let mut results: HashMap<String, SyncOperationResult> = response
                .results
                .into_iter()
                .map(|r| (r.op_id.clone(), r))
                .collect();
            let mut settled: Vec<String> = vec![];
            for pending in &batch {
                let Some(result) = results.remove(&pending.op.op_id) else {
                    self.fail(pending, "no result from server", true, now, &mut report)?;
                    continue;
                };
                match result.status {
                    SyncStatus::Conflict => {
                        settled.push(result.op_id.clone());
                        report.conflicts.push(ResolvedConflict {
                            op_id: result.op_id,
                            entity_type: pending.op.entity_type,
                            entity_id: result.entity_id,
                            server_version: result.server_version,
                        });
                    }
                    SyncStatus::Duplicate if result.server_version.is_some() => {
                        settled.push(result.op_id.clone());
                        report.conflicts.push(ResolvedConflict {
                            op_id: result.op_id,
                            entity_type: pending.op.entity_type,
                            entity_id: result.entity_id,
                            server_version: result.server_version,
                        });
                    }
                    // The server already refused this op id and will keep
                    // answering the same way.
                    SyncStatus::Duplicate if result.error.is_some() => {
                        let error = result.error.unwrap_or_default();
                        self.fail(pending, &error, false, now, &mut report)?;
                    }
                    SyncStatus::Applied | SyncStatus::Duplicate => {
                        settled.push(result.op_id.clone());
                        report.applied.push(result);
                    }
                    SyncStatus::Failed => {
                        let error = result
                            .error
                            .unwrap_or_else(|| "rejected by server".to_string());
                        self.fail(pending, &error, true, now, &mut report)?;
                    }
                }
            }
            self.queue.remove(&settled)?;
        }

        if report.batches_sent > 0 {
            info!(
                "Sync flush: {} applied, {} conflicts, {} retried, {} dead",
                report.applied.len(),
                report.conflicts.len(),
                report.retried.len(),
                report.dead.len()
            );
        } else {
            debug!("Sync flush had nothing to send");
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::client::queue::SqliteOperationQueue;
    use crate::sync::client::transport::SyncTransportError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::TempDir;

    enum Reply {
        Statuses(Vec<SyncStatus>),
        Down,
    }

    /// Answers each batch with the next scripted reply and remembers what it got.
    struct ScriptedTransport {
        replies: Mutex<VecDeque<Reply>>,
        sent: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<Reply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                sent: Mutex::new(vec![]),
            })
        }

        fn sent(&self) -> Vec<Vec<String>> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SyncTransport for ScriptedTransport {
        async fn send(
            &self,
            batch: &SyncBatchRequest,
        ) -> Result<SyncBatchResponse, SyncTransportError> {
            let op_ids: Vec<String> = batch.operations.iter().map(|o| o.op_id.clone()).collect();
            self.sent.lock().unwrap().push(op_ids.clone());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Reply::Statuses(vec![]));
            match reply {
                Reply::Down => Err(SyncTransportError::Rejected {
                    status: 503,
                    body: "unavailable".to_string(),
                }),
                Reply::Statuses(statuses) => Ok(SyncBatchResponse {
                    results: op_ids
                        .into_iter()
                        .zip(statuses)
                        .map(|(op_id, status)| SyncOperationResult {
                            op_id,
                            status,
                            entity_id: Some("server-id".to_string()),
                            server_version: (status == SyncStatus::Conflict)
                                .then(|| json!({"title": "server"})),
                            error: (status == SyncStatus::Failed).then(|| "nope".to_string()),
                        })
                        .collect(),
                    server_time: 0,
                }),
            }
        }
    }

    fn manager(transport: Arc<ScriptedTransport>, batch_size: usize) -> (SyncManager, TempDir) {
        let dir = TempDir::new().unwrap();
        let queue = Arc::new(SqliteOperationQueue::new(dir.path().join("queue.db")).unwrap());
        (
            SyncManager::new(queue, transport, RetryPolicy::new(10, 3), batch_size),
            dir,
        )
    }

    fn op(op_id: &str, entity_id: &str) -> SyncOperation {
        SyncOperation {
            op_id: op_id.to_string(),
            entity_type: SyncEntityType::Song,
            entity_id: Some(entity_id.to_string()),
            action: SyncAction::Update,
            data: json!({}),
            client_timestamp: 0,
        }
    }

    #[tokio::test]
    async fn settles_applied_and_conflicts() {
        let transport = ScriptedTransport::new(vec![Reply::Statuses(vec![
            SyncStatus::Applied,
            SyncStatus::Conflict,
            SyncStatus::Duplicate,
        ])]);
        let (manager, _dir) = manager(transport.clone(), 10);
        manager.enqueue(&op("a", "s1"), 0).unwrap();
        manager.enqueue(&op("b", "s2"), 0).unwrap();
        manager.enqueue(&op("c", "s3"), 0).unwrap();

        let report = manager.flush(0).await.unwrap();
        assert_eq!(report.batches_sent, 1);
        assert_eq!(report.applied.len(), 2);
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(
            report.conflicts[0].server_version,
            Some(json!({"title": "server"}))
        );
        assert_eq!(manager.pending_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn keeps_entity_groups_together() {
        let transport = ScriptedTransport::new(vec![
            Reply::Statuses(vec![SyncStatus::Applied; 2]),
            Reply::Statuses(vec![SyncStatus::Applied; 2]),
        ]);
        let (manager, _dir) = manager(transport.clone(), 2);
        manager.enqueue(&op("a1", "a"), 0).unwrap();
        manager.enqueue(&op("b1", "b"), 0).unwrap();
        manager.enqueue(&op("a2", "a"), 0).unwrap();

        manager.flush(0).await.unwrap();
        assert_eq!(
            transport.sent(),
            vec![
                vec!["a1".to_string(), "a2".to_string()],
                vec!["b1".to_string()]
            ]
        );
    }

    #[tokio::test]
    async fn retries_until_dead() {
        let transport = ScriptedTransport::new(vec![
            Reply::Down,
            Reply::Statuses(vec![SyncStatus::Failed]),
            Reply::Down,
        ]);
        let (manager, _dir) = manager(transport.clone(), 10);
        manager.enqueue(&op("a", "s1"), 0).unwrap();

        let report = manager.flush(0).await.unwrap();
        assert_eq!(report.retried, vec!["a".to_string()]);
        assert!(report.transport_error.is_some());

        // Not due yet.
        let report = manager.flush(5).await.unwrap();
        assert_eq!(report, FlushReport::default());

        let report = manager.flush(10).await.unwrap();
        assert_eq!(report.retried, vec!["a".to_string()]);

        let report = manager.flush(100).await.unwrap();
        assert_eq!(report.dead, vec!["a".to_string()]);
        assert_eq!(transport.sent().len(), 3);

        assert_eq!(manager.pending_count().unwrap(), 0);
        let dead = manager.dead_operations().unwrap();
        assert_eq!(dead[0].attempts, 3);
        assert_eq!(manager.discard_dead().unwrap(), 1);

        manager.flush(1_000).await.unwrap();
        assert_eq!(transport.sent().len(), 3);
    }

    #[tokio::test]
    async fn transport_error_stops_the_flush() {
        let transport = ScriptedTransport::new(vec![Reply::Down]);
        let (manager, _dir) = manager(transport.clone(), 1);
        manager.enqueue(&op("a", "s1"), 0).unwrap();
        manager.enqueue(&op("b", "s2"), 0).unwrap();

        let report = manager.flush(0).await.unwrap();
        assert_eq!(transport.sent().len(), 1);
        assert_eq!(report.retried, vec!["a".to_string()]);
        assert_eq!(manager.pending_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn enqueue_new_assigns_op_ids() {
        let transport = ScriptedTransport::new(vec![]);
        let (manager, _dir) = manager(transport, 10);
        let first = manager
            .enqueue_new(SyncEntityType::Song, None, SyncAction::Create, json!({"title": "A"}), 7)
            .unwrap();
        let second = manager
            .enqueue_new(SyncEntityType::Song, None, SyncAction::Create, json!({"title": "B"}), 7)
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(manager.pending_count().unwrap(), 2);
    }
}
