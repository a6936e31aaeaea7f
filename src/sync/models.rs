//! Wire types of the batch sync endpoint, shared by server and client.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncEntityType {
    Song,
    Arrangement,
    Setlist,
    Review,
    Favorite,
}

impl SyncEntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncEntityType::Song => "song",
            SyncEntityType::Arrangement => "arrangement",
            SyncEntityType::Setlist => "setlist",
            SyncEntityType::Review => "review",
            SyncEntityType::Favorite => "favorite",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncOperation {
    /// Client generated, unique per user. Replays are detected by it.
    pub op_id: String,
    pub entity_type: SyncEntityType,
    #[serde(default)]
    pub entity_id: Option<String>,
    pub action: SyncAction,
    #[serde(default)]
    pub data: serde_json::Value,
    pub client_timestamp: i64,
}

impl SyncOperation {
    /// Operations touching the same entity share a key. A create without an
    /// entity id is its own group.
    pub fn entity_key(&self) -> (SyncEntityType, String) {
        let id = self
            .entity_id
            .clone()
            .unwrap_or_else(|| self.op_id.clone());
        (self.entity_type, id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncBatchRequest {
    pub operations: Vec<SyncOperation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Applied,
    Conflict,
    Failed,
    Duplicate,
}

impl SyncStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncStatus::Applied => "applied",
            SyncStatus::Conflict => "conflict",
            SyncStatus::Failed => "failed",
            SyncStatus::Duplicate => "duplicate",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "applied" => Some(SyncStatus::Applied),
            "conflict" => Some(SyncStatus::Conflict),
            "failed" => Some(SyncStatus::Failed),
            "duplicate" => Some(SyncStatus::Duplicate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncOperationResult {
    pub op_id: String,
    pub status: SyncStatus,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_version: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncBatchResponse {
    pub results: Vec<SyncOperationResult>,
    pub server_time: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn operation_parses_without_optional_fields() {
        let op: SyncOperation = serde_json::from_value(json!({
            "op_id": "op-1",
            "entity_type": "song",
            "action": "create",
            "client_timestamp": 10
        }))
        .unwrap();
        assert_eq!(op.entity_id, None);
        assert!(op.data.is_null());
        assert_eq!(op.entity_key(), (SyncEntityType::Song, "op-1".to_string()));
    }

    #[test]
    fn result_omits_empty_fields() {
        let result = SyncOperationResult {
            op_id: "op-1".to_string(),
            status: SyncStatus::Applied,
            entity_id: Some("s1".to_string()),
            server_version: None,
            error: None,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({"op_id": "op-1", "status": "applied", "entity_id": "s1"})
        );
    }

    #[test]
    fn status_names() {
        for status in [
            SyncStatus::Applied,
            SyncStatus::Conflict,
            SyncStatus::Failed,
            SyncStatus::Duplicate,
        ] {
            assert_eq!(SyncStatus::from_str(status.as_str()), Some(status));
        }
    }
}
