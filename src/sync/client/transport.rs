//! Delivery of sync batches to the server.

use crate::sync::models::{SyncBatchRequest, SyncBatchResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

pub const SYNC_BATCH_PATH: &str = "/v1/sync/batch";

#[derive(Debug, thiserror::Error)]
pub enum SyncTransportError {
    #[error("sync request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("server rejected the batch with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait SyncTransport: Send + Sync {
    async fn send(&self, batch: &SyncBatchRequest)
        -> Result<SyncBatchResponse, SyncTransportError>;
}

/// Posts batches to a songbook server, authenticated by a session token.
#[derive(Clone)]
pub struct HttpSyncTransport {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpSyncTransport {
    /// # Arguments
    /// * `base_url` - Server address, e.g. "http://localhost:3001"
    /// * `token` - Session token sent in the Authorization header
    /// * `timeout_secs` - Request timeout in seconds
    pub fn new(base_url: String, token: String, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl SyncTransport for HttpSyncTransport {
    async fn send(
        &self,
        batch: &SyncBatchRequest,
    ) -> Result<SyncBatchResponse, SyncTransportError> {
        let url = format!("{}{}", self.base_url, SYNC_BATCH_PATH);
        debug!("Sending {} sync operations to {}", batch.operations.len(), url);
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, &self.token)
            .json(batch)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncTransportError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}
