//! Upload destinations
//!
//! The pipeline talks to the remote index through the [`Destination`] trait;
//! the HTTP implementation posts batches to the index's batch endpoint and
//! classifies failures so the retry coordinator only sees timeout-class
//! errors.

use crate::error::{ImportError, Result, UploadError};
use crate::record::Record;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

// ============================================================================
// Destination Client Constants
// ============================================================================

/// Default timeout for upload requests in seconds.
/// Can be overridden via SIPHON_UPLOAD_TIMEOUT_SECS.
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 30;

/// Accepts batches of records for indexing
#[async_trait]
pub trait Destination: Send + Sync {
    /// Upload one batch; record order within the batch is preserved
    async fn upload(&self, records: &[Record]) -> std::result::Result<(), UploadError>;
}

/// HTTP destination client for a remote search index
pub struct HttpDestination {
    client: Client,
    base_url: String,
    app_id: String,
    api_key: String,
    index_name: String,
}

impl HttpDestination {
    /// Create a new destination client
    pub fn new(
        base_url: String,
        app_id: String,
        api_key: String,
        index_name: String,
    ) -> Result<Self> {
        let timeout_secs = std::env::var("SIPHON_UPLOAD_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_UPLOAD_TIMEOUT_SECS);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ImportError::config(format!("invalid HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            app_id,
            api_key,
            index_name,
        })
    }

    fn batch_url(&self) -> String {
        format!(
            "{}/1/indexes/{}/batch",
            self.base_url.trim_end_matches('/'),
            self.index_name
        )
    }
}

#[async_trait]
impl Destination for HttpDestination {
    async fn upload(&self, records: &[Record]) -> std::result::Result<(), UploadError> {
        let requests: Vec<_> = records
            .iter()
            .map(|record| json!({ "action": "addObject", "body": record }))
            .collect();

        let response = self
            .client
            .post(self.batch_url())
            .header("X-Application-Id", &self.app_id)
            .header("X-API-Key", &self.api_key)
            .json(&json!({ "requests": requests }))
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        match status.as_u16() {
            // Request Timeout / Gateway Timeout are timeout-class and retryable
            408 | 504 => Err(UploadError::Timeout(format!("HTTP {status}: {message}"))),
            code => Err(UploadError::Rejected {
                status: code,
                message,
            }),
        }
    }
}

fn classify_transport_error(err: reqwest::Error) -> UploadError {
    if err.is_timeout() {
        UploadError::Timeout(err.to_string())
    } else {
        UploadError::Network(err.to_string())
    }
}
