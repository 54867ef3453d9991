//! Network throughput probe
//!
//! Before estimating a batch size the pipeline measures upload throughput by
//! timing a fixed-size POST against the destination. A probe failure is fatal
//! in estimation mode: without a speed reading the estimate would be a guess.

use crate::error::{ImportError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio::time::Instant;

/// Size of the timed upload payload
pub const PROBE_PAYLOAD_BYTES: usize = 1024 * 1024;

/// Timeout for the probe request in seconds
const PROBE_TIMEOUT_SECS: u64 = 60;

/// Measures upload throughput to the destination
#[async_trait]
pub trait NetworkProbe: Send + Sync {
    /// Upload throughput in MB/s
    async fn upload_speed_mb(&self) -> Result<f64>;
}

/// Probe that times a fixed payload POST against the destination
pub struct HttpProbe {
    client: Client,
    base_url: String,
}

impl HttpProbe {
    pub fn new(base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .build()
            .map_err(|e| ImportError::config(format!("invalid HTTP client: {e}")))?;
        Ok(Self { client, base_url })
    }

    fn probe_url(&self) -> String {
        format!("{}/1/probe", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl NetworkProbe for HttpProbe {
    async fn upload_speed_mb(&self) -> Result<f64> {
        let payload = vec![0u8; PROBE_PAYLOAD_BYTES];
        let started = Instant::now();

        let response = self
            .client
            .post(self.probe_url())
            .body(payload)
            .send()
            .await
            .map_err(|e| ImportError::source_read(format!("throughput probe failed: {e}")))?;

        response
            .error_for_status()
            .map_err(|e| ImportError::source_read(format!("throughput probe failed: {e}")))?;

        let elapsed = started.elapsed().as_secs_f64().max(f64::EPSILON);
        let megabytes = PROBE_PAYLOAD_BYTES as f64 / (1024.0 * 1024.0);
        Ok(megabytes / elapsed)
    }
}

/// Probe that reports a known throughput without touching the network.
///
/// Used when the caller already knows the link speed, and by tests.
pub struct FixedProbe(pub f64);

#[async_trait]
impl NetworkProbe for FixedProbe {
    async fn upload_speed_mb(&self) -> Result<f64> {
        Ok(self.0)
    }
}
