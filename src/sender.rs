// Delivery client: one POST /api/metrics attempt per call.
// Retry policy lives in the scheduler; this only reports whether the attempt was acknowledged.

use crate::error::TransportError;
use crate::models::MetricBatch;
use crate::version::{NAME, VERSION};
use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use tracing::instrument;

/// Path of the ingestion endpoint, relative to the monitoring center base URL.
pub const METRICS_PATH: &str = "/api/metrics";

/// Transmits a batch once. Must be safe to call from concurrent cycles.
pub trait Deliver: Send + Sync + 'static {
    fn send(&self, batch: &MetricBatch) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Posts batches as JSON and expects `202 Accepted`.
pub struct HttpSender {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSender {
    /// `base_url` is the monitoring center root, e.g. `http://localhost:8080`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("{}-agent/{}", NAME, VERSION))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), METRICS_PATH),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Deliver for HttpSender {
    #[instrument(skip(self, batch), fields(host_id = %batch.host_id, samples = batch.metrics.len()))]
    async fn send(&self, batch: &MetricBatch) -> Result<(), TransportError> {
        let response = self.client.post(&self.endpoint).json(batch).send().await?;

        let status = response.status();
        if status != StatusCode::ACCEPTED {
            return Err(TransportError::Status(status.as_u16()));
        }
        Ok(())
    }
}
