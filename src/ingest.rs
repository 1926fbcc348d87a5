// Server-side intake of agent batches: validate, resolve host, stamp, bulk-insert.
// Out-of-order batches from overlapping agent cycles are stored as-is.

use crate::error::{IngestError, ValidationError};
use crate::host_repo::HostRepo;
use crate::metric_repo::MetricRepo;
use crate::models::MetricBatch;
use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;

#[derive(Clone)]
pub struct Ingestor {
    hosts: Arc<HostRepo>,
    metrics: Arc<MetricRepo>,
}

impl Ingestor {
    pub fn new(hosts: Arc<HostRepo>, metrics: Arc<MetricRepo>) -> Self {
        Self { hosts, metrics }
    }

    /// Decodes a raw request body. Any JSON or schema error is a malformed batch.
    pub fn decode(body: &[u8]) -> Result<MetricBatch, ValidationError> {
        serde_json::from_slice(body).map_err(|e| ValidationError::Malformed(e.to_string()))
    }

    /// Stores the whole batch and returns the accepted sample count.
    ///
    /// Every sample is stamped with the batch timestamp (or now, when unset)
    /// before a single bulk insert; there is no partial acceptance.
    #[instrument(skip(self, batch), fields(host_id = %batch.host_id, samples = batch.metrics.len()))]
    pub async fn receive(&self, mut batch: MetricBatch) -> Result<usize, IngestError> {
        if batch.host_id.trim().is_empty() {
            return Err(ValidationError::Malformed("host_id is required".into()).into());
        }
        if !self.hosts.exists(&batch.host_id).await? {
            return Err(ValidationError::UnknownHost(batch.host_id).into());
        }

        let stamp = batch.effective_timestamp(Utc::now());
        for m in &mut batch.metrics {
            m.timestamp = stamp;
        }
        batch.timestamp = Some(stamp);

        self.metrics.save(&batch).await?;
        let count = batch.metrics.len();
        tracing::debug!(count, "batch stored");
        Ok(count)
    }
}
