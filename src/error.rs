// Error taxonomy for the collection-and-delivery pipeline.
// Agent side: CollectionError (fatal per cycle), TransportError (retryable).
// Server side: ValidationError (4xx, never retried), StorageError (5xx, never retried).

use thiserror::Error;

/// A sensor read failed; the whole cycle is abandoned.
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("cpu read failed: {0}")]
    Cpu(String),

    #[error("memory read failed: {0}")]
    Memory(String),

    #[error("collector task failed: {0}")]
    Task(String),
}

/// One delivery attempt failed. Every variant is treated as retryable.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Transport failure, timeout, or a batch reqwest could not encode.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status code: {0}")]
    Status(u16),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Request(e) if e.is_timeout())
    }
}

/// Rejected at the ingestion boundary.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid request data: {0}")]
    Malformed(String),

    #[error("host not found: {0}")]
    UnknownHost(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("document encoding error: {0}")]
    Document(#[from] serde_json::Error),

    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

/// Outcome of `Ingestor::receive` when the batch is not stored.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
