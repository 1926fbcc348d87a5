// Append-only metric store on SQLite.
// One row per sample; batches are fanned out on save and never stored as a unit.

mod document;

use crate::error::StorageError;
use crate::models::{MetricBatch, MetricType, StoredMetric};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::instrument;

const SELECT_COLUMNS: &str = "id, host_id, type, value, data, timestamp";

pub struct MetricRepo {
    pool: SqlitePool,
}

impl MetricRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS metrics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                host_id TEXT NOT NULL,
                type TEXT NOT NULL,
                value REAL NOT NULL,
                data TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        for ddl in [
            "CREATE INDEX IF NOT EXISTS idx_metrics_host_ts ON metrics(host_id, timestamp DESC)",
            "CREATE INDEX IF NOT EXISTS idx_metrics_type_ts ON metrics(type, timestamp DESC)",
            "CREATE INDEX IF NOT EXISTS idx_metrics_ts ON metrics(timestamp DESC)",
        ] {
            sqlx::query(ddl).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Bulk-appends every sample of the batch, tagged with `batch.host_id`.
    /// Samples keep their own timestamps; stamping is the caller's job.
    /// Runs in one transaction, so a failed save stores none of the batch.
    #[instrument(skip(self, batch), fields(repo = "metrics", operation = "save", host_id = %batch.host_id, samples = batch.metrics.len()))]
    pub async fn save(&self, batch: &MetricBatch) -> Result<(), StorageError> {
        if batch.metrics.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for m in &batch.metrics {
            sqlx::query(
                "INSERT INTO metrics (host_id, type, value, data, timestamp) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(&batch.host_id)
            .bind(m.metric_type().as_str())
            .bind(m.value)
            .bind(document::encode_data(m)?)
            .bind(document::to_millis(m.timestamp))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Samples for `host_id` in `[from, to]`, newest first. `limit <= 0` means unlimited.
    #[instrument(skip(self), fields(repo = "metrics", operation = "query_range"))]
    pub async fn query_range(
        &self,
        host_id: &str,
        metric_type: Option<MetricType>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<StoredMetric>, StorageError> {
        // SQLite treats a negative LIMIT as no limit.
        let limit = if limit > 0 { limit } else { -1 };
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM metrics
             WHERE host_id = $1 AND timestamp >= $2 AND timestamp <= $3 AND ($4 IS NULL OR type = $4)
             ORDER BY timestamp DESC, id DESC
             LIMIT $5"
        );
        let rows = sqlx::query(&sql)
            .bind(host_id)
            .bind(document::to_millis(from))
            .bind(document::to_millis(to))
            .bind(metric_type.map(MetricType::as_str))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(document::parse_row).collect()
    }

    /// Most recent sample per type for `host_id`.
    /// Same-timestamp ties go to the most recently inserted row.
    #[instrument(skip(self), fields(repo = "metrics", operation = "latest_by_type"))]
    pub async fn latest_by_type(
        &self,
        host_id: &str,
    ) -> Result<BTreeMap<MetricType, StoredMetric>, StorageError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM (
                SELECT {SELECT_COLUMNS},
                       ROW_NUMBER() OVER (PARTITION BY type ORDER BY timestamp DESC, id DESC) AS rn
                FROM metrics WHERE host_id = $1
             ) WHERE rn = 1"
        );
        let rows = sqlx::query(&sql).bind(host_id).fetch_all(&self.pool).await?;

        let mut latest = BTreeMap::new();
        for row in &rows {
            let stored = document::parse_row(row)?;
            latest.insert(stored.metric.metric_type(), stored);
        }
        Ok(latest)
    }

    /// Deletes every sample older than `now - older_than`. Returns the deleted count.
    /// A cutoff before the representable time range deletes nothing.
    #[instrument(skip(self), fields(repo = "metrics", operation = "purge"))]
    pub async fn purge(&self, older_than: Duration) -> Result<u64, StorageError> {
        let Some(cutoff) = chrono::Duration::from_std(older_than)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
        else {
            tracing::debug!(
                older_than_secs = older_than.as_secs(),
                "retention exceeds time range, nothing to purge"
            );
            return Ok(0);
        };
        let r = sqlx::query("DELETE FROM metrics WHERE timestamp < $1")
            .bind(document::to_millis(cutoff))
            .execute(&self.pool)
            .await?;
        Ok(r.rows_affected())
    }

    /// Reclaim space after purges.
    #[instrument(skip(self), fields(repo = "metrics", operation = "vacuum"))]
    pub async fn vacuum(&self) -> Result<(), StorageError> {
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }
}
