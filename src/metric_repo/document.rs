// Row <-> document mapping for the metrics table.
// `data` is a JSON document; `timestamp` is Unix milliseconds.

use crate::error::StorageError;
use crate::models::{Metric, MetricData, MetricType, StoredMetric};
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

pub(super) fn encode_data(metric: &Metric) -> Result<String, StorageError> {
    Ok(serde_json::to_string(&metric.data.to_json()?)?)
}

pub(super) fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, StorageError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StorageError::InvalidRecord(format!("timestamp out of range: {ms}")))
}

pub(super) fn parse_row(row: &SqliteRow) -> Result<StoredMetric, StorageError> {
    let id: i64 = row.try_get("id")?;
    let host_id: String = row.try_get("host_id")?;
    let type_name: String = row.try_get("type")?;
    let value: f64 = row.try_get("value")?;
    let data: String = row.try_get("data")?;
    let timestamp: i64 = row.try_get("timestamp")?;

    let metric_type: MetricType = type_name
        .parse()
        .map_err(|e: String| StorageError::InvalidRecord(format!("row {id}: {e}")))?;
    let data = MetricData::from_json(metric_type, serde_json::from_str(&data)?)?;

    Ok(StoredMetric {
        id,
        host_id,
        metric: Metric::new(data, value, from_millis(timestamp)?),
    })
}
