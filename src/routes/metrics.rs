// Metric ingestion (agents) and query (operators) handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use super::{AppState, error_response};
use crate::error::{IngestError, ValidationError};
use crate::ingest::Ingestor;
use crate::models::MetricType;

const DEFAULT_QUERY_LIMIT: i64 = 100;
const DEFAULT_QUERY_WINDOW_HOURS: i64 = 24;

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        match self {
            IngestError::Validation(ValidationError::Malformed(details)) => (
                StatusCode::BAD_REQUEST,
                axum::Json(serde_json::json!({
                    "error": "Invalid request data",
                    "details": details,
                })),
            )
                .into_response(),
            IngestError::Validation(ValidationError::UnknownHost(_)) => {
                error_response(StatusCode::NOT_FOUND, "Host not found")
            }
            IngestError::Storage(e) => {
                tracing::warn!(error = %e, operation = "receive_metrics", "storage failure");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save metrics")
            }
        }
    }
}

/// POST /api/metrics: 202 with the accepted count.
pub(super) async fn receive_metrics(State(state): State<AppState>, body: Bytes) -> Response {
    let batch = match Ingestor::decode(&body) {
        Ok(b) => b,
        Err(e) => return IngestError::from(e).into_response(),
    };
    match state.ingestor.receive(batch).await {
        Ok(count) => (
            StatusCode::ACCEPTED,
            axum::Json(serde_json::json!({
                "message": "Metrics received successfully",
                "count": count,
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct MetricsQuery {
    #[serde(rename = "type")]
    metric_type: Option<String>,
    from: Option<String>,
    to: Option<String>,
    limit: Option<String>,
}

/// Parsed query; defaults: last 24 hours, limit 100, all types.
#[derive(Debug)]
struct RangeQuery {
    metric_type: Option<MetricType>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    limit: i64,
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl MetricsQuery {
    fn resolve(&self, now: DateTime<Utc>) -> Result<RangeQuery, &'static str> {
        let metric_type = non_empty(&self.metric_type)
            .map(|t| t.parse::<MetricType>())
            .transpose()
            .map_err(|_| "Invalid metric type")?;
        let from = match non_empty(&self.from) {
            Some(s) => parse_rfc3339(s).ok_or("Invalid from date format")?,
            None => now - Duration::hours(DEFAULT_QUERY_WINDOW_HOURS),
        };
        let to = match non_empty(&self.to) {
            Some(s) => parse_rfc3339(s).ok_or("Invalid to date format")?,
            None => now,
        };
        let limit = match non_empty(&self.limit) {
            Some(s) => s.parse::<i64>().map_err(|_| "Invalid limit")?,
            None => DEFAULT_QUERY_LIMIT,
        };
        Ok(RangeQuery {
            metric_type,
            from,
            to,
            limit,
        })
    }
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// GET /api/hosts/{id}/metrics?type=&from=&to=&limit=: newest first.
pub(super) async fn host_metrics(
    State(state): State<AppState>,
    Path(host_id): Path<String>,
    Query(query): Query<MetricsQuery>,
) -> Response {
    let range = match query.resolve(Utc::now()) {
        Ok(r) => r,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, msg),
    };
    match state
        .metric_repo
        .query_range(&host_id, range.metric_type, range.from, range.to, range.limit)
        .await
    {
        Ok(metrics) => axum::Json(metrics).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, host_id = %host_id, operation = "query_range", "metric query failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch metrics")
        }
    }
}

/// GET /api/hosts/{id}/metrics/latest: type name -> most recent sample.
pub(super) async fn latest_host_metrics(
    State(state): State<AppState>,
    Path(host_id): Path<String>,
) -> Response {
    match state.metric_repo.latest_by_type(&host_id).await {
        Ok(latest) => axum::Json(latest).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, host_id = %host_id, operation = "latest_by_type", "latest query failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch latest metrics",
            )
        }
    }
}
