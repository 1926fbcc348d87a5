// HTTP routes for the monitoring center

mod hosts;
mod http;
mod metrics;

use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::host_repo::HostRepo;
use crate::ingest::Ingestor;
use crate::metric_repo::MetricRepo;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) ingestor: Ingestor,
    pub(crate) metric_repo: Arc<MetricRepo>,
    pub(crate) host_repo: Arc<HostRepo>,
}

pub fn app(host_repo: Arc<HostRepo>, metric_repo: Arc<MetricRepo>) -> Router {
    let state = AppState {
        ingestor: Ingestor::new(host_repo.clone(), metric_repo.clone()),
        metric_repo,
        host_repo,
    };
    Router::new()
        .route("/", get(|| async { "hostmon monitoring center" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/metrics", post(metrics::receive_metrics)) // POST /api/metrics
        .route("/api/hosts/master", get(hosts::master_host)) // GET /api/hosts/master
        .route("/api/hosts/{id}/metrics", get(metrics::host_metrics)) // GET /api/hosts/{id}/metrics
        .route(
            "/api/hosts/{id}/metrics/latest",
            get(metrics::latest_host_metrics),
        ) // GET /api/hosts/{id}/metrics/latest
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}

/// `{ "error": message }` with the given status.
pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
}
