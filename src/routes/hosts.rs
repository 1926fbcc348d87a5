// Host directory read paths

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::{AppState, error_response};

/// GET /api/hosts/master: online host with the highest priority, or 204 when none is online.
pub(super) async fn master_host(State(state): State<AppState>) -> Response {
    match state.host_repo.find_master().await {
        Ok(Some(host)) => axum::Json(host).into_response(),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            tracing::warn!(error = %e, operation = "find_master", "master lookup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to find master host")
        }
    }
}
