//! HTTP request handlers.

use axum::{
    extract::{Extension, Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use super::server::{AppState, RequestId};
use super::types::ResourceParams;
use crate::hourglass::ResourceQuery;

/// Response header: correlation ID (UUID v4).
pub const REQUEST_ID_HEADER: &str = "x-coursetrack-request-id";
/// Response header: wall-clock latency in milliseconds (integer).
pub const LATENCY_MS_HEADER: &str = "x-coursetrack-latency-ms";
/// Response header: status Hourglass answered with, when it answered.
pub const UPSTREAM_STATUS_HEADER: &str = "x-coursetrack-upstream-status";

/// Record the upstream status on the response, when Hourglass answered.
fn attach_upstream_status(response: &mut Response, upstream_status: Option<StatusCode>) {
    if let Some(status) = upstream_status {
        response.headers_mut().insert(
            HeaderName::from_static(UPSTREAM_STATUS_HEADER),
            HeaderValue::from(status.as_u16()),
        );
    }
}

/// Handle GET /api/resources
///
/// The query is taken as raw pairs so repeated keys resolve to their last
/// value instead of rejecting the request.
pub async fn get_resources(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let start = std::time::Instant::now();
    let params = ResourceParams::from_pairs(pairs);

    tracing::info!(
        request_id = %request_id,
        active_only = ?params.active_only,
        resource_type = ?params.resource_type,
        service_offering = ?params.service_offering,
        "Received resources request"
    );

    let result = match ResourceQuery::try_from(params) {
        Ok(query) => state.hourglass.get_resources(&query).await,
        Err(e) => Err(e),
    };

    let latency_ms = start.elapsed().as_millis() as u64;

    let (mut response, upstream_status) = match result {
        Ok(upstream) => {
            tracing::info!(
                request_id = %request_id,
                status = %upstream.status,
                latency_ms,
                "Resources request completed"
            );
            (
                (upstream.status, Json(upstream.body)).into_response(),
                Some(upstream.status),
            )
        }
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                error = %e,
                latency_ms,
                "Resources request failed"
            );
            let upstream_status = e.upstream_status();
            (e.into_response(), upstream_status)
        }
    };

    attach_upstream_status(&mut response, upstream_status);
    response
}

/// Handle GET /api/check-connection
pub async fn check_connection(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.hourglass.check_connection().await)
}

/// Handle GET /test-cors
pub async fn test_cors() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "CORS is working properly!"
    }))
}

/// Handle GET /health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "coursetrack"
    }))
}
