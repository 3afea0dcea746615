//! Health & metrics handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /metrics  -> Prometheus exposition

use crate::services::connector_service::ConnectorService;
use axum::{Json, extract::State, http::StatusCode, http::header, response::IntoResponse};
use serde::Serialize;

/// `GET /healthz`
///
/// Very small liveness probe: always returns 200 OK with a plain JSON body.
/// It never contacts the backend: sessions only exist inside requests.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /metrics`
///
/// Renders the installed Prometheus recorder, or 503 when metrics are off.
pub async fn prometheus_metrics(State(service): State<ConnectorService>) -> impl IntoResponse {
    match &service.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "Metrics disabled").into_response(),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}
