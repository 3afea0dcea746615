//! Defines the connector's route table.
//!
//! ## Structure
//! - **Storage endpoints** (GET only; any other method is a 400)
//!   - `GET /storage/file`: download a file, body `{"filepath": ...}`
//!   - `GET /storage/folder`: list a folder, body `{"filepath": ...}`
//!
//! - **Operational endpoints**
//!   - `GET /metrics`: Prometheus exposition
//!   - `GET /healthz`: liveness
//!
//! The table is built once at startup and handed to the listener; it is never
//! modified afterwards.

use crate::{
    handlers::{
        health_handlers::{healthz, prometheus_metrics},
        storage_handlers::{get_file, get_folder, unsupported_method},
    },
    services::connector_service::ConnectorService,
    telemetry::track_metrics,
};
use axum::{
    Router, middleware,
    routing::{MethodRouter, get},
};

pub const FILE_ENDPOINT: &str = "/storage/file";
pub const FOLDER_ENDPOINT: &str = "/storage/folder";

/// Build and return the router for all connector routes.
///
/// The router carries shared state (`ConnectorService`) to all handlers.
pub fn routes() -> Router<ConnectorService> {
    Router::new()
        .route(FILE_ENDPOINT, get_only(get(get_file)))
        .route(FOLDER_ENDPOINT, get_only(get(get_folder)))
        .route("/metrics", get(prometheus_metrics))
        .route("/healthz", get(healthz))
        .route_layer(middleware::from_fn(track_metrics))
}

/// Answer every method except GET with the uniform "unsupported method" error.
///
/// HEAD is listed explicitly; axum otherwise serves it from the GET handler.
fn get_only(route: MethodRouter<ConnectorService>) -> MethodRouter<ConnectorService> {
    route.head(unsupported_method).fallback(unsupported_method)
}
