//! HTTP handlers for the storage endpoints.
//!
//! Each handler runs the same pipeline: read and decode the body, resolve
//! credentials, open a session for this request, run exactly one backend
//! operation and encode the result. Any failure along the way is logged once
//! and written as a 400 with the error text as body.

use crate::{
    errors::ConnectorError,
    models::request::RequestData,
    services::{connector_service::ConnectorService, identity, request_decoder},
};
use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::{Method, Uri},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::net::SocketAddr;
use tracing::{debug, info, warn};

/// JSON body of a folder listing.
#[derive(Debug, Serialize)]
pub struct FolderListing {
    pub files: Vec<String>,
}

/// `GET /storage/file`: raw file contents.
pub async fn get_file(State(service): State<ConnectorService>, request: Request) -> Response {
    let (method, path) = (request.method().clone(), request.uri().path().to_string());
    respond(&method, &path, file_contents(&service, request).await)
}

/// `GET /storage/folder`: `{"files": [...]}` in backend order.
pub async fn get_folder(State(service): State<ConnectorService>, request: Request) -> Response {
    let (method, path) = (request.method().clone(), request.uri().path().to_string());
    respond(&method, &path, folder_contents(&service, request).await)
}

/// Any other method on a storage route.
pub async fn unsupported_method(method: Method, uri: Uri) -> Response {
    respond(&method, uri.path(), Err(ConnectorError::UnsupportedMethod))
}

async fn file_contents(
    service: &ConnectorService,
    request: Request,
) -> Result<Response, ConnectorError> {
    let (data, requester) = decode_request(service, request).await?;
    let session = service.open_session(&data).await?;
    log_request("file contents request", &data, requester);

    let contents = session
        .download_file(&data.metadata.file_path)
        .await
        .map_err(|err| err.context("error while retrieving file contents"))?;
    debug!(
        path = %data.metadata.file_path,
        size = contents.len(),
        "retrieved file contents"
    );

    Ok(contents.into_response())
}

async fn folder_contents(
    service: &ConnectorService,
    request: Request,
) -> Result<Response, ConnectorError> {
    let (data, requester) = decode_request(service, request).await?;
    let session = service.open_session(&data).await?;
    log_request("folder contents request", &data, requester);

    let entries = session
        .list_folder(&data.metadata.file_path)
        .await
        .map_err(|err| err.context("error while retrieving folder contents"))?;
    debug!(
        path = %data.metadata.file_path,
        count = entries.len(),
        "retrieved folder contents"
    );

    let listing = FolderListing {
        files: entries.into_iter().map(|entry| entry.path).collect(),
    };
    Ok(Json(listing).into_response())
}

/// Consume the body once and decode it; also pick up the peer address when
/// the listener recorded one.
async fn decode_request(
    service: &ConnectorService,
    request: Request,
) -> Result<(RequestData, Option<SocketAddr>), ConnectorError> {
    let requester = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let raw = request_decoder::read_body(request.into_body(), service.config.max_body_bytes).await?;
    let data = request_decoder::decode(&raw)?;
    Ok((data, requester))
}

/// Audit line for a request about to hit the backend.
///
/// The identity secret and the API key are never written out.
fn log_request(msg: &str, data: &RequestData, requester: Option<SocketAddr>) {
    let requester = requester
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| "unknown".into());
    info!(
        path = %data.metadata.file_path,
        user_id = %identity::redact_user_id(&data.metadata.user_id),
        api_key_present = !data.metadata.api_key.is_empty(),
        requester = %requester,
        "{msg}"
    );
}

fn respond(method: &Method, path: &str, result: Result<Response, ConnectorError>) -> Response {
    match result {
        Ok(response) => response,
        Err(err) => {
            warn!(method = %method, path, "{err}");
            err.into_response()
        }
    }
}
