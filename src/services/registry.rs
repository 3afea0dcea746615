//! Startup announcement to the central service registry.
//!
//! Sent once; a failed registration is reported to the caller, who logs it
//! and keeps starting up.

use anyhow::{Context, Result, bail};
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value, json};

/// Capability descriptor announced for this connector.
pub fn service_descriptor(service_name: &str) -> Value {
    json!({
        "servicename": service_name,
        "implements": ["fileStorage"],
        "fileTransferMode": 0,
        "fileTransferArchive": 0,
        "credentials": {
            "userId": true,
            "password": true
        }
    })
}

/// POST the descriptor to `endpoint`.
///
/// Registration succeeded only when the registry answers 200 with a JSON
/// object that carries a `success` key.
pub async fn register_service(client: &Client, endpoint: &str, service_name: &str) -> Result<()> {
    let response = client
        .post(endpoint)
        .json(&service_descriptor(service_name))
        .send()
        .await
        .context("unable to send HTTP POST request")?;

    let status = response.status();
    let body = response
        .text()
        .await
        .context("unable to read the registry response")?;

    if status != StatusCode::OK {
        bail!(
            "unable to register service with token storage (status={}): {}",
            status.as_u16(),
            body
        );
    }

    let objects: Map<String, Value> =
        serde_json::from_str(&body).with_context(|| format!("invalid JSON response: {body}"))?;
    if !objects.contains_key("success") {
        bail!("unable to register service with token storage: {body}");
    }

    Ok(())
}
