//! Decoding of inbound request bodies into [`RequestData`].

use crate::{
    errors::ConnectorError,
    models::request::{API_KEY_KEY, FILE_PATH_KEY, RequestData, USER_ID_KEY},
};
use axum::body::Body;
use bytes::Bytes;
use serde_json::{Map, Value};

/// Read a request body, at most `limit` bytes, exactly once.
pub async fn read_body(body: Body, limit: usize) -> Result<Bytes, ConnectorError> {
    axum::body::to_bytes(body, limit)
        .await
        .map_err(|err| ConnectorError::Decode(format!("unable to read the request body: {err}")))
}

/// Decode a JSON object body.
///
/// Reserved keys with a string value land in the metadata. A reserved key
/// holding anything else is dropped without error, since callers are known to
/// send partial metadata. All other keys are kept verbatim in the payload.
pub fn decode(raw: &[u8]) -> Result<RequestData, ConnectorError> {
    let objects: Map<String, Value> = serde_json::from_slice(raw).map_err(|err| {
        ConnectorError::Decode(format!("unable to unmarshal the JSON data: {err}"))
    })?;

    let mut data = RequestData::default();
    for (key, value) in objects {
        let slot = match key.as_str() {
            FILE_PATH_KEY => &mut data.metadata.file_path,
            USER_ID_KEY => &mut data.metadata.user_id,
            API_KEY_KEY => &mut data.metadata.api_key,
            _ => {
                data.payload.insert(key, value);
                continue;
            }
        };
        if let Value::String(s) = value {
            *slot = s;
        }
    }

    Ok(data)
}
