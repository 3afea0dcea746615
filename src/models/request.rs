//! Decoded form of an inbound request body.

use serde_json::Value;
use std::collections::HashMap;

/// Body key carrying the caller-visible path.
pub const FILE_PATH_KEY: &str = "filepath";
/// Body key carrying the composite `<protocol>://<user>:<secret>` identity.
pub const USER_ID_KEY: &str = "userId";
/// Body key carrying the caller's API key.
pub const API_KEY_KEY: &str = "apiKey";

/// Reserved fields lifted out of the raw body.
///
/// A field that was absent, or present with a non-string value, is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMetadata {
    pub file_path: String,
    pub user_id: String,
    pub api_key: String,
}

/// A decoded request: reserved metadata plus every other top-level field.
///
/// The payload keeps unrecognized fields verbatim for collaborating services;
/// the connector itself never reads it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestData {
    pub metadata: RequestMetadata,
    pub payload: HashMap<String, Value>,
}
