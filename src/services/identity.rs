//! Parsing of caller-embedded identities.
//!
//! An identity broker hands every connector the same generic token shape,
//! `<protocol>://<user>:<secret>`. The protocol tag tells connectors apart,
//! so a token minted for another connector is rejected here.

use crate::errors::ConnectorError;
use regex::Regex;
use std::sync::LazyLock;

/// Protocol tag identifying this connector's identities.
pub const IDENTITY_PROTOCOL: &str = "port-reva";

static USER_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+)://(\S*?):(\S*)$").expect("user id pattern compiles"));

/// Split a composite identity into `(user, secret)`.
///
/// The user ends at the first `:` after `://`; the secret may itself contain
/// colons.
pub fn parse_user_id(user_id: &str) -> Result<(String, String), ConnectorError> {
    let caps = USER_ID_PATTERN
        .captures(user_id)
        .ok_or(ConnectorError::MalformedIdentity)?;

    let protocol = &caps[1];
    let user = &caps[2];
    let secret = &caps[3];

    if protocol != IDENTITY_PROTOCOL {
        return Err(ConnectorError::InvalidIdentity(format!(
            "expected protocol '{IDENTITY_PROTOCOL}', but got '{protocol}'"
        )));
    }
    if user.is_empty() || secret.is_empty() {
        return Err(ConnectorError::InvalidIdentity("incomplete user id".into()));
    }

    Ok((user.to_string(), secret.to_string()))
}

/// Render an identity for logs with its secret masked.
pub fn redact_user_id(user_id: &str) -> String {
    if user_id.is_empty() {
        return String::new();
    }
    match USER_ID_PATTERN.captures(user_id) {
        Some(caps) => format!("{}://{}:***", &caps[1], &caps[2]),
        None => "<malformed>".into(),
    }
}
