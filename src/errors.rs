use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Failure while establishing a backend session, tagged with the sub-step
/// that failed.
///
/// The error is `Clone` so a session that failed to authenticate can replay
/// the original cause on every later operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("unable to create session: {0}")]
    Create(String),
    #[error("unable to initiate session to host {host}: {reason}")]
    Initiate { host: String, reason: String },
    #[error("unable to login (u={user}): {reason}")]
    Login { user: String, reason: String },
}

/// Every failure a request can run into between decoding and encoding.
///
/// All variants map to the same wire contract: HTTP 400 with the message as a
/// plain-text body.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("{0}")]
    Decode(String),
    #[error("malformed user id")]
    MalformedIdentity,
    #[error("{0}")]
    InvalidIdentity(String),
    #[error("failed to create the backend session: {0}")]
    Session(#[from] SessionError),
    #[error("{0}")]
    Operation(String),
    #[error("unsupported method")]
    UnsupportedMethod,
}

impl ConnectorError {
    /// Prefix an operation failure with the stage it happened in.
    ///
    /// Other variants already name their stage and are returned unchanged.
    pub fn context(self, ctx: &str) -> Self {
        match self {
            Self::Operation(msg) => Self::Operation(format!("{ctx}: {msg}")),
            other => other,
        }
    }

    /// Status written for this error. Uniformly 400.
    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

impl IntoResponse for ConnectorError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
