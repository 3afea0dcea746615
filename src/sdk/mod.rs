//! Storage backend SDK capability.
//!
//! The connector only needs five things from a backend client: initiate a
//! connection to a host, log in, report whether the session is usable,
//! enumerate a folder and download a file. [`StorageSdk`] is that capability;
//! [`SdkFactory`] hands out a fresh, unauthenticated SDK session per request.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │        BackendSession        │
//! ├──────────────────────────────┤
//! │      StorageSdk (trait)      │
//! ├───────────────┬──────────────┤
//! │  DavSession   │  test SDKs   │
//! └───────────────┴──────────────┘
//! ```

pub mod dav;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use dav::{DavSdkFactory, DavSession};

/// Result type alias using [`SdkError`].
pub type SdkResult<T> = std::result::Result<T, SdkError>;

/// Errors reported by an SDK session.
#[derive(Debug, Error)]
pub enum SdkError {
    /// Host could not be used as a backend address
    #[error("invalid host `{host}`: {reason}")]
    InvalidHost { host: String, reason: String },

    /// An operation ran before `initiate`/`login`
    #[error("session not initiated")]
    NotInitiated,

    /// Backend refused the credentials
    #[error("authentication rejected (status {0})")]
    Unauthorized(u16),

    /// Path not usable for the requested operation
    #[error("invalid path `{0}`")]
    InvalidPath(String),

    /// Resource does not exist
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Backend answered with an unexpected status
    #[error("unexpected status {status} for {method} {path}")]
    Status {
        method: String,
        path: String,
        status: u16,
    },

    /// Backend reply could not be understood
    #[error("malformed backend response: {0}")]
    Protocol(String),

    /// Transport failure
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Kind of resource a backend entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    File,
    Container,
}

/// One entry of a backend folder enumeration, in the backend namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEntry {
    pub path: String,
    pub resource_type: ResourceType,
}

impl BackendEntry {
    pub fn new(path: impl Into<String>, resource_type: ResourceType) -> Self {
        Self {
            path: path.into(),
            resource_type,
        }
    }

    pub fn is_container(&self) -> bool {
        self.resource_type == ResourceType::Container
    }
}

/// One backend client session.
#[async_trait]
pub trait StorageSdk: Send + Sync {
    /// Point the session at a backend host.
    async fn initiate(&mut self, host: &str) -> SdkResult<()>;

    /// Authenticate with user credentials.
    async fn login(&mut self, user: &str, password: &str) -> SdkResult<()>;

    /// Whether the session is initiated and logged in.
    fn is_valid(&self) -> bool;

    /// List the direct children of a folder.
    async fn enumerate_files(&self, path: &str) -> SdkResult<Vec<BackendEntry>>;

    /// Fetch the full contents of a file.
    async fn download_file(&self, path: &str) -> SdkResult<Bytes>;
}

/// Creates SDK sessions. Shared across requests; sessions are not.
pub trait SdkFactory: Send + Sync {
    fn new_session(&self) -> SdkResult<Box<dyn StorageSdk>>;
}
