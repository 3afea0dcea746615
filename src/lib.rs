//! Storage connector bridging HTTP callers to a Reva-style storage backend.
//!
//! Two read-only operations are exposed: listing a folder and downloading a
//! file. Every request is decoded into a [`models::request::RequestData`],
//! gets its own authenticated [`services::backend_session::BackendSession`]
//! and runs exactly one backend call through it. Paths are translated between
//! the caller namespace and the backend's rooted namespace on the way in and
//! out.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod sdk;
pub mod services;
pub mod telemetry;

pub use config::{AppConfig, CredentialMode};
pub use errors::{ConnectorError, SessionError};
pub use routes::routes::routes;
pub use services::connector_service::ConnectorService;
