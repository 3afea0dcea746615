//! ConnectorService: shared, read-only state handed to every handler.
//!
//! Holds the process configuration, the SDK factory and the path translator,
//! and knows how to turn a decoded request into an authenticated
//! [`BackendSession`]. Nothing in here is mutated after startup.

use crate::{
    config::{AppConfig, CredentialMode},
    errors::ConnectorError,
    models::request::RequestData,
    sdk::SdkFactory,
    services::{backend_session::BackendSession, identity, path_translator::PathTranslator},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::{fmt, sync::Arc};

/// Backend credentials resolved for one request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("secret", &"***")
            .finish()
    }
}

#[derive(Clone)]
pub struct ConnectorService {
    pub config: Arc<AppConfig>,
    pub sdk: Arc<dyn SdkFactory>,
    pub paths: PathTranslator,
    pub metrics: Option<PrometheusHandle>,
}

impl ConnectorService {
    pub fn new(config: AppConfig, sdk: Arc<dyn SdkFactory>) -> Self {
        let paths = PathTranslator::new(&config.storage_root);
        Self {
            config: Arc::new(config),
            sdk,
            paths,
            metrics: None,
        }
    }

    /// Attach the Prometheus handle rendered by `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Pick the backend credentials for a request according to the
    /// configured [`CredentialMode`].
    pub fn resolve_credentials(&self, request: &RequestData) -> Result<Credentials, ConnectorError> {
        match self.config.credential_mode {
            CredentialMode::Configured => Ok(Credentials {
                user: self.config.backend_user.clone(),
                secret: self.config.backend_password.clone(),
            }),
            CredentialMode::Caller => {
                let (user, secret) = identity::parse_user_id(&request.metadata.user_id)?;
                Ok(Credentials { user, secret })
            }
        }
    }

    /// Resolve credentials and open a fresh session for this request only.
    pub async fn open_session(&self, request: &RequestData) -> Result<BackendSession, ConnectorError> {
        let credentials = self.resolve_credentials(request)?;
        let session = BackendSession::open(
            self.sdk.as_ref(),
            &self.config.backend_host,
            &credentials.user,
            &credentials.secret,
            self.paths.clone(),
        )
        .await?;
        Ok(session)
    }
}
