//! Shared integration-test helpers: an in-memory SDK and router bootstrap.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use bytes::Bytes;
use http_body_util::BodyExt;
use reva_connector::{
    AppConfig, ConnectorService, CredentialMode, routes,
    sdk::{BackendEntry, SdkError, SdkFactory, SdkResult, StorageSdk},
};
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};
use tower::ServiceExt;

pub const BACKEND_HOST: &str = "http://reva.test";
pub const BACKEND_USER: &str = "einstein";
pub const BACKEND_PASSWORD: &str = "relativity";

/// Backend contents shared by every session the factory hands out.
#[derive(Default)]
pub struct MemoryBackend {
    folders: HashMap<String, Vec<BackendEntry>>,
    files: HashMap<String, Bytes>,
    accounts: HashMap<String, String>,
    sessions: AtomicUsize,
    logins: Mutex<Vec<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default().with_account(BACKEND_USER, BACKEND_PASSWORD)
    }

    pub fn with_account(mut self, user: &str, password: &str) -> Self {
        self.accounts.insert(user.into(), password.into());
        self
    }

    pub fn with_folder(mut self, path: &str, entries: Vec<BackendEntry>) -> Self {
        self.folders.insert(path.into(), entries);
        self
    }

    pub fn with_file(mut self, path: &str, contents: &'static [u8]) -> Self {
        self.files.insert(path.into(), Bytes::from_static(contents));
        self
    }

    pub fn sessions_created(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    pub fn logins(&self) -> Vec<String> {
        self.logins.lock().unwrap().clone()
    }
}

#[derive(Clone)]
pub struct MemorySdkFactory(pub Arc<MemoryBackend>);

impl SdkFactory for MemorySdkFactory {
    fn new_session(&self) -> SdkResult<Box<dyn StorageSdk>> {
        self.0.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            backend: self.0.clone(),
            initiated: false,
            logged_in: false,
        }))
    }
}

struct MemorySession {
    backend: Arc<MemoryBackend>,
    initiated: bool,
    logged_in: bool,
}

#[async_trait]
impl StorageSdk for MemorySession {
    async fn initiate(&mut self, host: &str) -> SdkResult<()> {
        if host != BACKEND_HOST {
            return Err(SdkError::InvalidHost {
                host: host.into(),
                reason: "unknown host".into(),
            });
        }
        self.initiated = true;
        Ok(())
    }

    async fn login(&mut self, user: &str, password: &str) -> SdkResult<()> {
        self.backend.logins.lock().unwrap().push(user.to_string());
        match self.backend.accounts.get(user) {
            Some(expected) if expected == password => {
                self.logged_in = true;
                Ok(())
            }
            _ => Err(SdkError::Unauthorized(401)),
        }
    }

    fn is_valid(&self) -> bool {
        self.initiated && self.logged_in
    }

    async fn enumerate_files(&self, path: &str) -> SdkResult<Vec<BackendEntry>> {
        self.backend
            .folders
            .get(path)
            .cloned()
            .ok_or_else(|| SdkError::NotFound(path.into()))
    }

    async fn download_file(&self, path: &str) -> SdkResult<Bytes> {
        if path.is_empty() || self.backend.folders.contains_key(path) {
            return Err(SdkError::InvalidPath(path.into()));
        }
        self.backend
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| SdkError::NotFound(path.into()))
    }
}

pub fn test_config(mode: CredentialMode) -> AppConfig {
    AppConfig {
        port: 0,
        backend_host: BACKEND_HOST.into(),
        backend_user: BACKEND_USER.into(),
        backend_password: BACKEND_PASSWORD.into(),
        credential_mode: mode,
        ..AppConfig::default()
    }
}

pub fn app_for(backend: Arc<MemoryBackend>, config: AppConfig) -> Router {
    let service = ConnectorService::new(config, Arc::new(MemorySdkFactory(backend)));
    routes().with_state(service)
}

pub fn app(backend: Arc<MemoryBackend>) -> Router {
    app_for(backend, test_config(CredentialMode::Configured))
}

pub async fn send(app: Router, method: &str, uri: &str, body: impl Into<Body>) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn read_body(response: Response<Body>) -> (StatusCode, Bytes) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes)
}
