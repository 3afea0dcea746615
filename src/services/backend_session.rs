//! One authenticated backend session per request.
//!
//! A session walks `Created → Authenticating → Ready` or ends up in `Failed`.
//! Only a `Ready` session runs backend operations; a `Failed` session answers
//! every operation with the error that broke authentication. Sessions are
//! never shared or reused: the SDK handle is released when the session drops.

use crate::{
    errors::{ConnectorError, SessionError},
    models::entry::StorageEntry,
    sdk::{SdkFactory, StorageSdk},
    services::path_translator::PathTranslator,
};
use bytes::Bytes;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Authenticating,
    Ready,
    Failed(SessionError),
}

pub struct BackendSession {
    host: String,
    state: SessionState,
    sdk: Box<dyn StorageSdk>,
    paths: PathTranslator,
}

impl BackendSession {
    /// Wrap a fresh SDK session. Nothing talks to the backend yet.
    pub fn new(sdk: Box<dyn StorageSdk>, host: impl Into<String>, paths: PathTranslator) -> Self {
        Self {
            host: host.into(),
            state: SessionState::Created,
            sdk,
            paths,
        }
    }

    /// Create, initiate and log in a session in one go.
    pub async fn open(
        factory: &dyn SdkFactory,
        host: &str,
        user: &str,
        secret: &str,
        paths: PathTranslator,
    ) -> Result<Self, SessionError> {
        let sdk = factory
            .new_session()
            .map_err(|err| SessionError::Create(err.to_string()))?;
        let mut session = Self::new(sdk, host, paths);
        session.authenticate(user, secret).await?;
        Ok(session)
    }

    /// Initiate the host and log in.
    ///
    /// A session authenticates at most once: calling this again on a `Ready`
    /// session is a no-op and on a `Failed` session returns the original error.
    pub async fn authenticate(&mut self, user: &str, secret: &str) -> Result<(), SessionError> {
        match &self.state {
            SessionState::Ready => return Ok(()),
            SessionState::Failed(err) => return Err(err.clone()),
            SessionState::Created | SessionState::Authenticating => {}
        }

        self.state = SessionState::Authenticating;
        match self.initiate_and_login(user, secret).await {
            Ok(()) => {
                debug!(host = %self.host, user, "established backend session");
                self.state = SessionState::Ready;
                Ok(())
            }
            Err(err) => {
                self.state = SessionState::Failed(err.clone());
                Err(err)
            }
        }
    }

    async fn initiate_and_login(&mut self, user: &str, secret: &str) -> Result<(), SessionError> {
        self.sdk
            .initiate(&self.host)
            .await
            .map_err(|err| SessionError::Initiate {
                host: self.host.clone(),
                reason: err.to_string(),
            })?;
        self.sdk
            .login(user, secret)
            .await
            .map_err(|err| SessionError::Login {
                user: user.to_string(),
                reason: err.to_string(),
            })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Ready
    }

    fn ensure_ready(&self) -> Result<(), ConnectorError> {
        match &self.state {
            SessionState::Ready if self.sdk.is_valid() => Ok(()),
            SessionState::Failed(err) => Err(ConnectorError::Session(err.clone())),
            _ => Err(ConnectorError::Operation("no valid session".into())),
        }
    }

    /// List a folder given in the caller namespace.
    ///
    /// Entries come back in backend order, translated into the caller
    /// namespace with the container flag taken from the backend resource type.
    pub async fn list_folder(&self, path: &str) -> Result<Vec<StorageEntry>, ConnectorError> {
        self.ensure_ready()?;

        let backend_path = self.paths.to_backend_path(path);
        let files = self
            .sdk
            .enumerate_files(&backend_path)
            .await
            .map_err(|err| {
                ConnectorError::Operation(format!(
                    "unable to enumerate files in {backend_path}: {err}"
                ))
            })?;

        Ok(files
            .into_iter()
            .map(|file| {
                let is_container = file.is_container();
                StorageEntry {
                    path: self.paths.to_caller_path(&file.path, is_container),
                    is_container,
                }
            })
            .collect())
    }

    /// Download a file given in the caller namespace.
    pub async fn download_file(&self, path: &str) -> Result<Bytes, ConnectorError> {
        self.ensure_ready()?;

        let backend_path = self.paths.to_backend_path(path);
        self.sdk
            .download_file(&backend_path)
            .await
            .map_err(|err| {
                ConnectorError::Operation(format!("unable to download file {backend_path}: {err}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::{BackendEntry, ResourceType, SdkError, SdkResult};
    use async_trait::async_trait;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    /// SDK stub accepting a single user and counting backend calls.
    #[derive(Default)]
    struct StubSdk {
        initiated: bool,
        logged_in: bool,
        fail_initiate: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl StorageSdk for StubSdk {
        async fn initiate(&mut self, host: &str) -> SdkResult<()> {
            if self.fail_initiate {
                return Err(SdkError::InvalidHost {
                    host: host.into(),
                    reason: "unreachable".into(),
                });
            }
            self.initiated = true;
            Ok(())
        }

        async fn login(&mut self, user: &str, password: &str) -> SdkResult<()> {
            if user == "alice" && password == "pw" {
                self.logged_in = true;
                Ok(())
            } else {
                Err(SdkError::Unauthorized(401))
            }
        }

        fn is_valid(&self) -> bool {
            self.initiated && self.logged_in
        }

        async fn enumerate_files(&self, path: &str) -> SdkResult<Vec<BackendEntry>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![
                BackendEntry::new(format!("{path}/a.txt"), ResourceType::File),
                BackendEntry::new(format!("{path}/sub"), ResourceType::Container),
            ])
        }

        async fn download_file(&self, path: &str) -> SdkResult<Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from(format!("contents of {path}")))
        }
    }

    fn session_with(sdk: StubSdk) -> BackendSession {
        BackendSession::new(Box::new(sdk), "http://reva.local", PathTranslator::default())
    }

    #[tokio::test]
    async fn authenticated_session_translates_paths() {
        let mut session = session_with(StubSdk::default());
        session.authenticate("alice", "pw").await.unwrap();
        assert!(session.is_authenticated());

        let entries = session.list_folder("/docs").await.unwrap();
        assert_eq!(
            entries,
            vec![
                StorageEntry {
                    path: "/docs/a.txt".into(),
                    is_container: false
                },
                StorageEntry {
                    path: "/docs/sub/".into(),
                    is_container: true
                },
            ]
        );

        let data = session.download_file("docs/a.txt").await.unwrap();
        assert_eq!(&data[..], b"contents of /home/docs/a.txt");
    }

    #[tokio::test]
    async fn login_failure_blocks_every_operation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut session = session_with(StubSdk {
            calls: calls.clone(),
            ..Default::default()
        });

        let original = session.authenticate("alice", "wrong").await.unwrap_err();
        assert!(matches!(original, SessionError::Login { .. }));
        assert_eq!(session.state(), &SessionState::Failed(original.clone()));

        for err in [
            session.list_folder("/docs").await.unwrap_err(),
            session.download_file("/docs/a.txt").await.unwrap_err(),
        ] {
            match err {
                ConnectorError::Session(cause) => assert_eq!(cause, original),
                other => panic!("expected the original session error, got {other:?}"),
            }
        }

        // Retrying with good credentials does not revive a failed session.
        assert_eq!(
            session.authenticate("alice", "pw").await.unwrap_err(),
            original
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn initiate_failure_names_the_host() {
        let mut session = session_with(StubSdk {
            fail_initiate: true,
            ..Default::default()
        });
        let err = session.authenticate("alice", "pw").await.unwrap_err();
        assert!(matches!(err, SessionError::Initiate { ref host, .. } if host == "http://reva.local"));
    }

    #[tokio::test]
    async fn unauthenticated_session_refuses_operations() {
        let calls = Arc::new(AtomicUsize::new(0));
        let session = session_with(StubSdk {
            calls: calls.clone(),
            ..Default::default()
        });

        let err = session.download_file("/a.txt").await.unwrap_err();
        assert_eq!(err.to_string(), "no valid session");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    struct BrokenFactory;

    impl SdkFactory for BrokenFactory {
        fn new_session(&self) -> SdkResult<Box<dyn StorageSdk>> {
            Err(SdkError::Protocol("no transport".into()))
        }
    }

    #[tokio::test]
    async fn open_reports_creation_failures() {
        let result = BackendSession::open(
            &BrokenFactory,
            "http://reva.local",
            "alice",
            "pw",
            PathTranslator::default(),
        )
        .await;
        assert!(matches!(result, Err(SessionError::Create(_))));
    }
}
