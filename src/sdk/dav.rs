//! WebDAV implementation of the storage SDK.
//!
//! Reva serves its storage over WebDAV next to the CS3 gRPC gateway. The
//! session maps the SDK capability onto plain HTTP:
//!
//! - `initiate` validates the host URL,
//! - `login` probes the root with `PROPFIND Depth: 0` and basic auth,
//! - `enumerate_files` is `PROPFIND Depth: 1` parsed from the multistatus reply,
//! - `download_file` is a `GET`.

use super::{BackendEntry, ResourceType, SdkError, SdkFactory, SdkResult, StorageSdk};
use async_trait::async_trait;
use bytes::Bytes;
use quick_xml::{Reader, events::Event};
use reqwest::{Client, Method, RequestBuilder, StatusCode, header};
use std::{sync::LazyLock, time::Duration};
use tracing::{debug, instrument};
use url::Url;

const PROPFIND_BODY: &str = concat!(
    r#"<?xml version="1.0" encoding="utf-8"?>"#,
    r#"<d:propfind xmlns:d="DAV:"><d:prop><d:resourcetype/></d:prop></d:propfind>"#
);

static PROPFIND: LazyLock<Method> =
    LazyLock::new(|| Method::from_bytes(b"PROPFIND").expect("PROPFIND is a valid method token"));

/// Hands out one [`DavSession`] per request.
#[derive(Clone, Debug)]
pub struct DavSdkFactory {
    timeout: Duration,
}

impl DavSdkFactory {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl SdkFactory for DavSdkFactory {
    fn new_session(&self) -> SdkResult<Box<dyn StorageSdk>> {
        Ok(Box::new(DavSession::new(self.timeout)?))
    }
}

/// A WebDAV session bound to one host and one set of credentials.
pub struct DavSession {
    client: Client,
    base: Option<Url>,
    credentials: Option<(String, String)>,
}

impl DavSession {
    pub fn new(timeout: Duration) -> SdkResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base: None,
            credentials: None,
        })
    }

    fn base(&self) -> SdkResult<&Url> {
        self.base.as_ref().ok_or(SdkError::NotInitiated)
    }

    /// Build the URL of a backend path below the host URL.
    fn url_for(&self, path: &str, trailing_slash: bool) -> SdkResult<Url> {
        let base = self.base()?;
        let mut url = base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| SdkError::InvalidHost {
                host: base.to_string(),
                reason: "cannot be a base URL".into(),
            })?;
            segments
                .pop_if_empty()
                .extend(path.split('/').filter(|s| !s.is_empty()));
            if trailing_slash {
                segments.push("");
            }
        }
        Ok(url)
    }

    fn authorized(&self, method: Method, url: Url) -> SdkResult<RequestBuilder> {
        let (user, password) = self.credentials.as_ref().ok_or(SdkError::NotInitiated)?;
        Ok(self
            .client
            .request(method, url)
            .basic_auth(user, Some(password)))
    }
}

#[async_trait]
impl StorageSdk for DavSession {
    async fn initiate(&mut self, host: &str) -> SdkResult<()> {
        let invalid = |reason: String| SdkError::InvalidHost {
            host: host.to_string(),
            reason,
        };

        let url = Url::parse(host).map_err(|err| invalid(err.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme `{}`", url.scheme())));
        }
        if url.cannot_be_a_base() {
            return Err(invalid("cannot be a base URL".into()));
        }

        self.base = Some(url);
        self.credentials = None;
        Ok(())
    }

    #[instrument(skip(self, password))]
    async fn login(&mut self, user: &str, password: &str) -> SdkResult<()> {
        let base = self.base()?.clone();
        let response = self
            .client
            .request(PROPFIND.clone(), base.clone())
            .basic_auth(user, Some(password))
            .header("Depth", "0")
            .header(header::CONTENT_TYPE, "application/xml")
            .body(PROPFIND_BODY)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(status = status.as_u16(), "login accepted");
            self.credentials = Some((user.to_string(), password.to_string()));
            Ok(())
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(SdkError::Unauthorized(status.as_u16()))
        } else {
            Err(SdkError::Status {
                method: PROPFIND.to_string(),
                path: base.path().to_string(),
                status: status.as_u16(),
            })
        }
    }

    fn is_valid(&self) -> bool {
        self.base.is_some() && self.credentials.is_some()
    }

    #[instrument(skip(self))]
    async fn enumerate_files(&self, path: &str) -> SdkResult<Vec<BackendEntry>> {
        let url = self.url_for(path, true)?;
        let response = self
            .authorized(PROPFIND.clone(), url)?
            .header("Depth", "1")
            .header(header::CONTENT_TYPE, "application/xml")
            .body(PROPFIND_BODY)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SdkError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(SdkError::Status {
                method: PROPFIND.to_string(),
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let base = self.base()?;
        let requested = trim_trailing_separator(path);

        let mut entries = Vec::new();
        for (href, is_collection) in parse_multistatus(&body)? {
            let entry_path = href_to_backend_path(base, &href)?;
            if entry_path == requested {
                continue;
            }
            let resource_type = if is_collection {
                ResourceType::Container
            } else {
                ResourceType::File
            };
            entries.push(BackendEntry::new(entry_path, resource_type));
        }
        debug!(count = entries.len(), "enumerated folder");
        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn download_file(&self, path: &str) -> SdkResult<Bytes> {
        if path.split('/').all(str::is_empty) {
            return Err(SdkError::InvalidPath(path.to_string()));
        }

        let url = self.url_for(path, false)?;
        let response = self.authorized(Method::GET, url)?.send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SdkError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(SdkError::Status {
                method: Method::GET.to_string(),
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        let data = response.bytes().await?;
        debug!(size = data.len(), "downloaded file");
        Ok(data)
    }
}

fn trim_trailing_separator(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

/// Map a multistatus `href` back into the backend namespace.
///
/// Hrefs may be absolute URLs or absolute paths; both are resolved against the
/// host URL, whose own path prefix is then stripped and the rest percent-decoded.
fn href_to_backend_path(base: &Url, href: &str) -> SdkResult<String> {
    let url = base
        .join(href)
        .map_err(|err| SdkError::Protocol(format!("invalid href `{href}`: {err}")))?;

    let base_path = base.path().trim_end_matches('/');
    let relative = url
        .path()
        .strip_prefix(base_path)
        .filter(|rest| rest.is_empty() || rest.starts_with('/'))
        .ok_or_else(|| SdkError::Protocol(format!("href `{href}` is outside of {base}")))?;

    let decoded = urlencoding::decode(relative)
        .map_err(|err| SdkError::Protocol(format!("invalid href `{href}`: {err}")))?;

    let trimmed = trim_trailing_separator(&decoded);
    Ok(if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    })
}

/// Extract `(href, is_collection)` pairs from a `207 Multi-Status` body.
///
/// Namespace prefixes are ignored; only local element names are matched.
fn parse_multistatus(xml: &str) -> SdkResult<Vec<(String, bool)>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<(String, bool)> = None;
    let mut in_href = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"response" => current = Some((String::new(), false)),
                b"href" => in_href = true,
                b"collection" => {
                    if let Some(entry) = current.as_mut() {
                        entry.1 = true;
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"collection" {
                    if let Some(entry) = current.as_mut() {
                        entry.1 = true;
                    }
                }
            }
            Ok(Event::Text(text)) if in_href => {
                let value = text
                    .unescape()
                    .map_err(|err| SdkError::Protocol(err.to_string()))?;
                if let Some(entry) = current.as_mut() {
                    entry.0.push_str(&value);
                }
            }
            Ok(Event::CData(data)) if in_href => {
                let value = std::str::from_utf8(&data)
                    .map_err(|err| SdkError::Protocol(format!("href is not UTF-8: {err}")))?;
                if let Some(entry) = current.as_mut() {
                    entry.0.push_str(value);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"href" => in_href = false,
                b"response" => {
                    if let Some(entry) = current.take() {
                        if !entry.0.is_empty() {
                            entries.push(entry);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(SdkError::Protocol(format!(
                    "at position {}: {err}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
    }

    Ok(entries)
}
