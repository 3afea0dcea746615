use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::{env, fmt, time::Duration};

use crate::services::path_translator::DEFAULT_STORAGE_ROOT;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 80;
const DEFAULT_SERVICE_NAME: &str = "reva";
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 30;

/// Where the backend credentials for a request come from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum CredentialMode {
    /// Every request authenticates with the process-wide backend user.
    #[default]
    Configured,
    /// Every request authenticates with the identity embedded in its `userId`.
    Caller,
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments; read-only after startup.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub backend_host: String,
    pub backend_user: String,
    pub backend_password: String,
    pub backend_timeout: Duration,
    pub credential_mode: CredentialMode,
    pub storage_root: String,
    pub registry_endpoint: Option<String>,
    pub service_name: String,
    pub max_body_bytes: usize,
    pub metrics_enabled: bool,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Storage connector for Reva backends")]
pub struct Args {
    /// Host to bind to (overrides CONNECTOR_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// The webserver port (overrides CONNECTOR_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Backend host URL (overrides REVA_HOST)
    #[arg(long)]
    pub backend_host: Option<String>,

    /// Backend user (overrides REVA_USER)
    #[arg(long)]
    pub backend_user: Option<String>,

    /// Backend password (overrides REVA_PASSWORD)
    #[arg(long)]
    pub backend_password: Option<String>,

    /// Backend request timeout in seconds (overrides REVA_TIMEOUT_SECS)
    #[arg(long)]
    pub backend_timeout_secs: Option<u64>,

    /// Credential source for backend sessions (overrides CONNECTOR_CREDENTIAL_MODE)
    #[arg(long, value_enum)]
    pub credential_mode: Option<CredentialMode>,

    /// Backend mount point hidden from callers (overrides CONNECTOR_STORAGE_ROOT)
    #[arg(long)]
    pub storage_root: Option<String>,

    /// Service registry endpoint to announce this connector to (overrides CONNECTOR_REGISTRY_ENDPOINT)
    #[arg(long)]
    pub registry_endpoint: Option<String>,

    /// Service name used for registration (overrides CONNECTOR_SERVICE_NAME)
    #[arg(long)]
    pub service_name: Option<String>,

    /// Maximum accepted request body size (overrides CONNECTOR_MAX_BODY_BYTES)
    #[arg(long)]
    pub max_body_bytes: Option<usize>,

    /// Disable the Prometheus recorder
    #[arg(long)]
    pub no_metrics: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            backend_host: String::new(),
            backend_user: String::new(),
            backend_password: String::new(),
            backend_timeout: Duration::from_secs(DEFAULT_BACKEND_TIMEOUT_SECS),
            credential_mode: CredentialMode::default(),
            storage_root: DEFAULT_STORAGE_ROOT.into(),
            registry_endpoint: None,
            service_name: DEFAULT_SERVICE_NAME.into(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            metrics_enabled: true,
        }
    }
}

impl AppConfig {
    /// Parse CLI args and merge them with the process environment.
    pub fn from_env_and_args() -> Result<Self> {
        Self::merge(Args::parse(), |key| env::var(key).ok())
    }

    /// Merge parsed args with an environment lookup.
    ///
    /// A flag given on the command line always wins; otherwise the
    /// environment variable is used, then the built-in default.
    pub fn merge(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let port = match args.port {
            Some(port) => port,
            None => parse_env(&lookup, "CONNECTOR_PORT")?.unwrap_or(defaults.port),
        };
        let timeout_secs = match args.backend_timeout_secs {
            Some(secs) => secs,
            None => parse_env(&lookup, "REVA_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_BACKEND_TIMEOUT_SECS),
        };
        let max_body_bytes = match args.max_body_bytes {
            Some(max) => max,
            None => {
                parse_env(&lookup, "CONNECTOR_MAX_BODY_BYTES")?.unwrap_or(defaults.max_body_bytes)
            }
        };
        let credential_mode = match args.credential_mode {
            Some(mode) => mode,
            None => match lookup("CONNECTOR_CREDENTIAL_MODE") {
                Some(value) => CredentialMode::from_str(&value, true).map_err(|err| {
                    anyhow::anyhow!("parsing CONNECTOR_CREDENTIAL_MODE value `{value}`: {err}")
                })?,
                None => defaults.credential_mode,
            },
        };

        Ok(Self {
            host: args
                .host
                .or_else(|| lookup("CONNECTOR_HOST"))
                .unwrap_or(defaults.host),
            port,
            backend_host: args
                .backend_host
                .or_else(|| lookup("REVA_HOST"))
                .unwrap_or(defaults.backend_host),
            backend_user: args
                .backend_user
                .or_else(|| lookup("REVA_USER"))
                .unwrap_or(defaults.backend_user),
            backend_password: args
                .backend_password
                .or_else(|| lookup("REVA_PASSWORD"))
                .unwrap_or(defaults.backend_password),
            backend_timeout: Duration::from_secs(timeout_secs),
            credential_mode,
            storage_root: args
                .storage_root
                .or_else(|| lookup("CONNECTOR_STORAGE_ROOT"))
                .unwrap_or(defaults.storage_root),
            registry_endpoint: args
                .registry_endpoint
                .or_else(|| lookup("CONNECTOR_REGISTRY_ENDPOINT"))
                .filter(|endpoint| !endpoint.is_empty()),
            service_name: args
                .service_name
                .or_else(|| lookup("CONNECTOR_SERVICE_NAME"))
                .unwrap_or(defaults.service_name),
            max_body_bytes,
            metrics_enabled: !args.no_metrics,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|value| {
            value
                .parse::<T>()
                .with_context(|| format!("parsing {key} value `{value}`"))
        })
        .transpose()
}

// Hand-written so the backend password never reaches the logs.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("backend_host", &self.backend_host)
            .field("backend_user", &self.backend_user)
            .field("backend_password", &"***")
            .field("backend_timeout", &self.backend_timeout)
            .field("credential_mode", &self.credential_mode)
            .field("storage_root", &self.storage_root)
            .field("registry_endpoint", &self.registry_endpoint)
            .field("service_name", &self.service_name)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("metrics_enabled", &self.metrics_enabled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_flags_or_env() {
        let cfg = AppConfig::merge(Args::default(), env_of(&[])).unwrap();
        assert_eq!(cfg.port, 80);
        assert_eq!(cfg.storage_root, "/home");
        assert_eq!(cfg.credential_mode, CredentialMode::Configured);
        assert_eq!(cfg.registry_endpoint, None);
        assert!(cfg.metrics_enabled);
    }

    #[test]
    fn env_fills_in_unset_flags() {
        let args = Args::try_parse_from(["reva-connector", "--port", "8080"]).unwrap();
        let cfg = AppConfig::merge(
            args,
            env_of(&[
                ("CONNECTOR_PORT", "9000"),
                ("REVA_HOST", "https://reva.local"),
                ("REVA_USER", "einstein"),
                ("CONNECTOR_CREDENTIAL_MODE", "caller"),
            ]),
        )
        .unwrap();

        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.backend_host, "https://reva.local");
        assert_eq!(cfg.backend_user, "einstein");
        assert_eq!(cfg.credential_mode, CredentialMode::Caller);
    }

    #[test]
    fn invalid_numeric_env_is_an_error() {
        let err = AppConfig::merge(Args::default(), env_of(&[("CONNECTOR_PORT", "eighty")]))
            .unwrap_err();
        assert!(err.to_string().contains("CONNECTOR_PORT"));
    }

    #[test]
    fn debug_output_masks_the_password() {
        let cfg = AppConfig {
            backend_password: "relativity".into(),
            ..AppConfig::default()
        };
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("relativity"));
    }
}
