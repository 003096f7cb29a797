//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Which record store backend the gateway talks to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// Cloud Firestore over its REST API (or the local emulator)
    Firestore,
    /// Shared in-process store, lost on restart
    Memory,
    /// No backend: every gateway call degrades to its negative result
    Disabled,
}

impl BackendKind {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(Self::Firestore),
            "memory" => Ok(Self::Memory),
            "disabled" | "none" => Ok(Self::Disabled),
            _ => Err(ConfigError::InvalidBackend(value.to_string())),
        }
    }
}

/// Firestore connection settings
#[derive(Clone, Debug)]
pub struct FirestoreConfig {
    /// Google Cloud project id; without it the Firestore backend is unavailable
    pub project_id: Option<String>,
    /// Database id inside the project
    pub database: String,
    /// REST endpoint root, e.g. `https://firestore.googleapis.com`
    pub endpoint: String,
    /// OAuth2 bearer token supplied by the environment
    pub access_token: Option<String>,
    /// Per-request timeout handed to the HTTP client
    pub timeout: Option<Duration>,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            database: DEFAULT_DATABASE.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            access_token: None,
            timeout: None,
        }
    }
}

pub const DEFAULT_ENDPOINT: &str = "https://firestore.googleapis.com";
pub const DEFAULT_DATABASE: &str = "(default)";

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines (LOG_FORMAT=json)
    pub log_json: bool,
    /// Allowed client origins for CORS (comma-separated); any origin when unset
    pub client_origin: Option<String>,

    /// Selected record store backend
    pub backend: BackendKind,
    /// Firestore settings, used when `backend` is `Firestore`
    pub firestore: FirestoreConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let firestore = firestore_from_env()?;

        let backend = match non_empty_var("RECORD_STORE_BACKEND") {
            Some(value) => BackendKind::parse(&value)?,
            None if firestore.project_id.is_some() => BackendKind::Firestore,
            None => BackendKind::Disabled,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_json: non_empty_var("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            client_origin: non_empty_var("CLIENT_ORIGIN"),

            backend,
            firestore,
        })
    }
}

fn firestore_from_env() -> Result<FirestoreConfig, ConfigError> {
    let project_id =
        non_empty_var("FIRESTORE_PROJECT_ID").or_else(|| non_empty_var("GOOGLE_CLOUD_PROJECT"));

    // The emulator speaks plain HTTP and accepts unauthenticated requests
    let endpoint = match non_empty_var("FIRESTORE_EMULATOR_HOST") {
        Some(host) => format!("http://{}", host),
        None => DEFAULT_ENDPOINT.to_string(),
    };

    let timeout = match non_empty_var("FIRESTORE_TIMEOUT_SECS") {
        Some(raw) => {
            let secs: u64 = raw
                .parse()
                .map_err(|_| ConfigError::Invalid("FIRESTORE_TIMEOUT_SECS"))?;
            Some(Duration::from_secs(secs))
        }
        None => None,
    };

    Ok(FirestoreConfig {
        project_id,
        database: non_empty_var("FIRESTORE_DATABASE")
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
        endpoint,
        access_token: non_empty_var("FIRESTORE_ACCESS_TOKEN")
            .or_else(|| non_empty_var("GOOGLE_OAUTH_ACCESS_TOKEN")),
        timeout,
    })
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Unknown RECORD_STORE_BACKEND: {0} (expected firestore, memory or disabled)")]
    InvalidBackend(String),

    #[error("Invalid server address format")]
    InvalidAddress,
}
