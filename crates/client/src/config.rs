//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required (one of)
//! - `AVENUE_API_URL` - Backend base URL (e.g., <https://api.avenue.studio>)
//! - `AVENUE_BASE_URL` - Public site origin; used as the backend URL when
//!   `AVENUE_API_URL` is unset (the backend is served same-origin in production)
//!
//! ## Optional
//! - `GOOGLE_MAPS_API_KEY` - Maps/geocoding key used for delivery locations
//! - `AVENUE_SESSION_TIMEOUT_MINUTES` - Inactivity timeout (default: 30)
//! - `AVENUE_SESSION_WARNING_MINUTES` - Warning lead time (default: 2)
//! - `AVENUE_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `AVENUE_STORAGE_DIR` - Directory for persisted local state (default: .avenue)
//! - `AVENUE_LANGUAGE` - `es` or `en` for fallback messages (default: es)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Google Analytics 4 measurement ID for the public site.
pub const GA4_MEASUREMENT_ID: &str = "G-7QK2X9MZ4B";

const DEFAULT_SESSION_TIMEOUT_MINUTES: u64 = 30;
const DEFAULT_SESSION_WARNING_MINUTES: u64 = 2;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_STORAGE_DIR: &str = ".avenue";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Language used for generic fallback messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    Es,
    En,
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "es" | "es-co" => Ok(Self::Es),
            "en" | "en-us" => Ok(Self::En),
            other => Err(format!("unsupported language: {other}")),
        }
    }
}

/// Avenue client configuration.
#[derive(Clone)]
pub struct ClientConfig {
    /// Backend base URL
    pub api_url: Url,
    /// Google Maps API key
    pub google_maps_api_key: Option<SecretString>,
    /// Session inactivity settings
    pub session: SessionConfig,
    /// Per-request HTTP timeout
    pub http_timeout: Duration,
    /// Directory for persisted local state
    pub storage_dir: PathBuf,
    /// Language for fallback messages
    pub language: Language,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_url", &self.api_url.as_str())
            .field(
                "google_maps_api_key",
                &self.google_maps_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("session", &self.session)
            .field("http_timeout", &self.http_timeout)
            .field("storage_dir", &self.storage_dir)
            .field("language", &self.language)
            .field("sentry_dsn", &self.sentry_dsn)
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

/// Inactivity timeout configuration, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Total inactivity period before forced logout
    pub timeout_minutes: u64,
    /// How long before the timeout the warning countdown starts
    pub warning_minutes: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: DEFAULT_SESSION_TIMEOUT_MINUTES,
            warning_minutes: DEFAULT_SESSION_WARNING_MINUTES,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if no backend URL is configured or a variable
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = get_api_url()?;
        let google_maps_api_key = get_optional_env("GOOGLE_MAPS_API_KEY").map(SecretString::from);

        let session = SessionConfig {
            timeout_minutes: get_parsed_or_default(
                "AVENUE_SESSION_TIMEOUT_MINUTES",
                DEFAULT_SESSION_TIMEOUT_MINUTES,
            )?,
            warning_minutes: get_parsed_or_default(
                "AVENUE_SESSION_WARNING_MINUTES",
                DEFAULT_SESSION_WARNING_MINUTES,
            )?,
        };
        validate_session(&session)?;

        let http_timeout = Duration::from_secs(get_parsed_or_default(
            "AVENUE_HTTP_TIMEOUT_SECS",
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?);
        let storage_dir =
            PathBuf::from(get_env_or_default("AVENUE_STORAGE_DIR", DEFAULT_STORAGE_DIR));
        let language = get_env_or_default("AVENUE_LANGUAGE", "es")
            .parse::<Language>()
            .map_err(|e| ConfigError::InvalidEnvVar("AVENUE_LANGUAGE".to_string(), e))?;

        Ok(Self {
            api_url,
            google_maps_api_key,
            session,
            http_timeout,
            storage_dir,
            language,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Configuration pointing at `api_url` with defaults for everything else.
    ///
    /// Intended for tests and embedding; no environment is read.
    #[must_use]
    pub fn for_api_url(api_url: Url) -> Self {
        Self {
            api_url,
            google_maps_api_key: None,
            session: SessionConfig::default(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            language: Language::default(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Backend URL, falling back to the site origin.
fn get_api_url() -> Result<Url, ConfigError> {
    let (key, value) = if let Some(value) = get_optional_env("AVENUE_API_URL") {
        ("AVENUE_API_URL", value)
    } else if let Some(value) = get_optional_env("AVENUE_BASE_URL") {
        ("AVENUE_BASE_URL", value)
    } else {
        return Err(ConfigError::MissingEnvVar("AVENUE_API_URL".to_string()));
    };

    parse_api_url(&value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e))
}

fn parse_api_url(value: &str) -> Result<Url, String> {
    let url = Url::parse(value.trim()).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme '{other}'")),
    }
}

fn validate_session(session: &SessionConfig) -> Result<(), ConfigError> {
    if session.timeout_minutes == 0 {
        return Err(ConfigError::InvalidEnvVar(
            "AVENUE_SESSION_TIMEOUT_MINUTES".to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    if session.warning_minutes == 0 || session.warning_minutes >= session.timeout_minutes {
        return Err(ConfigError::InvalidEnvVar(
            "AVENUE_SESSION_WARNING_MINUTES".to_string(),
            format!(
                "must be between 1 and {} (timeout is {} minutes)",
                session.timeout_minutes.saturating_sub(1),
                session.timeout_minutes
            ),
        ));
    }
    Ok(())
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn get_parsed_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}
