//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CART_API_BASE_URL` - Base URL of the cart service (e.g. `http://127.0.0.1:3000`)
//!
//! ## Optional
//! - `CART_GUEST_DIR` - Directory holding the guest cart file (default: `.cartsync`)
//! - `CART_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 15)
//! - `CART_ACCESS_TOKEN` - Bearer token for remote mode

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Cart client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the cart service
    pub base_url: Url,
    /// Directory holding the guest cart file
    pub guest_dir: PathBuf,
    /// Per-request timeout; a timed-out mutation has an unknown outcome
    pub request_timeout: Duration,
    /// Access token for remote mode
    pub access_token: Option<SecretString>,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = parse_base_url(&get_required_env("CART_API_BASE_URL")?)?;

        let request_timeout = match get_optional_env("CART_REQUEST_TIMEOUT_SECS") {
            Some(value) => {
                let secs = value.parse::<u64>().map_err(|e| {
                    ConfigError::InvalidEnvVar("CART_REQUEST_TIMEOUT_SECS".to_string(), e.to_string())
                })?;
                if secs == 0 {
                    return Err(ConfigError::InvalidEnvVar(
                        "CART_REQUEST_TIMEOUT_SECS".to_string(),
                        "must be greater than zero".to_string(),
                    ));
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        Ok(Self {
            base_url,
            guest_dir: PathBuf::from(
                get_optional_env("CART_GUEST_DIR").unwrap_or_else(|| ".cartsync".to_string()),
            ),
            request_timeout,
            access_token: get_optional_env("CART_ACCESS_TOKEN")
                .filter(|t| !t.is_empty())
                .map(SecretString::from),
        })
    }
}

/// Parse the service base URL, requiring http(s) and a trailing slash so
/// relative endpoint paths join beneath it.
fn parse_base_url(value: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidEnvVar("CART_API_BASE_URL".to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "CART_API_BASE_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
