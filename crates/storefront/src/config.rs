//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_TOKEN_SECRET` - Access-token signing secret (min 32 chars, high entropy)
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (postgres backend only,
//!   falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_CART_BACKEND` - `postgres` or `memory` (default: postgres)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_TOKEN_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Where cart documents are stored.
#[derive(Debug, Clone)]
pub enum CartBackendConfig {
    /// `PostgreSQL` (production).
    Postgres {
        /// Connection URL (contains password)
        database_url: SecretString,
    },
    /// Process memory (development and tests; lost on restart).
    Memory,
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Cart storage backend
    pub cart_backend: CartBackendConfig,
    /// Access-token signing secret
    pub token_secret: SecretString,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error event sample rate
    pub sentry_sample_rate: f32,
    /// Sentry performance trace sample rate
    pub sentry_traces_sample_rate: f32,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or_default::<IpAddr>("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("STOREFRONT_PORT", "3000")?;

        let cart_backend = match get_env_or_default("STOREFRONT_CART_BACKEND", "postgres").as_str()
        {
            "postgres" => CartBackendConfig::Postgres {
                database_url: get_database_url("STOREFRONT_DATABASE_URL")?,
            },
            "memory" => CartBackendConfig::Memory,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "STOREFRONT_CART_BACKEND".to_string(),
                    format!("expected 'postgres' or 'memory', got '{other}'"),
                ));
            }
        };

        let token_secret = token_secret_from_env()?;

        Ok(Self {
            host,
            port,
            cart_backend,
            token_secret,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env_or_default::<f32>("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env_or_default::<f32>(
                "SENTRY_TRACES_SAMPLE_RATE",
                "0.0",
            )?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Load and validate `STOREFRONT_TOKEN_SECRET`.
///
/// Shared with `cartctl token issue` so development tokens are signed with
/// a secret the server would accept.
///
/// # Errors
///
/// Returns `ConfigError` if the secret is missing, short, or weak.
pub fn token_secret_from_env() -> Result<SecretString, ConfigError> {
    let token_secret = get_validated_secret("STOREFRONT_TOKEN_SECRET")?;
    validate_secret_length(&token_secret, "STOREFRONT_TOKEN_SECRET")?;
    Ok(token_secret)
}

/// Database URL for migrations: `STOREFRONT_DATABASE_URL`, then `DATABASE_URL`.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither is set.
pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
    get_database_url("STOREFRONT_DATABASE_URL")
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_TOKEN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_TOKEN_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("changeme-token-signing-key", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_secret_length_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_secret_length(&secret, "TEST_SECRET").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            cart_backend: CartBackendConfig::Memory,
            token_secret: SecretString::from("x".repeat(32)),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_backend_debug_redacts_database_url() {
        let backend = CartBackendConfig::Postgres {
            database_url: SecretString::from("postgres://cart:hunter2@db/cart"),
        };
        let debug_output = format!("{backend:?}");
        assert!(!debug_output.contains("hunter2"));
    }
}
